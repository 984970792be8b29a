//! Name → texture id lookup.
//!
//! Chained hash table with one bucket per texture.  Entries are appended to
//! the tail of their chain in id order, so when two textures share a name
//! the earliest one (the one from the most recently loaded table) is found.

use super::set::TextureId;
use crate::wad::name::{Name8, eq_ignore_case, name_hash};

#[derive(Clone, Debug, Default)]
pub struct NameIndex {
    buckets: Vec<Vec<(Name8, TextureId)>>,
}

impl NameIndex {
    /// Index `names`; position in the iterator is the texture id.
    pub fn build<'a, I>(names: I) -> Self
    where
        I: ExactSizeIterator<Item = &'a Name8>,
    {
        let mut buckets = vec![Vec::new(); names.len()];
        let count = buckets.len();
        for (id, name) in names.enumerate() {
            let b = name_hash(name) as usize % count;
            buckets[b].push((*name, id as TextureId));
        }
        Self { buckets }
    }

    /// Case-insensitive lookup of the first eight characters of `name`.
    /// Names starting with `-` mean "no texture" and give id 0.
    pub fn find(&self, name: &str) -> Option<TextureId> {
        if name.starts_with('-') {
            return Some(0);
        }
        if self.buckets.is_empty() {
            return None;
        }
        let b = name_hash(name.as_bytes()) as usize % self.buckets.len();
        self.buckets[b]
            .iter()
            .find(|(n, _)| eq_ignore_case(n, name.as_bytes()))
            .map(|&(_, id)| id)
    }
}
