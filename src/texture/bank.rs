// Patch images referenced by the loaded textures, copied out of the archive
// stack so the column caches can be rebuilt without it.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::patch::{PLACEHOLDER_PATCH, Patch};
use crate::wad::{LumpId, LumpSource, name::name_str};

/// Handle for a patch in a [`PatchBank`].
pub type PatchId = u32;

/// `PatchId` of the checkerboard placeholder.  Always 0 because
/// `PatchBank::new()` inserts it first.
pub const PLACEHOLDER: PatchId = 0;

static PLACEHOLDER_VIEW: Lazy<Patch<'static>> =
    Lazy::new(|| Patch::parse(&PLACEHOLDER_PATCH).expect("built-in placeholder patch is valid"));

#[derive(Debug)]
struct Entry {
    name: String,
    bytes: Box<[u8]>,
}

/// Deduplicated store of validated patch lumps.
#[derive(Debug)]
pub struct PatchBank {
    entries: Vec<Entry>,
    by_lump: HashMap<LumpId, PatchId>,
}

impl Default for PatchBank {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchBank {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry {
                name: "PLACEHOLDER".into(),
                bytes: PLACEHOLDER_PATCH.clone().into_boxed_slice(),
            }],
            by_lump: HashMap::new(),
        }
    }

    /// Number of stored patches (including the placeholder).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    /// Copy `lump` into the bank once and return its id.  Lumps that cannot
    /// be read or are not valid patches map to [`PLACEHOLDER`].
    pub fn intern<S: LumpSource + ?Sized>(&mut self, source: &S, lump: LumpId) -> PatchId {
        if let Some(&id) = self.by_lump.get(&lump) {
            return id;
        }
        let id = match source.data(lump) {
            Ok(bytes) if Patch::parse(bytes).is_ok() => {
                let id = self.entries.len() as PatchId;
                let name = source
                    .lump_name(lump)
                    .map(|n| name_str(&n).to_owned())
                    .unwrap_or_default();
                self.entries.push(Entry {
                    name,
                    bytes: bytes.into(),
                });
                id
            }
            _ => PLACEHOLDER,
        };
        self.by_lump.insert(lump, id);
        id
    }

    /// Patch view for `id`; unknown ids give the placeholder.
    pub fn get(&self, id: PatchId) -> Patch<'_> {
        self.entries
            .get(id as usize)
            .and_then(|e| Patch::parse(&e.bytes).ok())
            .unwrap_or(*PLACEHOLDER_VIEW)
    }

    /// Lump name the patch was loaded from.
    pub fn name(&self, id: PatchId) -> Option<&str> {
        self.entries.get(id as usize).map(|e| e.name.as_str())
    }

    /// Width in columns, 0 for unknown ids.
    pub fn width(&self, id: PatchId) -> usize {
        self.get(id).width as usize
    }
}
