//! Zone-memory contract.
//!
//! The classic engines hand out every cache block from a tagged zone heap:
//! a block is born `Static`, gets demoted to a purgable tag once it is
//! complete, and may vanish whenever the heap runs short.  Owners notice a
//! purged block on next use and rebuild it.
//!
//! Here a block is an owned, zero-initialised byte buffer that remembers its
//! tag; whoever holds it decides when to honour a purge.

use std::ops::{Deref, DerefMut};

/// Retention class of a [`ZoneBlock`].  Ordering matters: everything at or
/// above [`PurgeTag::Cache`] may be reclaimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PurgeTag {
    /// Lives until explicitly freed.
    Static = 1,
    /// Reclaimable under memory pressure, rebuilt on demand.
    Cache = 101,
}

impl PurgeTag {
    #[inline]
    pub fn is_purgable(self) -> bool {
        self >= PurgeTag::Cache
    }
}

/// Zero-initialised byte block tagged with a [`PurgeTag`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneBlock {
    data: Box<[u8]>,
    tag: PurgeTag,
}

impl ZoneBlock {
    /// Allocate `size` zeroed bytes under `tag`.
    pub fn alloc(size: usize, tag: PurgeTag) -> Self {
        Self {
            data: vec![0u8; size].into_boxed_slice(),
            tag,
        }
    }

    pub fn tag(&self) -> PurgeTag {
        self.tag
    }

    /// Re-tag the block (usually `Static` → `Cache` once it is complete).
    pub fn change_tag(&mut self, tag: PurgeTag) {
        self.tag = tag;
    }

    pub fn is_purgable(&self) -> bool {
        self.tag.is_purgable()
    }
}

impl Deref for ZoneBlock {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for ZoneBlock {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
