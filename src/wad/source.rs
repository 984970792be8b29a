//! The resource-accessor seam.
//!
//! The texture pipeline never opens files itself; it only needs to turn a
//! name into a lump, read the lump's bytes and know which archive it came
//! from.  [`WadStack`](super::WadStack) is the stock implementation, tests
//! and embedders may plug in their own.

use super::raw::WadError;

/// Directory index of a lump inside a [`LumpSource`].
pub type LumpId = usize;

/// Name → blob resolution as consumed by the texture loader.
pub trait LumpSource {
    /// Number of lumps in the merged directory.
    fn num_lumps(&self) -> usize;

    /// Raw eight-byte name of `lump`, `None` when out of range.
    fn lump_name(&self, lump: LumpId) -> Option<[u8; 8]>;

    /// Last-loaded lump called `name` (case-insensitive, eight chars).
    fn resolve(&self, name: &str) -> Option<LumpId>;

    /// Like [`resolve`](Self::resolve) but only considers lumps strictly
    /// before `lump`, scanning downward.
    fn resolve_before(&self, name: &str, lump: LumpId) -> Option<LumpId>;

    /// Read-only bytes of `lump`.
    fn data(&self, lump: LumpId) -> Result<&[u8], WadError>;

    /// Byte length of `lump`.
    fn length(&self, lump: LumpId) -> Result<usize, WadError> {
        self.data(lump).map(<[u8]>::len)
    }

    /// Index of the archive `lump` was loaded from (load order).
    fn archive_of(&self, lump: LumpId) -> usize;

    /// Is `lump` inside a flat (`F_START` … `F_END`) namespace?
    fn is_flat(&self, _lump: LumpId) -> bool {
        false
    }

    /// Caller is done with `lump`.  Memory-resident sources ignore this.
    fn release(&self, _lump: LumpId) {}
}
