//! Patch-name table merger.
//!
//! Every PNAMES lump is a little-endian `i32` count followed by that many
//! eight-byte patch names.  All of them are concatenated (last-loaded lump
//! first) into one flat lookup table; each lump remembers how many entries
//! precede it so textures from the same archive can be re-based onto it.

use byteorder::{LittleEndian as LE, ReadBytesExt};

use super::{
    diag::{Condition, Diagnostics},
    patch::Patch,
};
use crate::wad::{LumpId, LumpSource, WadError, name::name_str};

/// Bytes per PNAMES entry.
const PNAME_SIZE: usize = 8;

/// One merged PNAMES lump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PnamesLump {
    pub lump: LumpId,
    pub archive: usize,
    /// Entries declared by this lump.
    pub count: usize,
    /// Entries declared by every lump merged before this one.
    pub sum_before: usize,
}

/// Flat patch index → resolved lump (`None` = unresolved).
#[derive(Clone, Debug, Default)]
pub struct PatchLookup {
    entries: Vec<Option<LumpId>>,
    lumps: Vec<PnamesLump>,
}

impl PatchLookup {
    /// Merge `pnames` (already in processing order).
    pub(crate) fn build<S: LumpSource + ?Sized>(
        source: &S,
        pnames: &[LumpId],
        diag: &mut Diagnostics,
    ) -> Result<Self, WadError> {
        let mut out = Self::default();

        for &lump in pnames {
            let bytes = source.data(lump)?;
            let mut hdr = bytes;
            let declared = hdr.read_i32::<LE>().unwrap_or(0).max(0) as usize;
            let fits = bytes.len().saturating_sub(4) / PNAME_SIZE;
            let count = if declared > fits {
                diag.report.truncated_tables += 1;
                diag.warn_once(
                    Condition::TruncatedTable,
                    format_args!("PNAMES lump #{lump} declares {declared} names, only {fits} fit"),
                );
                fits
            } else {
                declared
            };

            out.lumps.push(PnamesLump {
                lump,
                archive: source.archive_of(lump),
                count,
                sum_before: out.entries.len(),
            });

            let names = bytes.get(4..4 + count * PNAME_SIZE).unwrap_or(&[]);
            for raw in names.chunks_exact(PNAME_SIZE) {
                out.entries.push(resolve_patch(source, name_str(raw), diag));
            }
        }

        log::debug!(
            "patch lookup: {} names from {} PNAMES lumps",
            out.entries.len(),
            out.lumps.len()
        );
        Ok(out)
    }

    /// Total number of merged entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolved lump for flat index `index`; `None` when out of range or
    /// unresolved.
    pub fn get(&self, index: i64) -> Option<LumpId> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i).copied().flatten())
    }

    /// Merged PNAMES lumps, in processing order.
    pub fn lumps(&self) -> &[PnamesLump] {
        &self.lumps
    }

    /// Offset to add to patch indices of a TEXTURE lump from `archive`:
    /// the running total of the first PNAMES lump from the same archive,
    /// or 0 if that archive has none.
    pub fn offset_for_archive(&self, archive: usize) -> usize {
        self.lumps
            .iter()
            .find(|p| p.archive == archive)
            .map_or(0, |p| p.sum_before)
    }
}

/// Resolve one PNAMES entry.  Flats sharing the name are skipped; if only
/// flats exist the first hit is kept and left to validation.
fn resolve_patch<S: LumpSource + ?Sized>(
    source: &S,
    name: &str,
    diag: &mut Diagnostics,
) -> Option<LumpId> {
    let Some(found) = source.resolve(name) else {
        diag.report.unresolved_patch_names += 1;
        log::debug!("patch {name} not found");
        return None;
    };

    let mut lump = Some(found);
    while let Some(l) = lump {
        if !source.is_flat(l) {
            break;
        }
        lump = source.resolve_before(name, l);
    }
    let lump = lump.unwrap_or(found);

    let rejected = match source.data(lump) {
        Ok(bytes) => Patch::parse(bytes).err().map(|e| e.to_string()),
        Err(e) => Some(e.to_string()),
    };
    match rejected {
        None => Some(lump),
        Some(why) => {
            diag.report.invalid_patches += 1;
            log::debug!("patch {name}: {why}");
            None
        }
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        texture::testutil::{self, pnames},
        wad::{WadStack, testwad::WadBuilder},
    };

    fn solid(w: u16, h: u16) -> Vec<u8> {
        testutil::solid(w, h, 1)
    }

    #[test]
    fn resolves_and_marks_unresolved() {
        let wad = WadBuilder::iwad()
            .lump("PNAMES", &pnames(&["WALL01", "nosuch", "JUNK", "wall02"]))
            .lump("WALL01", &solid(4, 4)) // 1
            .lump("JUNK", &[0; 5]) // 2
            .lump("WALL02", &solid(2, 2)) // 3
            .build();
        let mut stack = WadStack::new();
        stack.add_bytes("t", wad).unwrap();

        let mut diag = Diagnostics::default();
        let lookup = PatchLookup::build(&stack, &[0], &mut diag).unwrap();
        assert_eq!(lookup.len(), 4);
        assert_eq!(lookup.get(0), Some(1));
        assert_eq!(lookup.get(1), None);
        assert_eq!(lookup.get(2), None);
        assert_eq!(lookup.get(3), Some(3));
        assert_eq!(lookup.get(4), None);
        assert_eq!(lookup.get(-1), None);
        assert_eq!(diag.report.unresolved_patch_names, 1);
        assert_eq!(diag.report.invalid_patches, 1);
    }

    #[test]
    fn flats_with_patch_names_are_skipped() {
        let wad = WadBuilder::iwad()
            .lump("PNAMES", &pnames(&["STEP1"]))
            .lump("STEP1", &solid(2, 2)) // 1: the real patch
            .lump("F_START", &[])
            .lump("STEP1", &[0; 4096]) // 3: a flat
            .lump("F_END", &[])
            .build();
        let mut stack = WadStack::new();
        stack.add_bytes("t", wad).unwrap();

        let mut diag = Diagnostics::default();
        let lookup = PatchLookup::build(&stack, &[0], &mut diag).unwrap();
        assert_eq!(lookup.get(0), Some(1));
    }

    #[test]
    fn running_totals_per_lump() {
        let iwad = WadBuilder::iwad()
            .lump("PNAMES", &pnames(&["A", "B", "C"]))
            .lump("A", &solid(1, 1))
            .build();
        let pwad = WadBuilder::pwad()
            .lump("PNAMES", &pnames(&["D", "E"]))
            .build();
        let mut stack = WadStack::new();
        stack.add_bytes("iwad", iwad).unwrap();
        stack.add_bytes("pwad", pwad).unwrap();

        let mut diag = Diagnostics::default();
        // last-loaded first, as produced by `find_table_lumps`
        let lookup = PatchLookup::build(&stack, &[2, 0], &mut diag).unwrap();
        assert_eq!(lookup.len(), 5);
        assert_eq!(lookup.lumps()[0].sum_before, 0);
        assert_eq!(lookup.lumps()[1].sum_before, 2);
        assert_eq!(lookup.offset_for_archive(1), 0);
        assert_eq!(lookup.offset_for_archive(0), 2);
        assert_eq!(lookup.offset_for_archive(7), 0);
        assert_eq!(lookup.get(2), Some(1)); // "A" from the IWAD table
    }

    #[test]
    fn overlong_count_is_clamped() {
        let mut table = pnames(&["A"]);
        table[0..4].copy_from_slice(&100i32.to_le_bytes());
        let wad = WadBuilder::iwad().lump("PNAMES", &table).build();
        let mut stack = WadStack::new();
        stack.add_bytes("t", wad).unwrap();

        let mut diag = Diagnostics::default();
        let lookup = PatchLookup::build(&stack, &[0], &mut diag).unwrap();
        assert_eq!(lookup.len(), 1);
        assert_eq!(diag.report.truncated_tables, 1);
    }
}
