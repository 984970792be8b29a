//! Texture-definition merger.
//!
//! ```text
//! TEXTUREx:  i32 count, u32 offset[count], records…
//! record:    u8 name[8], u32 flags, i16 width, i16 height,
//!            i32 column_directory (unused), i16 patch_count,
//!            patch_count × { i16 origin_x, i16 origin_y, i16 patch,
//!                            i16 step_dir, i16 colormap }
//! ```
//!
//! Patch indices inside a record are local to the PNAMES lump of the same
//! archive; the merger re-bases them onto the flat [`PatchLookup`].

use bincode::Decode;
use bitflags::bitflags;
use byteorder::{LittleEndian as LE, ReadBytesExt};
use smallvec::{SmallVec, smallvec};

use super::{
    bank::{PLACEHOLDER, PatchBank, PatchId},
    diag::{Condition, Diagnostics},
    patch::PLACEHOLDER_SIZE,
    pnames::PatchLookup,
};
use crate::wad::{LumpId, LumpSource, WadError, decode_records, name::name_str};

/*=======================================================================*/
/*                         Raw binary structs                            */
/*=======================================================================*/

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawMapTexture {
    pub name: [u8; 8],
    pub flags: u32,
    pub width: i16,
    pub height: i16,
    pub column_directory: i32,
    pub patch_count: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawMapPatch {
    pub origin_x: i16,
    pub origin_y: i16,
    pub patch: i16,
    pub step_dir: i16,
    pub colormap: i16,
}

/// On-disk size of [`RawMapTexture`].
const MAPTEXTURE_SIZE: usize = 22;

bitflags! {
    /// Texture record flags word (ZDoom extensions; vanilla leaves it 0).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TextureFlags: u32 {
        const MASKED        = 0x0000_0001;
        const WORLD_PANNING = 0x0000_8000;
    }
}

/*=======================================================================*/
/*                              Templates                                */
/*=======================================================================*/

/// One patch placed inside a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexturePatch {
    pub origin_x: i32,
    pub origin_y: i32,
    pub patch: PatchId,
}

/// Immutable texture definition.  Placement order is paint order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureTemplate {
    pub name: [u8; 8],
    pub flags: TextureFlags,
    pub width: usize,
    pub height: usize,
    pub patches: SmallVec<[TexturePatch; 4]>,
}

impl TextureTemplate {
    pub fn name(&self) -> &str {
        name_str(&self.name)
    }

    /// Stand-in for a record that could not be read: blank name, one
    /// placeholder patch.
    pub fn placeholder() -> Self {
        Self {
            name: [0; 8],
            flags: TextureFlags::empty(),
            width: PLACEHOLDER_SIZE as usize,
            height: PLACEHOLDER_SIZE as usize,
            patches: smallvec![TexturePatch {
                origin_x: 0,
                origin_y: 0,
                patch: PLACEHOLDER,
            }],
        }
    }
}

/*=======================================================================*/
/*                                Merger                                 */
/*=======================================================================*/

/// Parse every TEXTURE lump in `textures` order into templates.  Template
/// index = global texture id.
pub(crate) fn merge_textures<S: LumpSource + ?Sized>(
    source: &S,
    textures: &[LumpId],
    lookup: &PatchLookup,
    bank: &mut PatchBank,
    diag: &mut Diagnostics,
) -> Result<Vec<TextureTemplate>, WadError> {
    let mut out = Vec::new();

    for &lump in textures {
        let bytes = source.data(lump)?;
        let pnames_offset = lookup.offset_for_archive(source.archive_of(lump));

        let mut hdr = bytes;
        let declared = hdr.read_i32::<LE>().unwrap_or(0).max(0) as usize;
        let fits = bytes.len().saturating_sub(4) / 4;
        let count = if declared > fits {
            diag.report.truncated_tables += 1;
            diag.warn_once(
                Condition::TruncatedTable,
                format_args!("TEXTURE lump #{lump} declares {declared} textures, only {fits} fit"),
            );
            fits
        } else {
            declared
        };

        for _ in 0..count {
            let offset = hdr.read_u32::<LE>()? as usize;
            let tex = parse_record(source, bytes, offset, pnames_offset, lookup, bank, diag)?
                .unwrap_or_else(|| {
                    diag.report.bad_texture_offsets += 1;
                    diag.warn_once(
                        Condition::BadTextureOffset,
                        format_args!(
                            "TEXTURE lump #{lump}: bad texture directory entry {offset} (lump is {} bytes)",
                            bytes.len()
                        ),
                    );
                    TextureTemplate::placeholder()
                });
            out.push(tex);
        }
        log::debug!("TEXTURE lump #{lump}: {count} textures, patch offset {pnames_offset}");
    }
    Ok(out)
}

/// Decode the record at `offset`; `None` when its header does not fit.
fn parse_record<S: LumpSource + ?Sized>(
    source: &S,
    bytes: &[u8],
    offset: usize,
    pnames_offset: usize,
    lookup: &PatchLookup,
    bank: &mut PatchBank,
    diag: &mut Diagnostics,
) -> Result<Option<TextureTemplate>, WadError> {
    let Some(record) = bytes.get(offset..).filter(|r| r.len() >= MAPTEXTURE_SIZE) else {
        return Ok(None);
    };
    let Some(raw) = decode_records::<RawMapTexture>(record, 1, "maptexture")?.pop() else {
        return Ok(None);
    };

    let declared = raw.patch_count.max(0) as usize;
    let placements = decode_records::<RawMapPatch>(&record[MAPTEXTURE_SIZE..], declared, "mappatch")?;
    let name = name_str(&raw.name);
    if placements.len() < declared {
        diag.report.truncated_tables += 1;
        diag.warn_once(
            Condition::TruncatedTable,
            format_args!(
                "texture {name}: {declared} patches declared, {} present",
                placements.len()
            ),
        );
    }

    let mut missing = 0;
    let patches = placements
        .iter()
        .map(|mp| {
            let index = i64::from(mp.patch) + pnames_offset as i64;
            let patch = match lookup.get(index) {
                Some(l) => bank.intern(source, l),
                None => PLACEHOLDER,
            };
            if patch == PLACEHOLDER {
                missing += 1;
            }
            TexturePatch {
                origin_x: i32::from(mp.origin_x),
                origin_y: i32::from(mp.origin_y),
                patch,
            }
        })
        .collect();

    if missing > 0 {
        diag.report.placeholder_placements += missing;
        diag.warn_once(
            Condition::MissingPatch,
            format_args!("texture {name}: {missing} missing patch(es), using placeholder"),
        );
    }

    Ok(Some(TextureTemplate {
        name: raw.name,
        flags: TextureFlags::from_bits_retain(raw.flags),
        width: raw.width.max(0) as usize,
        height: raw.height.max(0) as usize,
        patches,
    }))
}

/*=======================================================================*/
/*                                Tests                                  */
/*=======================================================================*/
