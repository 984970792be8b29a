//! Builders for texture-table lumps used across the texture tests.

use super::patch::encode_patch;
use crate::wad::name::to_name8;

/// PNAMES lump from a list of names.
pub fn pnames(names: &[&str]) -> Vec<u8> {
    let mut out = (names.len() as i32).to_le_bytes().to_vec();
    for n in names {
        out.extend(to_name8(n));
    }
    out
}

/// One texture definition: name, width, height, `(origin_x, origin_y, patch)`.
pub struct TexDef<'a> {
    pub name: &'a str,
    pub width: i16,
    pub height: i16,
    pub patches: &'a [(i16, i16, i16)],
}

/// TEXTURE1/2 lump: count, directory, records.
pub fn texture_lump(defs: &[TexDef<'_>]) -> Vec<u8> {
    let mut records = Vec::new();
    let mut offsets = Vec::new();
    let dir_size = 4 + 4 * defs.len();
    for d in defs {
        offsets.push((dir_size + records.len()) as u32);
        records.extend(to_name8(d.name));
        records.extend(0u32.to_le_bytes()); // flags
        records.extend(d.width.to_le_bytes());
        records.extend(d.height.to_le_bytes());
        records.extend(0i32.to_le_bytes()); // column directory
        records.extend((d.patches.len() as i16).to_le_bytes());
        for &(x, y, p) in d.patches {
            records.extend(x.to_le_bytes());
            records.extend(y.to_le_bytes());
            records.extend(p.to_le_bytes());
            records.extend(1i16.to_le_bytes()); // step dir
            records.extend(0i16.to_le_bytes()); // colormap
        }
    }

    let mut out = (defs.len() as i32).to_le_bytes().to_vec();
    for o in offsets {
        out.extend(o.to_le_bytes());
    }
    out.extend(records);
    out
}

/// Fully opaque patch filled with `colour`.
pub fn solid(w: u16, h: u16, colour: u8) -> Vec<u8> {
    encode_patch(w, h, 0, 0, |_, _| Some(colour))
}
