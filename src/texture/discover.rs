//! Locate every PNAMES / TEXTURE1 / TEXTURE2 lump across the archive stack,
//! in the order the mergers must process them.

use once_cell::sync::Lazy;
use regex::Regex;

use super::set::LoadError;
use crate::wad::{LumpId, LumpSource, name::name_str};

static PNAMES_LUMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^PNAMES").unwrap());
static TEXTURE_LUMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^TEXTURE[12]$").unwrap());

/// Table lumps in processing order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableLumps {
    /// Every `PNAMES*` lump, last-loaded first.
    pub pnames: Vec<LumpId>,
    /// The resolving `TEXTURE1`, the resolving `TEXTURE2` (if any), then
    /// every other `TEXTURE1`/`TEXTURE2`, last-loaded first.
    pub textures: Vec<LumpId>,
}

/// Scan the merged directory from last lump to first.
pub fn find_table_lumps<S: LumpSource + ?Sized>(source: &S) -> Result<TableLumps, LoadError> {
    let texture1 = source
        .resolve("TEXTURE1")
        .ok_or(LoadError::MissingLump("TEXTURE1"))?;
    let texture2 = source.resolve("TEXTURE2");

    let mut out = TableLumps {
        pnames: Vec::new(),
        textures: std::iter::once(texture1).chain(texture2).collect(),
    };

    for lump in (0..source.num_lumps()).rev() {
        let Some(raw) = source.lump_name(lump) else {
            continue;
        };
        let name = name_str(&raw);
        if PNAMES_LUMP.is_match(name) {
            out.pnames.push(lump);
        } else if TEXTURE_LUMP.is_match(name) && lump != texture1 && Some(lump) != texture2 {
            out.textures.push(lump);
        }
    }

    log::debug!(
        "texture tables: {} PNAMES, {} TEXTUREx",
        out.pnames.len(),
        out.textures.len()
    );
    Ok(out)
}
