//! # Doom WAD loader
//!
//! * Reads every archive entirely into RAM.
//! * Stacks an IWAD with any number of PWADs; later archives shadow
//!   earlier ones for name lookups.
//! * Provides zero-copy access to individual lumps.
//! * Decodes fixed-size binary records with **bincode 2**.

use bincode::{Decode, config, decode_from_slice, error::DecodeError};
use byteorder::{LittleEndian as LE, ReadBytesExt};
use std::{
    collections::HashMap,
    fs,
    io::{self, Read},
    ops::Range,
    path::Path,
};
use thiserror::Error;

use super::{
    name::{eq_ignore_case, name_str},
    source::{LumpId, LumpSource},
};

/// Size (in bytes) of one directory entry.
const DIR_ENTRY_SIZE: usize = 16;

/// One entry in the merged lump directory.
#[derive(Clone, Debug)]
pub struct LumpInfo {
    /// Eight-byte ASCII name, padded with NULs.
    pub name: [u8; 8],
    /// Offset to lump data from the beginning of its archive.
    pub offset: u32,
    /// Size of the lump in bytes.
    pub size: u32,
    /// Index of the archive (load order) this lump lives in.
    pub archive: usize,
}

#[derive(Debug)]
struct Archive {
    label: String,
    bytes: Vec<u8>,
}

/// IWAD + PWADs resident in memory.
#[derive(Debug, Default)]
pub struct WadStack {
    lumps: Vec<LumpInfo>,
    archives: Vec<Archive>,
    /// upper-case name → last lump with that name
    by_name: HashMap<String, usize>,
    /// lump ranges between flat markers
    flats: Vec<Range<usize>>,
}

/// Loader / decoding errors.
#[derive(Error, Debug)]
pub enum WadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}: not an IWAD or PWAD file")]
    BadMagic(String),

    #[error("{0}: directory extends beyond end of file")]
    DirectoryOutOfBounds(String),

    #[error("lump index {0} out of range")]
    BadIndex(usize),

    #[error("lump {name} (# {index}) slice {offset}+{size} past EOF ({file_size})")]
    BadOffset {
        index: usize,
        name: String,
        offset: u32,
        size: u32,
        file_size: usize,
    },

    #[error("record {elem} of {what}: {source}")]
    BadElement {
        what: &'static str,
        elem: usize,
        source: bincode::error::DecodeError,
    },
}

impl WadStack {
    // ------------------------------------------------------------------ //
    // Loading
    // ------------------------------------------------------------------ //

    pub fn new() -> Self {
        Self::default()
    }

    /// Load a single archive from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WadError> {
        let mut stack = Self::new();
        stack.add_file(path)?;
        Ok(stack)
    }

    /// Load several archives in order (IWAD first, PWADs after).
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, WadError> {
        let mut stack = Self::new();
        for p in paths {
            stack.add_file(p)?;
        }
        Ok(stack)
    }

    /// Append an archive from disk on top of the stack.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), WadError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        self.add_bytes(path.display().to_string(), bytes)
    }

    /// Append an in-memory archive on top of the stack.
    pub fn add_bytes(&mut self, label: impl Into<String>, bytes: Vec<u8>) -> Result<(), WadError> {
        let label = label.into();
        let archive = self.archives.len();

        /*----------- 1. header ------------------------------------------*/
        let mut cur = bytes.as_slice();
        let mut magic = [0u8; 4];
        cur.read_exact(&mut magic)
            .map_err(|_| WadError::BadMagic(label.clone()))?;
        if &magic != b"IWAD" && &magic != b"PWAD" {
            return Err(WadError::BadMagic(label));
        }
        let num_lumps = cur.read_u32::<LE>()? as usize;
        let dir_offset = cur.read_u32::<LE>()? as usize;

        /*----------- 2. directory bounds --------------------------------*/
        let dir_end = num_lumps
            .checked_mul(DIR_ENTRY_SIZE)
            .and_then(|n| n.checked_add(dir_offset))
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| WadError::DirectoryOutOfBounds(label.clone()))?;

        /*----------- 3. parse entries -----------------------------------*/
        let first = self.lumps.len();
        let mut parsed = Vec::with_capacity(num_lumps);
        let mut cur = &bytes[dir_offset..dir_end];
        for i in 0..num_lumps {
            let offset = cur.read_u32::<LE>()?;
            let size = cur.read_u32::<LE>()?;
            let mut name = [0u8; 8];
            cur.read_exact(&mut name)?;

            let end = offset as usize + size as usize;
            if end > bytes.len() {
                return Err(WadError::BadOffset {
                    index: first + i,
                    name: name_str(&name).into(),
                    offset,
                    size,
                    file_size: bytes.len(),
                });
            }
            parsed.push(LumpInfo {
                name,
                offset,
                size,
                archive,
            });
        }
        self.lumps.extend(parsed);

        /*----------- 4. name index (later lumps shadow earlier ones) -----*/
        for i in first..self.lumps.len() {
            let key = name_str(&self.lumps[i].name).to_ascii_uppercase();
            self.by_name.insert(key, i);
        }

        /*----------- 5. flat namespace -----------------------------------*/
        let mut open = None;
        for i in first..self.lumps.len() {
            match name_str(&self.lumps[i].name).to_ascii_uppercase().as_str() {
                "F_START" | "FF_START" => open = open.or(Some(i + 1)),
                "F_END" | "FF_END" => {
                    if let Some(start) = open.take() {
                        self.flats.push(start..i);
                    }
                }
                _ => {}
            }
        }

        log::debug!("{label}: {num_lumps} lumps (archive #{archive})");
        self.archives.push(Archive { label, bytes });
        Ok(())
    }

    // ------------------------------------------------------------------ //
    // Helpers
    // ------------------------------------------------------------------ //

    /// Expose the merged directory as a read-only slice.
    pub fn lumps(&self) -> &[LumpInfo] {
        &self.lumps
    }

    /// Number of archives on the stack.
    pub fn archive_count(&self) -> usize {
        self.archives.len()
    }

    /// Path or label an archive was loaded from.
    pub fn archive_label(&self, archive: usize) -> Option<&str> {
        self.archives.get(archive).map(|a| a.label.as_str())
    }

    /// Raw bytes of lump `idx` (slice into its archive).
    pub fn lump_bytes(&self, idx: usize) -> Result<&[u8], WadError> {
        let l = self.lumps.get(idx).ok_or(WadError::BadIndex(idx))?;
        let bytes = &self.archives[l.archive].bytes;
        let start = l.offset as usize;
        let end = start + l.size as usize;
        bytes.get(start..end).ok_or_else(|| WadError::BadOffset {
            index: idx,
            name: name_str(&l.name).into(),
            offset: l.offset,
            size: l.size,
            file_size: bytes.len(),
        })
    }

    /// Find the last lump with `name` (case-insensitive).
    pub fn find_lump(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_uppercase()).copied()
    }
}

impl LumpSource for WadStack {
    fn num_lumps(&self) -> usize {
        self.lumps.len()
    }

    fn lump_name(&self, lump: LumpId) -> Option<[u8; 8]> {
        self.lumps.get(lump).map(|l| l.name)
    }

    fn resolve(&self, name: &str) -> Option<LumpId> {
        self.find_lump(name)
    }

    fn resolve_before(&self, name: &str, lump: LumpId) -> Option<LumpId> {
        let end = lump.min(self.lumps.len());
        (0..end)
            .rev()
            .find(|&i| eq_ignore_case(&self.lumps[i].name, name.as_bytes()))
    }

    fn data(&self, lump: LumpId) -> Result<&[u8], WadError> {
        self.lump_bytes(lump)
    }

    fn archive_of(&self, lump: LumpId) -> usize {
        self.lumps.get(lump).map_or(usize::MAX, |l| l.archive)
    }

    fn is_flat(&self, lump: LumpId) -> bool {
        self.flats.iter().any(|r| r.contains(&lump))
    }
}

// ---------------------------------------------------------------------- //
// Generic decode helper
// ---------------------------------------------------------------------- //

/// Decode up to `count` consecutive fixed-size records from `bytes`.
///
/// Stops early (without error) when the slice runs out, so a truncated
/// table yields the records that fit.
pub fn decode_records<T>(bytes: &[u8], count: usize, what: &'static str) -> Result<Vec<T>, WadError>
where
    T: Decode<()>,
{
    let cfg = config::standard()
        .with_fixed_int_encoding()
        .with_little_endian();
    let mut out = Vec::with_capacity(count.min(bytes.len()));
    let mut slice = bytes;

    while out.len() < count && !slice.is_empty() {
        match decode_from_slice::<T, _>(slice, cfg) {
            Ok((val, read)) => {
                out.push(val);
                slice = &slice[read..];
            }
            Err(DecodeError::UnexpectedEnd { .. }) => break,
            Err(e) => {
                return Err(WadError::BadElement {
                    what,
                    elem: out.len(),
                    source: e,
                });
            }
        }
    }
    Ok(out)
}

// ==========================================================================
// Tests
// ==========================================================================
