//! Load-time diagnostics.
//!
//! Nothing in the texture pipeline is fatal once `TEXTURE1` has been found;
//! every defect is counted here and logged, noisy ones only once per load.

use std::{collections::HashSet, fmt};

/// Defect classes that are logged only the first time they occur.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Condition {
    TruncatedTable,
    BadTextureOffset,
    PatchlessColumn,
    MissingPatch,
}

/// Counters describing what a load had to tolerate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// PNAMES entries with no matching lump.
    pub unresolved_patch_names: usize,
    /// PNAMES entries whose lump is not a usable patch image.
    pub invalid_patches: usize,
    /// Patch placements that fell back to the placeholder patch.
    pub placeholder_placements: usize,
    /// Texture directory entries pointing outside their lump.
    pub bad_texture_offsets: usize,
    /// Tables whose declared count or record does not fit their lump.
    pub truncated_tables: usize,
    /// Texture columns not covered by any patch.
    pub patchless_columns: usize,
}

impl LoadReport {
    /// `true` when the load needed no substitution at all.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    pub report: LoadReport,
    warned: HashSet<Condition>,
}

impl Diagnostics {
    /// Log `msg` at warn level the first time `cond` is hit this load, at
    /// debug level afterwards.
    pub fn warn_once(&mut self, cond: Condition, msg: fmt::Arguments<'_>) {
        if self.warned.insert(cond) {
            log::warn!("{msg}");
        } else {
            log::debug!("{msg}");
        }
    }

    #[cfg(test)]
    pub fn warned(&self, cond: Condition) -> bool {
        self.warned.contains(&cond)
    }

    pub fn into_report(self) -> LoadReport {
        self.report
    }
}
