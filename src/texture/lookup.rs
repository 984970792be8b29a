//! Column directory: per-column patch/post counts and the byte layout of
//! the sparse composite, computed once per texture before any painting.
//!
//! Sparse column slot layout (offsets relative to the slot start):
//!
//! ```text
//! 0        3                     3+height
//! | header | painted pixels ...  | room for 4 bytes/post + terminator |
//! ```
//!
//! During compositing the pixels are painted at `+3`, then the slot is
//! rewritten from `+0` as a post stream.  A slot is
//! `4 × posts + 5 + height` bytes long.

use std::ops::Range;

use super::{
    bank::PatchBank,
    diag::{Condition, Diagnostics},
    maptex::TextureTemplate,
    patch::count_posts,
};

/// Header bytes in front of the painted pixels of a slot.
pub const COLUMN_HEADER_SIZE: usize = 3;

/// Post scan gives up after this many bytes of one patch column.
#[inline]
pub fn post_scan_limit(height: usize) -> usize {
    3 * height + 3
}

/// Per-column bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColumnEntry {
    /// Patches covering this column.
    pub patches: u32,
    /// Posts those patches contribute (upper bound for the merged column).
    pub posts: u32,
    /// Start of this column's slot in the sparse buffer.
    pub sparse_offset: usize,
}

impl ColumnEntry {
    /// Exactly one patch covers the column.  Zero-patch and multi-patch
    /// columns are both composited the regular way.
    #[inline]
    pub fn is_single_patch(&self) -> bool {
        self.patches == 1
    }

    /// Bytes reserved for this column's slot.
    #[inline]
    pub fn slot_size(&self, height: usize) -> usize {
        4 * self.posts as usize + 5 + height
    }
}

/// Column layout of one texture.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnDirectory {
    pub columns: Vec<ColumnEntry>,
    pub height: usize,
    /// Exact byte size of the sparse composite.
    pub sparse_size: usize,
}

impl ColumnDirectory {
    /// Scan every placement of `tex` and lay out its sparse buffer.
    pub(crate) fn build(tex: &TextureTemplate, bank: &PatchBank, diag: &mut Diagnostics) -> Self {
        let (width, height) = (tex.width, tex.height);
        let limit = post_scan_limit(height);
        let mut columns = vec![ColumnEntry::default(); width];

        for tp in &tex.patches {
            let patch = bank.get(tp.patch);
            let x1 = tp.origin_x;
            let x2 = (x1 + i32::from(patch.width)).min(width as i32);

            for x in x1.max(0)..x2 {
                let col = &mut columns[x as usize];
                col.patches += 1;
                col.posts += count_posts(patch.column((x - x1) as usize), limit) as u32;
            }
        }

        let mut size = 0;
        let mut patchless = 0;
        for col in &mut columns {
            if col.patches == 0 {
                patchless += 1;
            }
            col.sparse_offset = size;
            size += col.slot_size(height);
        }

        if patchless > 0 {
            diag.report.patchless_columns += patchless;
            diag.warn_once(
                Condition::PatchlessColumn,
                format_args!("texture {}: {patchless} column(s) without a patch", tex.name()),
            );
        }

        Self {
            columns,
            height,
            sparse_size: size,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Byte range of column `x`'s slot in the sparse buffer.
    pub fn sparse_range(&self, x: usize) -> Range<usize> {
        let c = &self.columns[x];
        c.sparse_offset..c.sparse_offset + c.slot_size(self.height)
    }

    /// Column `x` in the dense buffer always starts at `x × height`.
    #[inline]
    pub fn dense_offset(&self, x: usize) -> usize {
        x * self.height
    }

    pub fn dense_size(&self) -> usize {
        self.columns.len() * self.height
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
