//! Compositor: paints every patch of a texture into its column slots, then
//! re-encodes each column as a minimal post stream driven by per-pixel
//! opacity marks.
//!
//! A cell is opaque if any patch wrote to it, whichever patch that was, so
//! holes in an upper patch show the patch below it.
//!
//! Two buffers come out of one pass:
//! * **sparse** – post-encoded columns at [`ColumnDirectory::sparse_range`],
//!   for masked mid-textures;
//! * **dense** – `width × height` bytes, column-major, for solid walls.

use super::{
    bank::PatchBank,
    lookup::{COLUMN_HEADER_SIZE, ColumnDirectory},
    maptex::TextureTemplate,
    patch::{ColumnPosts, MAX_TOP_DELTA, POST_OVERHEAD, TOP_DELTA_END},
};
use crate::zone::{PurgeTag, ZoneBlock};

/// Both cached representations of one texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Composite {
    sparse: ZoneBlock,
    dense: ZoneBlock,
}

impl Composite {
    pub fn sparse(&self) -> &[u8] {
        &self.sparse
    }

    pub fn dense(&self) -> &[u8] {
        &self.dense
    }

    /// Bytes held by both buffers.
    pub fn size(&self) -> usize {
        self.sparse.len() + self.dense.len()
    }

    /// Both blocks have been demoted and may be reclaimed.
    pub fn is_purgable(&self) -> bool {
        self.sparse.is_purgable() && self.dense.is_purgable()
    }
}

/// Outcome of [`generate`].
#[derive(Debug)]
pub(crate) struct Generated {
    pub composite: Composite,
    /// Columns that ran out of slot room and were terminated early.
    pub truncated_columns: usize,
}

/// Build both buffers for `tex`.
pub(crate) fn generate(tex: &TextureTemplate, dir: &ColumnDirectory, bank: &PatchBank) -> Generated {
    let (width, height) = (tex.width, tex.height);

    let mut sparse = ZoneBlock::alloc(dir.sparse_size, PurgeTag::Static);
    let mut dense = ZoneBlock::alloc(dir.dense_size(), PurgeTag::Static);
    let mut marks = vec![false; width * height];

    /*----- 1. paint every patch, back to front ---------------------------*/
    for tp in &tex.patches {
        let patch = bank.get(tp.patch);
        let x1 = tp.origin_x;
        let x2 = (x1 + i32::from(patch.width)).min(width as i32);

        for x in x1.max(0)..x2 {
            let posts = patch.posts((x - x1) as usize);
            let x = x as usize;
            let entry = &dir.columns[x];
            // single-patch columns are laid out as if read straight from
            // the patch, which ignores originy
            let origin_y = if entry.is_single_patch() { 0 } else { tp.origin_y };
            let payload = entry.sparse_offset + COLUMN_HEADER_SIZE;

            draw_column_in_cache(
                posts,
                &mut sparse[payload..payload + height],
                origin_y,
                &mut marks[x * height..(x + 1) * height],
            );
        }
    }

    /*----- 2. rebuild each column as posts -------------------------------*/
    let mut source = vec![0u8; height];
    let mut truncated_columns = 0;
    for x in 0..width {
        let slot = &mut sparse[dir.sparse_range(x)];
        source.copy_from_slice(&slot[COLUMN_HEADER_SIZE..COLUMN_HEADER_SIZE + height]);

        let ofs = dir.dense_offset(x);
        dense[ofs..ofs + height].copy_from_slice(&source);

        if !rebuild_posts(slot, &source, &marks[x * height..(x + 1) * height]) {
            truncated_columns += 1;
        }
    }

    /*----- 3. finished: purgable from now on -----------------------------*/
    sparse.change_tag(PurgeTag::Cache);
    dense.change_tag(PurgeTag::Cache);

    Generated {
        composite: Composite { sparse, dense },
        truncated_columns,
    }
}

/// Clip one patch column into a slot's pixel area, marking every written
/// cell opaque.
///
/// A post starting above row 0 loses its bottom rows, not its top ones: the
/// copy still starts at the post's first pixel, as the classic engines do.
fn draw_column_in_cache(posts: ColumnPosts<'_>, cache: &mut [u8], origin_y: i32, marks: &mut [bool]) {
    let height = cache.len() as i32;

    for post in posts {
        let mut count = post.pixels.len() as i32;
        let mut position = origin_y + post.top;

        if position < 0 {
            count += position;
            position = 0;
        }
        count = count.min(height - position);
        if count <= 0 {
            continue;
        }

        let (pos, count) = (position as usize, count as usize);
        cache[pos..pos + count].copy_from_slice(&post.pixels[..count]);
        marks[pos..pos + count].fill(true);
    }
}

/// Rewrite `slot` as a post stream of the opaque runs in `marks`, copying
/// pixels from `source`.
///
/// Topdeltas are absolute until a post starts at row 254 or below, then
/// relative to the previous post's top.  Returns `false` when the slot ran
/// out of room and the column was cut short.
fn rebuild_posts(slot: &mut [u8], source: &[u8], marks: &[bool]) -> bool {
    let height = source.len();
    let limit = usize::from(MAX_TOP_DELTA);
    let mut p = 0;
    let mut j = 0;
    let mut reltop = 0;
    let mut relative = false;

    loop {
        // skip transparent cells
        while j < height && reltop < limit && !marks[j] {
            j += 1;
            reltop += 1;
        }
        if j >= height {
            slot[p] = TOP_DELTA_END;
            return true;
        }

        let delta = if relative { reltop } else { j };
        let abstop = j;
        if abstop >= limit {
            relative = true;
            reltop = 0;
        }

        // count opaque cells
        let mut len = 0;
        while j < height && reltop < limit && marks[j] {
            j += 1;
            reltop += 1;
            len += 1;
        }

        if p + len + POST_OVERHEAD + 1 > slot.len() {
            slot[p] = TOP_DELTA_END;
            return false;
        }

        let pixels = &source[abstop..abstop + len];
        slot[p] = delta as u8;
        slot[p + 1] = len as u8;
        slot[p + 2] = pixels.first().copied().unwrap_or(0);
        slot[p + 3..p + 3 + len].copy_from_slice(pixels);
        slot[p + 3 + len] = pixels.last().copied().unwrap_or(0);
        p += len + POST_OVERHEAD;
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        texture::{
            diag::Diagnostics,
            maptex::{TextureFlags, TexturePatch},
            patch::encode_patch,
        },
        wad::{WadStack, testwad::WadBuilder},
    };

    /// Bank holding a solid 4×4 patch (colour 1) and a 4×4 patch of colour 2
    /// with a transparent row 1.
    fn bank() -> (PatchBank, u32, u32) {
        let solid = encode_patch(4, 4, 0, 0, |_, _| Some(1));
        let holed = encode_patch(4, 4, 0, 0, |_, y| (y != 1).then_some(2));
        let mut stack = WadStack::new();
        stack
            .add_bytes("t", WadBuilder::iwad().lump("SOLID", &solid).lump("HOLED", &holed).build())
            .unwrap();
        let mut bank = PatchBank::new();
        let a = bank.intern(&stack, 0);
        let b = bank.intern(&stack, 1);
        (bank, a, b)
    }

    fn build(bank: &PatchBank, patches: &[TexturePatch]) -> (ColumnDirectory, Generated) {
        let tex = TextureTemplate {
            name: *b"T\0\0\0\0\0\0\0",
            flags: TextureFlags::empty(),
            width: 4,
            height: 4,
            patches: patches.iter().copied().collect(),
        };
        let dir = ColumnDirectory::build(&tex, bank, &mut Diagnostics::default());
        let generated = generate(&tex, &dir, bank);
        (dir, generated)
    }

    fn posts_of(slot: &[u8]) -> Vec<(i32, Vec<u8>)> {
        ColumnPosts::new(slot)
            .filter(|p| !p.pixels.is_empty())
            .map(|p| (p.top, p.pixels.to_vec()))
            .collect()
    }

    #[test]
    fn rebuild_merges_adjacent_marks() {
        let source = [0, 5, 6, 0, 7, 0];
        let marks = [false, true, true, false, true, false];
        let mut slot = vec![0xAA; 4 * 2 + 5 + 6];
        assert!(rebuild_posts(&mut slot, &source, &marks));
        assert_eq!(posts_of(&slot), vec![(1, vec![5, 6]), (4, vec![7])]);
        // header, pixels and pads are written in place
        assert_eq!(&slot[..6], &[1, 2, 5, 5, 6, 6]);
        assert_eq!(slot[11], TOP_DELTA_END);
    }

    #[test]
    fn rebuild_empty_column() {
        let mut slot = vec![0; 5 + 4];
        assert!(rebuild_posts(&mut slot, &[0; 4], &[false; 4]));
        assert_eq!(slot[0], TOP_DELTA_END);
    }

    #[test]
    fn rebuild_switches_to_relative_past_254() {
        let height = 400;
        let source: Vec<u8> = (0..height).map(|y| (y % 251) as u8).collect();
        let marks: Vec<bool> = (0..height).map(|y| (10..20).contains(&y) || (300..310).contains(&y)).collect();
        let mut slot = vec![0; 4 * 3 + 5 + height];
        assert!(rebuild_posts(&mut slot, &source, &marks));

        let posts = posts_of(&slot);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].0, 10);
        assert_eq!(posts[1].0, 300);
        assert_eq!(posts[1].1, source[300..310].to_vec());
    }

    #[test]
    fn rebuild_reports_overflow() {
        // three runs but room for only one post
        let marks = [true, false, true, false, true, false];
        let mut slot = vec![0; 4 + 5 + 1];
        assert!(!rebuild_posts(&mut slot, &[1, 0, 2, 0, 3, 0], &marks));
        assert_eq!(posts_of(&slot), vec![(0, vec![1])]);
    }

    #[test]
    fn draw_clips_above_and_below() {
        let bytes = encode_patch(1, 6, 0, 0, |_, y| Some(y as u8 + 1));
        let patch = crate::texture::patch::Patch::parse(&bytes).unwrap();

        let mut cache = [0u8; 4];
        let mut marks = [false; 4];
        draw_column_in_cache(patch.posts(0), &mut cache, -1, &mut marks);
        assert_eq!(cache, [1, 2, 3, 4]);
        assert_eq!(marks, [true; 4]);

        // shifted far up: only the first two pixels survive, at the top
        let mut cache = [0u8; 4];
        let mut marks = [false; 4];
        draw_column_in_cache(patch.posts(0), &mut cache, -4, &mut marks);
        assert_eq!(cache, [1, 2, 0, 0]);
        assert_eq!(marks, [true, true, false, false]);

        let mut cache = [0u8; 4];
        let mut marks = [false; 4];
        draw_column_in_cache(patch.posts(0), &mut cache, 2, &mut marks);
        assert_eq!(cache, [0, 0, 1, 2]);
        assert_eq!(marks, [false, false, true, true]);

        let mut cache = [0u8; 4];
        let mut marks = [false; 4];
        draw_column_in_cache(patch.posts(0), &mut cache, 10, &mut marks);
        assert_eq!(marks, [false; 4]);
    }

    #[test]
    fn holes_in_upper_patch_show_the_lower_one() {
        let (bank, solid, holed) = bank();
        let (dir, out) = build(
            &bank,
            &[
                TexturePatch { origin_x: 0, origin_y: 0, patch: solid },
                TexturePatch { origin_x: 0, origin_y: 0, patch: holed },
            ],
        );
        let c = &out.composite;
        assert_eq!(out.truncated_columns, 0);
        assert_eq!(c.dense().len(), 16);
        assert_eq!(&c.dense()[4..8], &[2, 1, 2, 2]);
        assert_eq!(posts_of(&c.sparse()[dir.sparse_range(2)]), vec![(0, vec![2, 1, 2, 2])]);
        assert!(c.is_purgable());
        assert_eq!(c.size(), dir.sparse_size + 16);
    }

    #[test]
    fn single_patch_column_ignores_origin_y() {
        let (bank, _, holed) = bank();
        let (dir, out) = build(&bank, &[TexturePatch { origin_x: 0, origin_y: 2, patch: holed }]);
        let c = &out.composite;
        assert_eq!(&c.dense()[..4], &[2, 0, 2, 2]);
        assert_eq!(
            posts_of(&c.sparse()[dir.sparse_range(0)]),
            vec![(0, vec![2]), (2, vec![2, 2])]
        );
    }

    #[test]
    fn uncovered_columns_are_empty() {
        let (bank, solid, _) = bank();
        let (dir, out) = build(&bank, &[TexturePatch { origin_x: 2, origin_y: 0, patch: solid }]);
        let c = &out.composite;
        assert_eq!(&c.dense()[..8], &[0; 8]);
        assert_eq!(c.sparse()[dir.sparse_range(0).start], TOP_DELTA_END);
        assert_eq!(&c.dense()[8..], &[1; 8]);
    }
}
