//! Patch images: the column-major, run-length encoded pictures every wall
//! texture is assembled from.
//!
//! ```text
//! i16 width, i16 height, i16 left_offset, i16 top_offset
//! u32 column_offset[width]
//! per column: { u8 topdelta, u8 length, u8 pad, u8 pixels[length], u8 pad }*
//!             u8 0xFF
//! ```
//!
//! A composited *sparse* texture column uses exactly the same post layout,
//! so [`ColumnPosts`] walks both.

use byteorder::{LittleEndian as LE, ReadBytesExt};
use once_cell::sync::Lazy;
use thiserror::Error;

/// Top-delta value that terminates a column.
pub const TOP_DELTA_END: u8 = 0xFF;

/// Largest top-delta that can be stored absolutely.
pub const MAX_TOP_DELTA: u8 = 254;

/// Fixed header in front of the column directory.
pub const PATCH_HEADER_SIZE: usize = 8;

/// Widths/heights above this are treated as garbage.
pub const MAX_PATCH_DIM: i16 = 4096;

/// Bytes of overhead around each post: topdelta, length, two pads.
pub const POST_OVERHEAD: usize = 4;

/*──────────────────────────── Errors ─────────────────────────────────*/

/// Why a lump was rejected as a patch image.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("{0} bytes is too short for a patch")]
    TooShort(usize),

    #[error("implausible size {width}x{height}")]
    BadSize { width: i16, height: i16 },

    #[error("column directory for {width} columns runs past end of lump ({len} bytes)")]
    DirectoryTruncated { width: usize, len: usize },

    #[error("column {column} offset {offset} outside data area")]
    BadColumnOffset { column: usize, offset: usize },
}

/*──────────────────────────── Patch view ─────────────────────────────*/

/// Validated, zero-copy view of a patch lump.
#[derive(Clone, Copy, Debug)]
pub struct Patch<'a> {
    bytes: &'a [u8],
    pub width: u16,
    pub height: u16,
    pub left_offset: i16,
    pub top_offset: i16,
}

impl<'a> Patch<'a> {
    /// Parse and sanity-check a patch lump.
    ///
    /// Every column offset must point past the column directory and before
    /// the end of the lump; anything else is rejected, not repaired.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, PatchError> {
        if bytes.len() < PATCH_HEADER_SIZE + 4 + 1 {
            return Err(PatchError::TooShort(bytes.len()));
        }
        let mut cur = bytes;
        let mut hdr = [0i16; 4];
        for v in &mut hdr {
            *v = cur
                .read_i16::<LE>()
                .map_err(|_| PatchError::TooShort(bytes.len()))?;
        }
        let [width, height, left_offset, top_offset] = hdr;

        if !(1..=MAX_PATCH_DIM).contains(&width) || !(1..=MAX_PATCH_DIM).contains(&height) {
            return Err(PatchError::BadSize { width, height });
        }

        let w = width as usize;
        let dir_end = PATCH_HEADER_SIZE + w * 4;
        if dir_end > bytes.len() {
            return Err(PatchError::DirectoryTruncated {
                width: w,
                len: bytes.len(),
            });
        }

        for column in 0..w {
            let offset = cur
                .read_u32::<LE>()
                .map_err(|_| PatchError::TooShort(bytes.len()))? as usize;
            if offset < dir_end || offset >= bytes.len() {
                return Err(PatchError::BadColumnOffset { column, offset });
            }
        }

        Ok(Self {
            bytes,
            width: width as u16,
            height: height as u16,
            left_offset,
            top_offset,
        })
    }

    /// Whole lump.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Post stream of column `x`, starting at its first topdelta.
    /// Out-of-range columns yield an empty slice.
    pub fn column(&self, x: usize) -> &'a [u8] {
        if x >= self.width as usize {
            return &[];
        }
        let at = PATCH_HEADER_SIZE + x * 4;
        let ofs = u32::from_le_bytes([
            self.bytes[at],
            self.bytes[at + 1],
            self.bytes[at + 2],
            self.bytes[at + 3],
        ]) as usize;
        &self.bytes[ofs..]
    }

    /// Iterate the posts of column `x`.
    pub fn posts(&self, x: usize) -> ColumnPosts<'a> {
        ColumnPosts::new(self.column(x))
    }
}

/*──────────────────────────── Post walker ────────────────────────────*/

/// One opaque run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Post<'a> {
    /// Absolute row of the first pixel.
    pub top: i32,
    pub pixels: &'a [u8],
}

/// Walks a post stream until the `0xFF` terminator or the end of data.
///
/// Tall columns: a topdelta that is not greater than the previous post's
/// top is taken relative to that top, so rows past 254 stay reachable.
#[derive(Clone, Debug)]
pub struct ColumnPosts<'a> {
    data: &'a [u8],
    pos: usize,
    top: i32,
    done: bool,
}

impl<'a> ColumnPosts<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            top: -1,
            done: false,
        }
    }

    /// Bytes walked so far, measured from the column start.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for ColumnPosts<'a> {
    type Item = Post<'a>;

    fn next(&mut self) -> Option<Post<'a>> {
        if self.done {
            return None;
        }
        let (Some(&delta), Some(&len)) = (self.data.get(self.pos), self.data.get(self.pos + 1))
        else {
            self.done = true;
            return None;
        };
        if delta == TOP_DELTA_END {
            self.done = true;
            return None;
        }

        let delta = i32::from(delta);
        self.top = if delta <= self.top {
            self.top + delta
        } else {
            delta
        };

        let end = (self.pos + 3 + len as usize).min(self.data.len());
        let start = (self.pos + 3).min(end);
        self.pos += len as usize + POST_OVERHEAD;

        Some(Post {
            top: self.top,
            pixels: &self.data[start..end],
        })
    }
}

/// Count the posts of a column, giving up once the walk has gone further
/// than `limit` bytes.
pub fn count_posts(column: &[u8], limit: usize) -> usize {
    let mut posts = ColumnPosts::new(column);
    let mut n = 0;
    while posts.consumed() <= limit && posts.next().is_some() {
        n += 1;
    }
    n
}

/*──────────────────────────── Encoder ────────────────────────────────*/

/// Encode a patch image.  `pixel(x, y)` returns `None` for transparent
/// cells.  Columns taller than 254 rows fall back to relative topdeltas.
pub fn encode_patch<F>(width: u16, height: u16, left_offset: i16, top_offset: i16, pixel: F) -> Vec<u8>
where
    F: Fn(usize, usize) -> Option<u8>,
{
    let (w, h) = (width as usize, height as usize);
    let mut out = Vec::with_capacity(PATCH_HEADER_SIZE + w * 4 + w * (h + 8));
    for v in [width as i16, height as i16, left_offset, top_offset] {
        out.extend(&v.to_le_bytes());
    }
    out.resize(PATCH_HEADER_SIZE + w * 4, 0);

    for x in 0..w {
        let ofs = out.len() as u32;
        out[PATCH_HEADER_SIZE + x * 4..][..4].copy_from_slice(&ofs.to_le_bytes());

        let mut top: i32 = -1;
        let mut y = 0;
        while y < h {
            if pixel(x, y).is_none() {
                y += 1;
                continue;
            }
            let start = y;
            while y < h && y - start < 254 && pixel(x, y).is_some() {
                y += 1;
            }
            let run: Vec<u8> = (start..y).filter_map(|yy| pixel(x, yy)).collect();
            let delta = post_delta(&mut out, &mut top, start as i32);
            push_post(&mut out, delta, &run);
            top = start as i32;
        }
        out.push(TOP_DELTA_END);
    }
    out
}

/// Topdelta reaching `row`, emitting empty stepping posts when the gap is
/// too big for one byte.
fn post_delta(out: &mut Vec<u8>, top: &mut i32, row: i32) -> u8 {
    let max = i32::from(MAX_TOP_DELTA);
    loop {
        if row <= max && row > *top {
            return row as u8;
        }
        if *top < max {
            push_post(out, MAX_TOP_DELTA, &[]);
            *top = max;
            continue;
        }
        let d = row - *top;
        if d <= max {
            return d as u8;
        }
        push_post(out, MAX_TOP_DELTA, &[]);
        *top += max;
    }
}

fn push_post(out: &mut Vec<u8>, delta: u8, pixels: &[u8]) {
    out.push(delta);
    out.push(pixels.len() as u8);
    out.push(pixels.first().copied().unwrap_or(0));
    out.extend_from_slice(pixels);
    out.push(pixels.last().copied().unwrap_or(0));
}

/*──────────────────────────── Placeholder ────────────────────────────*/

/// Side of the placeholder checkerboard.
pub const PLACEHOLDER_SIZE: u16 = 8;

/// 8×8 dark/light grey checkerboard substituted for patches that could not
/// be resolved.
pub static PLACEHOLDER_PATCH: Lazy<Vec<u8>> = Lazy::new(|| {
    const LIGHT_IDX: u8 = 8;
    const DARK_IDX: u8 = 16;
    encode_patch(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, 0, 0, |x, y| {
        Some(if (x ^ y) & 1 == 0 { LIGHT_IDX } else { DARK_IDX })
    })
});

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_a_valid_patch() {
        let p = Patch::parse(&PLACEHOLDER_PATCH).unwrap();
        assert_eq!((p.width, p.height), (8, 8));
        let posts: Vec<_> = p.posts(1).collect();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].top, 0);
        assert_eq!(posts[0].pixels, &[16, 8, 16, 8, 16, 8, 16, 8]);
    }

    #[test]
    fn transparent_gaps_become_separate_posts() {
        // rows 1..3 and 5 opaque
        let bytes = encode_patch(1, 8, 0, 0, |_, y| matches!(y, 1 | 2 | 5).then_some(y as u8));
        let p = Patch::parse(&bytes).unwrap();
        let posts: Vec<_> = p.posts(0).collect();
        assert_eq!(posts.len(), 2);
        assert_eq!((posts[0].top, posts[0].pixels), (1, &[1u8, 2][..]));
        assert_eq!((posts[1].top, posts[1].pixels), (5, &[5u8][..]));
        assert_eq!(count_posts(p.column(0), usize::MAX), 2);
    }

    #[test]
    fn tall_columns_use_relative_topdelta() {
        let bytes = encode_patch(1, 400, 0, 0, |_, y| (y == 10 || y == 300).then_some(1));
        let p = Patch::parse(&bytes).unwrap();
        let tops: Vec<i32> = p
            .posts(0)
            .filter(|post| !post.pixels.is_empty())
            .map(|post| post.top)
            .collect();
        assert_eq!(tops, vec![10, 300]);
    }

    #[test]
    fn long_runs_are_split() {
        let bytes = encode_patch(1, 300, 0, 0, |_, _| Some(3));
        let p = Patch::parse(&bytes).unwrap();
        let total: usize = p.posts(0).map(|post| post.pixels.len()).sum();
        assert_eq!(total, 300);
        let rows: Vec<(i32, usize)> = p.posts(0).map(|post| (post.top, post.pixels.len())).collect();
        assert_eq!(rows, vec![(0, 254), (254, 46)]);
    }

    #[test]
    fn post_count_cutoff() {
        let bytes = encode_patch(1, 20, 0, 0, |_, y| (y % 2 == 0).then_some(1));
        let p = Patch::parse(&bytes).unwrap();
        assert_eq!(count_posts(p.column(0), usize::MAX), 10);
        // every post is 5 bytes; posts starting at 0, 5 and 10 are counted
        assert_eq!(count_posts(p.column(0), 10), 3);
    }

    #[test]
    fn rejects_short_and_bad_sizes() {
        assert_eq!(Patch::parse(&[0; 4]).unwrap_err(), PatchError::TooShort(4));

        let mut bytes = encode_patch(2, 2, 0, 0, |_, _| Some(1));
        bytes[0..2].copy_from_slice(&0i16.to_le_bytes());
        assert!(matches!(Patch::parse(&bytes), Err(PatchError::BadSize { .. })));

        let mut bytes = encode_patch(2, 2, 0, 0, |_, _| Some(1));
        bytes[0..2].copy_from_slice(&500i16.to_le_bytes());
        assert!(matches!(
            Patch::parse(&bytes),
            Err(PatchError::DirectoryTruncated { .. })
        ));
    }

    #[test]
    fn rejects_column_offsets_outside_data() {
        let good = encode_patch(2, 2, 0, 0, |_, _| Some(1));

        let mut into_dir = good.clone();
        into_dir[12..16].copy_from_slice(&4u32.to_le_bytes());
        assert_eq!(
            Patch::parse(&into_dir).unwrap_err(),
            PatchError::BadColumnOffset { column: 1, offset: 4 }
        );

        let mut past_end = good.clone();
        let len = past_end.len() as u32;
        past_end[8..12].copy_from_slice(&len.to_le_bytes());
        assert!(matches!(
            Patch::parse(&past_end),
            Err(PatchError::BadColumnOffset { column: 0, .. })
        ));
    }

    #[test]
    fn truncated_column_stops_walk() {
        let data = [0u8, 10, 0, 1, 2]; // claims 10 pixels, has 2
        let posts: Vec<_> = ColumnPosts::new(&data).collect();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].pixels, &[1, 2]);
        assert_eq!(ColumnPosts::new(&[]).count(), 0);
    }
}
