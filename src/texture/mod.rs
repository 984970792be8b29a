//! Wall textures: PNAMES / TEXTUREx merging, column layout and the
//! composited column caches sampled by the rasterizer.

pub mod bank;
pub mod composite;
pub mod diag;
pub mod discover;
pub mod hash;
pub mod lookup;
pub mod maptex;
pub mod patch;
pub mod pnames;
pub mod set;

#[cfg(test)]
mod testutil;

pub use bank::{PLACEHOLDER, PatchBank, PatchId};
pub use composite::Composite;
pub use diag::LoadReport;
pub use lookup::{ColumnDirectory, ColumnEntry};
pub use maptex::{TextureFlags, TexturePatch, TextureTemplate};
pub use patch::{ColumnPosts, Patch, PatchError, Post};
pub use set::{LoadError, NO_TEXTURE, TextureId, TextureSet};
