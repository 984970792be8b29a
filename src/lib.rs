pub mod texture;
pub mod wad;
pub mod zone;

pub use texture::{LoadError, TextureId, TextureSet};
pub use wad::{LumpSource, WadError, WadStack};
