pub mod name;
pub mod raw;
pub mod source;

#[cfg(test)]
pub(crate) mod testwad;

pub use raw::{LumpInfo, WadError, WadStack, decode_records};
pub use source::{LumpId, LumpSource};
