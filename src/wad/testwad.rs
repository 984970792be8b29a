//! Hand-crafted in-memory archives for unit tests.

use super::name::to_name8;

/// Builds a WAD byte image: header, lump data, directory.
pub struct WadBuilder {
    magic: &'static [u8; 4],
    lumps: Vec<([u8; 8], Vec<u8>)>,
}

impl WadBuilder {
    pub fn iwad() -> Self {
        Self {
            magic: b"IWAD",
            lumps: Vec::new(),
        }
    }

    pub fn pwad() -> Self {
        Self {
            magic: b"PWAD",
            lumps: Vec::new(),
        }
    }

    pub fn lump(mut self, name: &str, data: &[u8]) -> Self {
        self.lumps.push((to_name8(name), data.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(self.magic);
        out.extend(&(self.lumps.len() as u32).to_le_bytes());
        out.extend(&0u32.to_le_bytes()); // patched below

        let mut dir: Vec<u8> = Vec::new();
        for (name, data) in &self.lumps {
            dir.extend(&(out.len() as u32).to_le_bytes());
            dir.extend(&(data.len() as u32).to_le_bytes());
            dir.extend(name);
            out.extend(data);
        }
        let dir_offset = out.len() as u32;
        out[8..12].copy_from_slice(&dir_offset.to_le_bytes());
        out.extend(dir);
        out
    }
}
