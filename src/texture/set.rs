// Runtime texture set: every template of a level set, its column layout and
// the lazily composited column caches the rasterizer samples from.
// The renderer talks to this through `TextureId` only.

use std::cell::Cell;

use once_cell::unsync::OnceCell;

use super::{
    bank::PatchBank,
    composite::{self, Composite},
    diag::{Diagnostics, LoadReport},
    discover::find_table_lumps,
    hash::NameIndex,
    lookup::ColumnDirectory,
    maptex::{TextureTemplate, merge_textures},
    patch::ColumnPosts,
    pnames::PatchLookup,
};
use crate::wad::{LumpSource, WadError};

/// Runtime handle for a texture.
///
/// Equal to the template's position in load order, stable for the lifetime
/// of the set.
pub type TextureId = u16;

/// Id 0 doubles as "no texture" in map data.
pub const NO_TEXTURE: TextureId = 0;

/// Things that stop a texture load.  Everything else is tolerated and
/// counted in [`LoadReport`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Wad(#[from] WadError),

    #[error("required lump {0} not found")]
    MissingLump(&'static str),

    #[error("{0} textures do not fit a 16-bit texture id")]
    TooManyTextures(usize),
}

/// Largest power of two not above `width`, minus one.
fn width_mask(width: usize) -> usize {
    let mut j = 1;
    while j * 2 <= width {
        j <<= 1;
    }
    j - 1
}

/// All textures of a loaded archive stack.
///
/// Templates, column directories and the name index are built once by
/// [`TextureSet::load`] and never change.  Composites are built on first
/// access, may be dropped with [`TextureSet::purge_cache`] and are rebuilt
/// transparently.
///
/// **Thread-safety:** the caches use unsynchronised cells, so the set is
/// `!Sync`; keep it on the render thread.
///
/// Accessors taking a [`TextureId`] panic when the id is not below
/// [`len`](Self::len).  Ids from [`id`](Self::id) are always valid.
#[derive(Debug)]
pub struct TextureSet {
    templates: Vec<TextureTemplate>,
    directories: Vec<ColumnDirectory>,
    width_masks: Vec<usize>,
    composites: Vec<OnceCell<Composite>>,
    builds: Vec<Cell<u32>>,
    names: NameIndex,
    bank: PatchBank,
    report: LoadReport,
    overflow_warned: Cell<bool>,
}

impl TextureSet {
    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    /// Merge every PNAMES / TEXTURE1 / TEXTURE2 lump of `source` and lay out
    /// all column directories.  No pixels are composited yet.
    pub fn load<S: LumpSource + ?Sized>(source: &S) -> Result<Self, LoadError> {
        let tables = find_table_lumps(source)?;
        let mut diag = Diagnostics::default();

        let lookup = PatchLookup::build(source, &tables.pnames, &mut diag)?;
        let mut bank = PatchBank::new();
        let templates = merge_textures(source, &tables.textures, &lookup, &mut bank, &mut diag)?;

        for &lump in tables.pnames.iter().chain(&tables.textures) {
            source.release(lump);
        }

        if templates.len() > usize::from(TextureId::MAX) + 1 {
            return Err(LoadError::TooManyTextures(templates.len()));
        }

        let directories: Vec<ColumnDirectory> = templates
            .iter()
            .map(|t| ColumnDirectory::build(t, &bank, &mut diag))
            .collect();
        let width_masks = templates.iter().map(|t| width_mask(t.width)).collect();
        let names = NameIndex::build(templates.iter().map(|t| &t.name));

        let report = diag.into_report();
        log::info!(
            "textures: {} from {} TEXTURE lump(s), {} patch names ({} unique patches)",
            templates.len(),
            tables.textures.len(),
            lookup.len(),
            bank.len() - 1
        );
        if !report.is_clean() {
            log::info!("textures: load tolerated defects: {report:?}");
        }

        Ok(Self {
            composites: templates.iter().map(|_| OnceCell::new()).collect(),
            builds: templates.iter().map(|_| Cell::new(0)).collect(),
            templates,
            directories,
            width_masks,
            names,
            bank,
            report,
            overflow_warned: Cell::new(false),
        })
    }

    // ---------------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn width(&self, id: TextureId) -> usize {
        self.templates[id as usize].width
    }

    pub fn height(&self, id: TextureId) -> usize {
        self.templates[id as usize].height
    }

    /// Mask used by [`dense_column`](Self::dense_column) when the width is a
    /// power of two.
    pub fn width_mask(&self, id: TextureId) -> usize {
        self.width_masks[id as usize]
    }

    pub fn texture_name(&self, id: TextureId) -> &str {
        self.templates[id as usize].name()
    }

    pub fn template(&self, id: TextureId) -> &TextureTemplate {
        &self.templates[id as usize]
    }

    pub fn templates(&self) -> &[TextureTemplate] {
        &self.templates
    }

    pub fn directory(&self, id: TextureId) -> &ColumnDirectory {
        &self.directories[id as usize]
    }

    /// Patch images the templates refer to.
    pub fn patches(&self) -> &PatchBank {
        &self.bank
    }

    /// What the load had to tolerate.
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Look a texture up by name (case-insensitive, eight characters).
    /// On duplicate names the first loaded texture wins; names starting
    /// with `-` give [`NO_TEXTURE`].
    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.names.find(name)
    }

    /// Fallback-safe query: unknown names are logged and resolve to
    /// [`NO_TEXTURE`].
    pub fn id_or_missing(&self, name: &str) -> TextureId {
        self.id(name).unwrap_or_else(|| {
            log::warn!("texture {name} not found");
            NO_TEXTURE
        })
    }

    // ---------------------------------------------------------------------
    // Column access
    // ---------------------------------------------------------------------

    /// The `height` opaque bytes of column `col`, wrapped into the texture
    /// width.  Empty for zero-width textures.
    pub fn dense_column(&self, id: TextureId, col: i32) -> &[u8] {
        let i = id as usize;
        let (width, height) = (self.templates[i].width, self.templates[i].height);
        if width == 0 {
            return &[];
        }
        let mask = self.width_masks[i];
        let x = if mask + 1 == width {
            col as usize & mask
        } else {
            col.rem_euclid(width as i32) as usize
        };
        let ofs = self.directories[i].dense_offset(x);
        &self.composite(id).dense()[ofs..ofs + height]
    }

    /// Post-encoded column `col`, starting at its first post header.
    /// Empty for zero-width textures.
    pub fn sparse_column(&self, id: TextureId, col: i32) -> &[u8] {
        let i = id as usize;
        let width = self.templates[i].width;
        if width == 0 {
            return &[];
        }
        let x = col.rem_euclid(width as i32) as usize;
        &self.composite(id).sparse()[self.directories[i].sparse_range(x)]
    }

    /// Posts of [`sparse_column`](Self::sparse_column) with absolute tops.
    pub fn sparse_posts(&self, id: TextureId, col: i32) -> ColumnPosts<'_> {
        ColumnPosts::new(self.sparse_column(id, col))
    }

    // ---------------------------------------------------------------------
    // Composite cache
    // ---------------------------------------------------------------------

    /// Both cached buffers of `id`, compositing on first use.
    pub fn composite(&self, id: TextureId) -> &Composite {
        let i = id as usize;
        self.composites[i].get_or_init(|| self.build_composite(i))
    }

    fn build_composite(&self, i: usize) -> Composite {
        let tex = &self.templates[i];
        let out = composite::generate(tex, &self.directories[i], &self.bank);

        if out.truncated_columns > 0 {
            let msg = format!(
                "texture {}: {} column(s) overflowed their slot",
                tex.name(),
                out.truncated_columns
            );
            if self.overflow_warned.replace(true) {
                log::debug!("{msg}");
            } else {
                log::warn!("{msg}");
            }
        }

        self.builds[i].set(self.builds[i].get() + 1);
        log::debug!(
            "composited {} ({}x{}): {} bytes",
            tex.name(),
            tex.width,
            tex.height,
            out.composite.size()
        );
        out.composite
    }

    /// Composite `ids` now so first-frame rendering does not pay for it.
    pub fn precache<I: IntoIterator<Item = TextureId>>(&self, ids: I) {
        for id in ids {
            self.composite(id);
        }
    }

    pub fn precache_all(&self) {
        for i in 0..self.templates.len() {
            self.composite(i as TextureId);
        }
    }

    pub fn is_composited(&self, id: TextureId) -> bool {
        self.composites[id as usize].get().is_some()
    }

    /// Times `id` has been composited since load.
    pub fn composite_count(&self, id: TextureId) -> u32 {
        self.builds[id as usize].get()
    }

    /// Bytes currently held by composites.
    pub fn cached_bytes(&self) -> usize {
        self.composites
            .iter()
            .filter_map(OnceCell::get)
            .map(Composite::size)
            .sum()
    }

    /// Drop every purgable composite; returns the bytes reclaimed.
    pub fn purge_cache(&mut self) -> usize {
        let mut freed = 0;
        for cell in &mut self.composites {
            if cell.get().is_some_and(Composite::is_purgable) {
                freed += cell.take().map_or(0, |c| c.size());
            }
        }
        log::debug!("texture cache purge: {freed} bytes");
        freed
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
