//! texview - composite one wall texture and show it tiled in a window.
//!
//! ```bash
//! cargo run --release -- assets/doom.wad mywad.wad --texture BIGDOOR2
//! cargo run --release -- assets/doom.wad --texture MIDGRATE --sparse
//! cargo run --release -- assets/doom.wad --list
//! ```
//!
//! The view starts one column left of the texture so the wrap from column
//! `-1` is visible.  Controls  ←/→ pan · P purge cache · Esc quit

use anyhow::{Context, bail};
use clap::Parser;
use minifb::{Key, Window, WindowOptions};
use std::path::PathBuf;

use yadoom_tex::{
    texture::{TextureId, TextureSet},
    wad::WadStack,
};

/// Colour behind transparent pixels in sparse mode.
const BACKDROP: u32 = 0x0000_FFFF;

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    /// IWAD first, then PWADs in load order
    #[arg(required = true, value_name = "WAD")]
    wads: Vec<PathBuf>,

    /// Texture to show
    #[arg(long, short, default_value = "STARTAN3")]
    texture: String,

    /// Draw the post-encoded columns instead of the dense ones
    #[arg(long)]
    sparse: bool,

    /// Integer zoom
    #[arg(long, default_value_t = 3)]
    scale: usize,

    /// Horizontal repeats of the texture
    #[arg(long, default_value_t = 2)]
    tiles: usize,

    /// Print every texture name with its size and exit
    #[arg(long)]
    list: bool,
}

// ─── palette ────────────────────────────────────────────────────────────────
fn load_palette(wads: &WadStack) -> anyhow::Result<[u32; 256]> {
    let lump = wads.lump_bytes(wads.find_lump("PLAYPAL").context("PLAYPAL lump not found")?)?;
    if lump.len() < 768 {
        bail!("PLAYPAL is only {} bytes", lump.len());
    }
    let mut pal = [0u32; 256];
    for (i, rgb) in lump.chunks_exact(3).take(256).enumerate() {
        pal[i] = (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32;
    }
    Ok(pal)
}

// ─── drawing ────────────────────────────────────────────────────────────────
/// One screen column of texture column `col`, `height × scale` pixels.
fn draw_column(
    set: &TextureSet,
    id: TextureId,
    col: i32,
    sparse: bool,
    pal: &[u32; 256],
    out: &mut [u32],
) {
    let scale = out.len() / set.height(id).max(1);
    if sparse {
        out.fill(BACKDROP);
        for post in set.sparse_posts(id, col) {
            for (dy, &p) in post.pixels.iter().enumerate() {
                let y = post.top as usize + dy;
                if let Some(px) = out.get_mut(y * scale..(y + 1) * scale) {
                    px.fill(pal[p as usize]);
                }
            }
        }
    } else {
        for (y, &p) in set.dense_column(id, col).iter().enumerate() {
            out[y * scale..(y + 1) * scale].fill(pal[p as usize]);
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts = Opts::parse();

    // ─────────── load archives & textures ───────
    let wads = WadStack::from_files(opts.wads.as_slice())?;
    let mut set = TextureSet::load(&wads)?;

    if opts.list {
        for (i, t) in set.templates().iter().enumerate() {
            println!("{i:5}  {:8}  {}x{}  {} patch(es)", t.name(), t.width, t.height, t.patches.len());
        }
        println!("{:?}", set.report());
        return Ok(());
    }

    let id = set
        .id(&opts.texture)
        .with_context(|| format!("texture {} not found", opts.texture))?;
    let (tw, th) = (set.width(id), set.height(id));
    if tw == 0 || th == 0 {
        bail!("texture {} is empty ({tw}x{th})", opts.texture);
    }
    let pal = load_palette(&wads)?;

    let scale = opts.scale.max(1);
    let cols = tw * opts.tiles.max(1) + 1;
    let (w, h) = (cols * scale, th * scale);

    let title = format!("{} {}x{}", set.texture_name(id), tw, th);
    let mut win = Window::new(&title, w, h, WindowOptions::default())?;
    win.set_target_fps(35);

    // column-major scratch, transposed into the frame each redraw
    let mut column = vec![0u32; h];
    let mut frame = vec![0u32; w * h];
    let mut pan: i32 = -1;
    let mut dirty = true;

    while win.is_open() && !win.is_key_down(Key::Escape) {
        if win.is_key_down(Key::Left) {
            pan -= 1;
            dirty = true;
        }
        if win.is_key_down(Key::Right) {
            pan += 1;
            dirty = true;
        }
        if win.is_key_down(Key::P) {
            let freed = set.purge_cache();
            log::info!("purged {freed} bytes");
            dirty = true;
        }

        if dirty {
            for c in 0..cols {
                draw_column(&set, id, pan + c as i32, opts.sparse, &pal, &mut column);
                for (y, &px) in column.iter().enumerate() {
                    frame[y * w + c * scale..y * w + (c + 1) * scale].fill(px);
                }
            }
            dirty = false;
        }
        win.update_with_buffer(&frame, w, h)?;
    }
    Ok(())
}
