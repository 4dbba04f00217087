use std::cmp::Reverse;

use anyhow::Result;
use itertools::Itertools;
use log::info;

use crate::common::{NAM_TILE, NAM_TILES, PAL_SUB_AMOUNT, RefIdx};
use crate::dedup::resolve_root;
use crate::histogram::TileProfile;
use crate::palette::{Palette, RefPalette};

// One representative palette: the tile that owns it, and how many regions
// resolve to it through their duplicate links.
#[derive(Clone, Debug)]
pub struct Representative {
    pub tile: usize,
    pub palette: Palette,
    pub popularity: u32,
}

// The final set of at most 4 output palettes. `owners` records which
// representative tile each selected palette came from (None for unfilled
// slots and for user-supplied palettes).
#[derive(Default)]
pub struct OutputSet {
    pub palettes: [Palette; PAL_SUB_AMOUNT],
    pub owners: [Option<usize>; PAL_SUB_AMOUNT],
    pub popularity: [u32; PAL_SUB_AMOUNT],
}

impl OutputSet {
    pub fn from_user(palettes: [Palette; PAL_SUB_AMOUNT]) -> Self {
        OutputSet {
            palettes,
            owners: [None; PAL_SUB_AMOUNT],
            popularity: [0; PAL_SUB_AMOUNT],
        }
    }
}

// Aggregates each region's popularity onto its representative and ranks the
// representatives by popularity, ties by ascending owner-tile index.
pub fn rank_representatives(tiles: &[TileProfile]) -> Result<Vec<Representative>> {
    let mut popularity = vec![0u32; tiles.len()];
    for i in 0..tiles.len() {
        popularity[resolve_root(tiles, i)?] += 1;
    }
    let ranked = tiles
        .iter()
        .enumerate()
        .filter(|(_, t)| t.duplicate.is_none())
        .map(|(i, t)| Representative {
            tile: i,
            palette: t.palette,
            popularity: popularity[i],
        })
        .sorted_by_key(|r| (Reverse(r.popularity), r.tile))
        .collect();
    Ok(ranked)
}

// Orders every representative's colors by brightness, applies the colorkey,
// and keeps the 4 most popular as the output set. The colorkey runs over the
// whole ranked list so nearest-match fallback targets carry it too.
pub fn select_output(
    representatives: &mut [Representative],
    ref_palette: &RefPalette,
    colorkey: Option<RefIdx>,
) -> OutputSet {
    for r in representatives.iter_mut() {
        r.palette.sort_by_brightness(ref_palette);
    }
    info!(
        "The image, broken up into {}x{}-pixel regions, uses, at minimum, {} palettes:",
        NAM_TILE,
        NAM_TILE,
        representatives.len()
    );
    for (i, r) in representatives.iter().enumerate() {
        info!(
            "{:3} | palette: {:02X?}\toccurrences: {}\tie: {:.1}%",
            i,
            r.palette.active(),
            r.popularity,
            r.popularity as f64 / NAM_TILES as f64 * 100.0
        );
    }
    if let Some(key) = colorkey {
        for r in representatives.iter_mut() {
            r.palette.insert_colorkey(key, ref_palette);
        }
    }
    let mut output = OutputSet::default();
    for (i, r) in representatives.iter().take(PAL_SUB_AMOUNT).enumerate() {
        output.palettes[i] = r.palette;
        output.owners[i] = Some(r.tile);
        output.popularity[i] = r.popularity;
    }
    output
}
