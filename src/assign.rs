use anyhow::Result;
use log::{error, info};

use crate::bitmap::IndexedBitmap;
use crate::color::{self, Color};
use crate::common::{NAM_TILE, NAM_TILES, OutputIdx, PAL_SUB_AMOUNT, PAL_SUB_COLORS};
use crate::dedup::resolve_root;
use crate::histogram::TileProfile;
use crate::palette::{nearest_palette, RefPalette};
use crate::select::{OutputSet, Representative};

// Picks the output palette for one region. With a user-supplied palette set
// there are no representatives to match, so every region falls back to the
// nearest-match search over its own palette. Otherwise the region resolves to
// its representative: a selected representative maps straight to its slot,
// an unselected one falls back to nearest-match on its palette.
fn find_output_palette(
    tiles: &[TileProfile],
    representatives: &[Representative],
    output: &OutputSet,
    ref_palette: &RefPalette,
    region: usize,
    user_palette: bool,
) -> Result<Option<usize>> {
    if user_palette {
        return Ok(Some(nearest_palette(
            &tiles[region].palette,
            &output.palettes,
            ref_palette,
        )));
    }
    let root = resolve_root(tiles, region)?;
    if let Some(slot) = output.owners.iter().position(|&o| o == Some(root)) {
        return Ok(Some(slot));
    }
    let Some(representative) = representatives.iter().find(|r| r.tile == root) else {
        return Ok(None);
    };
    Ok(Some(nearest_palette(
        &representative.palette,
        &output.palettes,
        ref_palette,
    )))
}

// Maps every region to an output palette and repaints its pixels as packed
// (palette, slot) values. The remap searches all 4 slots of the assigned
// palette, unused slots included, matching the fixed-width hardware layout.
// Regions or pixels with no possible assignment are reported and skipped.
pub fn apply_output_palettes(
    bitmap: &mut IndexedBitmap,
    tiles: &[TileProfile],
    representatives: &[Representative],
    output: &OutputSet,
    ref_palette: &RefPalette,
    user_palette: bool,
) -> Result<Vec<Option<OutputIdx>>> {
    info!("Applying the final palette colors to the image...");
    info!(
        "The final set of {} palettes of {} colors each (chosen by popularity):",
        PAL_SUB_AMOUNT, PAL_SUB_COLORS
    );
    for (i, p) in output.palettes.iter().enumerate() {
        info!(
            "{:3} | palette: {:02X?}\toccurrences: {}\tie: {:.1}%",
            i,
            p.active(),
            output.popularity[i],
            output.popularity[i] as f64 / NAM_TILES as f64 * 100.0
        );
    }
    let output_colors: Vec<[Color; PAL_SUB_COLORS]> = output
        .palettes
        .iter()
        .map(|p| {
            let mut colors = [Color::default(); PAL_SUB_COLORS];
            for (j, c) in colors.iter_mut().enumerate() {
                *c = ref_palette[p.colors[j] as usize];
            }
            colors
        })
        .collect();
    let mut assignments = vec![None; NAM_TILES];
    for region in 0..NAM_TILES {
        let (x0, y0) = IndexedBitmap::region_origin(region);
        let Some(slot) = find_output_palette(
            tiles,
            representatives,
            output,
            ref_palette,
            region,
            user_palette,
        )?
        else {
            error!("Could not find palette for region at (x:{}, y:{})", x0, y0);
            continue;
        };
        assignments[region] = Some(slot as OutputIdx);
        for y in y0..y0 + NAM_TILE {
            for x in x0..x0 + NAM_TILE {
                let pixel = bitmap.pixel(x, y);
                let Some(nearest) =
                    color::nearest(ref_palette[pixel as usize], &output_colors[slot])
                else {
                    error!("Could not find color for pixel at (x:{}, y:{})", x, y);
                    continue;
                };
                bitmap.set_pixel(x, y, (slot * PAL_SUB_COLORS + nearest) as u8);
            }
        }
    }
    // The buffer now holds packed (palette, slot) values; swap in the matching
    // 16-color table.
    bitmap.colors = output
        .palettes
        .iter()
        .flat_map(|p| p.colors.iter().map(|&c| ref_palette[c as usize]))
        .collect();
    Ok(assignments)
}
