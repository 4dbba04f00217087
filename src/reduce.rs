use std::cmp::Reverse;

use itertools::Itertools;
use log::{debug, info};

use crate::bitmap::IndexedBitmap;
use crate::color::{self, Color};
use crate::common::{MAX_INPUT_COLORS, MERGE_THRESHOLD, NAM_TILE, PAL_COLORS, PAL_SUB_COLORS};
use crate::histogram::{sort_by_popularity, Histogram, TileProfile};
use crate::palette::RefPalette;

// Global pass: while the whole image uses more than 16 distinct colors, fuse
// pairs of perceptually similar colors, repainting the less popular one with
// the more popular. Bounded: if no pair is within the threshold, the excess is
// left for the per-tile pass and nearest-palette fallback to absorb.
pub fn reduce_global(bitmap: &mut IndexedBitmap, histogram: &Histogram, ref_palette: &RefPalette) {
    info!("Fusing together colors which are perceptually similar...");
    let mut colors: Vec<_> = histogram
        .colors
        .iter()
        .copied()
        .filter(|c| c.occurrences > 0)
        .collect();
    sort_by_popularity(&mut colors);
    let mut total = colors.len();
    if total <= PAL_COLORS {
        return;
    }
    'merge: for i in 0..colors.len() {
        if colors[i].occurrences == 0 {
            continue;
        }
        let color1 = ref_palette[colors[i].index as usize];
        for j in i + 1..colors.len() {
            if colors[j].occurrences == 0 {
                continue;
            }
            let color2 = ref_palette[colors[j].index as usize];
            if color::distance(color1, color2) <= MERGE_THRESHOLD {
                debug!(
                    "global merge | i:{:2}, color=#{:02X} | j:{:2}, color=#{:02X}",
                    i, colors[i].index, j, colors[j].index
                );
                bitmap.repaint(colors[j].index, colors[i].index);
                colors[j].occurrences = 0;
                total -= 1;
                if total <= PAL_COLORS {
                    break 'merge;
                }
            }
        }
    }
}

// Per-tile pass: first fuse similar colors within the tile's own palette, then
// repaint every remaining non-palette color to the nearest of the tile's
// palette colors. The remap works from the region's actual pixels rather than
// the top-16-scoped counts, so colors the global ranking pushed out still land
// inside the palette and every region ends with at most 4 distinct indices.
pub fn reduce_tiles(bitmap: &mut IndexedBitmap, tiles: &mut [TileProfile], ref_palette: &RefPalette) {
    info!("Removing superfluous colors for each region of the image...");
    for (region, tile) in tiles.iter_mut().enumerate() {
        if tile.total as usize > PAL_SUB_COLORS {
            let mut total = tile.total as usize;
            let len = tile.palette.len as usize;
            'merge: for i in 0..len {
                let color1 = ref_palette[tile.palette.colors[i] as usize];
                for j in i + 1..len {
                    let old = tile.palette.colors[j];
                    let color2 = ref_palette[old as usize];
                    if color::distance(color1, color2) <= MERGE_THRESHOLD {
                        debug!(
                            "region {:3} merge | i:{:2}, color=#{:02X} | j:{:2}, color=#{:02X}",
                            region, i, tile.palette.colors[i], j, old
                        );
                        bitmap.repaint_region(region, old, tile.palette.colors[i]);
                        if let Some(entry) = tile
                            .colors
                            .iter_mut()
                            .find(|c| c.index == old && c.occurrences > 0)
                        {
                            entry.occurrences = 0;
                            total -= 1;
                        }
                        if total <= PAL_SUB_COLORS {
                            break 'merge;
                        }
                    }
                }
            }
        }
        let mut counts = [0u32; MAX_INPUT_COLORS];
        let (x0, y0) = IndexedBitmap::region_origin(region);
        for y in y0..y0 + NAM_TILE {
            for x in x0..x0 + NAM_TILE {
                counts[bitmap.pixel(x, y) as usize] += 1;
            }
        }
        if tile.palette.len == 0 {
            // Region made entirely of colors outside the global top-16: its
            // palette comes from the raw counts instead, so the color cap
            // still holds.
            let ranked = (0..MAX_INPUT_COLORS)
                .filter(|&i| counts[i] > 0)
                .sorted_by_key(|&i| (Reverse(counts[i]), i));
            for index in ranked.take(PAL_SUB_COLORS) {
                tile.palette.colors[tile.palette.len as usize] = index as u8;
                tile.palette.len += 1;
            }
            if tile.palette.len == 0 {
                continue;
            }
        }
        let palette_colors: Vec<Color> = tile
            .palette
            .active()
            .iter()
            .map(|&c| ref_palette[c as usize])
            .collect();
        for i in 0..MAX_INPUT_COLORS {
            let index = i as u8;
            if counts[i] == 0 || tile.palette.contains(index) {
                continue;
            }
            let Some(nearest) = color::nearest(ref_palette[index as usize], &palette_colors)
            else {
                continue;
            };
            let new = tile.palette.colors[nearest];
            debug!(
                "region {:3} remap | old:#{:02X}, new:#{:02X}",
                region, index, new
            );
            bitmap.repaint_region(region, index, new);
            if let Some(entry) = tile.colors.iter_mut().find(|c| c.index == index) {
                entry.occurrences = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{IMAGE_H, IMAGE_W, NAM_TILE, NAM_TILES, REFPAL_COLORS};
    use crate::histogram::build_tile_profiles;
    use crate::palette::Palette;

    // 27 colors on a 96-unit lattice: no pair is within the merge threshold.
    fn lattice_refpal() -> RefPalette {
        let mut pal = [Color::default(); REFPAL_COLORS];
        for (i, c) in pal.iter_mut().enumerate().take(27) {
            *c = Color::new(
                ((i % 3) * 96) as u8,
                ((i / 3 % 3) * 96) as u8,
                ((i / 9) * 96) as u8,
            );
        }
        pal
    }

    // A reference palette where consecutive indices are well separated.
    fn spread_refpal() -> RefPalette {
        let mut pal = [Color::default(); REFPAL_COLORS];
        for (i, c) in pal.iter_mut().enumerate() {
            *c = Color::new((i as u8).wrapping_mul(61), i as u8, 255 - i as u8);
        }
        pal
    }

    fn refpal_with_close_pair() -> RefPalette {
        let mut pal = spread_refpal();
        // Indices 20 and 21 are nearly identical.
        pal[20] = Color::new(100, 100, 100);
        pal[21] = Color::new(101, 100, 100);
        pal
    }

    #[test]
    fn global_pass_keeps_popular_color_of_a_close_pair() {
        let ref_palette = refpal_with_close_pair();
        // 17 distinct colors: one over budget, so the close pair must fuse.
        let mut pixels = vec![0u8; IMAGE_W * IMAGE_H];
        for (i, p) in pixels.iter_mut().enumerate().take(14) {
            *p = (i + 1) as u8;
        }
        pixels[100] = 21;
        for p in pixels.iter_mut().skip(200).take(50) {
            *p = 20;
        }
        let mut bitmap =
            IndexedBitmap::new(IMAGE_W, IMAGE_H, pixels, ref_palette.to_vec());
        let histogram = Histogram::build(&bitmap);
        assert_eq!(histogram.total, 17);
        reduce_global(&mut bitmap, &histogram, &ref_palette);
        // Color 21 (1 pixel) repainted to color 20 (50 pixels).
        assert_eq!(bitmap.pixels[100], 20);
        assert_eq!(Histogram::build(&bitmap).total, 16);
    }

    #[test]
    fn global_pass_is_a_no_op_within_budget() {
        let ref_palette = refpal_with_close_pair();
        let mut pixels = vec![20u8; IMAGE_W * IMAGE_H];
        pixels[0] = 21;
        let mut bitmap =
            IndexedBitmap::new(IMAGE_W, IMAGE_H, pixels, ref_palette.to_vec());
        let histogram = Histogram::build(&bitmap);
        reduce_global(&mut bitmap, &histogram, &ref_palette);
        assert_eq!(bitmap.pixels[0], 21);
    }

    #[test]
    fn tile_pass_leaves_at_most_four_counted_colors_per_region() {
        let ref_palette = spread_refpal();
        // Region 0 uses 6 well-separated colors; the rest of the image uses one.
        let mut pixels = vec![0u8; IMAGE_W * IMAGE_H];
        for y in 0..NAM_TILE {
            for x in 0..NAM_TILE {
                pixels[y * IMAGE_W + x] = ((x + y) % 6) as u8 + 1;
            }
        }
        let mut bitmap =
            IndexedBitmap::new(IMAGE_W, IMAGE_H, pixels, ref_palette.to_vec());
        let histogram = Histogram::build(&bitmap);
        let most_used = histogram.most_used();
        let mut tiles = build_tile_profiles(&bitmap, &most_used);
        for tile in tiles.iter_mut() {
            tile.palette = Palette::most_used(&tile.colors);
        }
        assert_eq!(tiles[0].total, 6);
        reduce_tiles(&mut bitmap, &mut tiles, &ref_palette);
        let rebuilt = build_tile_profiles(&bitmap, &Histogram::build(&bitmap).most_used());
        for tile in &rebuilt {
            assert!(tile.total as usize <= PAL_SUB_COLORS);
        }
        // The surviving colors are exactly the region's old palette colors.
        for c in rebuilt[0].colors.iter().filter(|c| c.occurrences > 0) {
            assert!(tiles[0].palette.contains(c.index));
        }
    }

    #[test]
    fn tile_pass_bounds_colors_missing_from_the_global_ranking() {
        let ref_palette = lattice_refpal();
        // 16 dominant colors fill regions 1..240 and push region 0's five
        // colors out of the global top-16 entirely, so none of the fusion
        // passes can see them through the scoped counts.
        let mut pixels = vec![0u8; IMAGE_W * IMAGE_H];
        for region in 1..NAM_TILES {
            let (x0, y0) = IndexedBitmap::region_origin(region);
            for y in y0..y0 + NAM_TILE {
                for x in x0..x0 + NAM_TILE {
                    pixels[y * IMAGE_W + x] = ((region - 1) % 16) as u8;
                }
            }
        }
        for y in 0..NAM_TILE {
            for x in 0..NAM_TILE {
                pixels[y * IMAGE_W + x] = ((x + y) % 5) as u8 + 16;
            }
        }
        let mut bitmap = IndexedBitmap::new(IMAGE_W, IMAGE_H, pixels, ref_palette.to_vec());
        let histogram = Histogram::build(&bitmap);
        assert_eq!(histogram.total, 21);
        reduce_global(&mut bitmap, &histogram, &ref_palette);
        let most_used = Histogram::build(&bitmap).most_used();
        assert!(most_used.iter().all(|c| c.index < 16));
        let mut tiles = build_tile_profiles(&bitmap, &most_used);
        for tile in tiles.iter_mut() {
            tile.palette = Palette::most_used(&tile.colors);
        }
        assert_eq!(tiles[0].total, 0);
        reduce_tiles(&mut bitmap, &mut tiles, &ref_palette);
        for region in 0..NAM_TILES {
            let (x0, y0) = IndexedBitmap::region_origin(region);
            let mut seen = [false; 256];
            for y in y0..y0 + NAM_TILE {
                for x in x0..x0 + NAM_TILE {
                    seen[bitmap.pixel(x, y) as usize] = true;
                }
            }
            assert!(seen.iter().filter(|&&s| s).count() <= PAL_SUB_COLORS);
        }
        // Region 0's surviving colors come from its own pixels, not from the
        // dominant set.
        for y in 0..NAM_TILE {
            for x in 0..NAM_TILE {
                assert!((16..21).contains(&bitmap.pixel(x, y)));
            }
        }
    }
}
