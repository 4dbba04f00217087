use itertools::Itertools;
use log::{debug, info, warn};

use crate::bitmap::IndexedBitmap;
use crate::color::Color;
use crate::common::{
    MAX_INPUT_COLORS, NAM_TILE, NAM_TILES, PAL_COLORS, PAL_SUB_COLORS, RefIdx,
};
use crate::palette::Palette;

// One color of the image's color table together with its occurrence count.
#[derive(Copy, Clone, Default, Debug)]
pub struct ColorUse {
    pub color: Color,
    pub index: RefIdx,
    pub occurrences: u32,
}

// The colors used by one 16x16 region, plus the palette derived from them and
// the duplicate link resolved by the deduplication pass.
#[derive(Clone, Default)]
pub struct TileProfile {
    pub colors: Vec<ColorUse>,
    pub total: u8,
    pub palette: Palette,
    pub duplicate: Option<usize>,
    pub identical: bool,
}

// Canonical popularity order: descending occurrences, ties by ascending index.
pub fn sort_by_popularity(colors: &mut [ColorUse]) {
    colors.sort_by_key(|c| (std::cmp::Reverse(c.occurrences), c.index));
}

pub struct Histogram {
    pub colors: Vec<ColorUse>,
    pub total: u32,
}

impl Histogram {
    // Counts every pixel of the image into a 256-bucket histogram over the
    // current color table.
    pub fn build(bitmap: &IndexedBitmap) -> Self {
        let mut colors: Vec<ColorUse> = (0..MAX_INPUT_COLORS)
            .map(|i| ColorUse {
                color: bitmap.colors.get(i).copied().unwrap_or_default(),
                index: i as RefIdx,
                occurrences: 0,
            })
            .collect();
        for &pixel in &bitmap.pixels {
            colors[pixel as usize].occurrences += 1;
        }
        let total = colors.iter().filter(|c| c.occurrences > 0).count() as u32;
        if total as usize > PAL_COLORS {
            warn!(
                "Image has too many colors: {} (should be {} or fewer)",
                total, PAL_COLORS
            );
        } else {
            info!("Image uses {} unique colors", total);
        }
        Histogram { colors, total }
    }

    // The 16 most used colors, in popularity order. This set bounds which
    // colors the per-tile histograms will count at all.
    pub fn most_used(&self) -> Vec<ColorUse> {
        let mut ranked: Vec<ColorUse> = self
            .colors
            .iter()
            .copied()
            .filter(|c| c.occurrences > 0)
            .sorted_by_key(|c| (std::cmp::Reverse(c.occurrences), c.index))
            .collect();
        ranked.truncate(PAL_COLORS);
        ranked
    }

    pub fn log_stats(&self, pixel_total: u32) {
        info!(
            "The image's colors which will be considered (the {} most used colors):",
            PAL_COLORS
        );
        for (i, c) in self.most_used().iter().enumerate() {
            info!(
                "{:2} | {:3}(#{:02X} = ({:3},{:3},{:3})), occurrences: {}\tie: {:.1}%",
                i + 1,
                c.index,
                c.index,
                c.color.r,
                c.color.g,
                c.color.b,
                c.occurrences,
                c.occurrences as f64 / pixel_total as f64 * 100.0
            );
        }
    }
}

// Builds the per-region histograms, restricted to the globally most-used color
// set: pixels holding a reference index outside that set are not counted.
pub fn build_tile_profiles(bitmap: &IndexedBitmap, most_used: &[ColorUse]) -> Vec<TileProfile> {
    let mut tiles = Vec::with_capacity(NAM_TILES);
    for region in 0..NAM_TILES {
        let mut colors: Vec<ColorUse> = most_used
            .iter()
            .map(|c| ColorUse {
                occurrences: 0,
                ..*c
            })
            .collect();
        let (x0, y0) = IndexedBitmap::region_origin(region);
        let mut present = 0u8;
        for y in y0..y0 + NAM_TILE {
            for x in x0..x0 + NAM_TILE {
                let pixel = bitmap.pixel(x, y);
                if let Some(entry) = colors.iter_mut().find(|c| c.index == pixel) {
                    if entry.occurrences == 0 {
                        present += 1;
                    }
                    entry.occurrences += 1;
                }
            }
        }
        sort_by_popularity(&mut colors);
        if present as usize > PAL_SUB_COLORS {
            warn!(
                "Region has too many different colors ({}), at pixel (x:{}, y:{})",
                present, x0, y0
            );
            for c in colors.iter().filter(|c| c.occurrences > 0) {
                debug!(
                    " - {:3}(#{:02X}) => occurrences: {}\tie: {:.1}%",
                    c.index,
                    c.index,
                    c.occurrences,
                    c.occurrences as f64 / (NAM_TILE * NAM_TILE) as f64 * 100.0
                );
            }
        }
        tiles.push(TileProfile {
            colors,
            total: present,
            palette: Palette::default(),
            duplicate: None,
            identical: false,
        });
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{IMAGE_H, IMAGE_W};

    fn solid_bitmap(index: u8) -> IndexedBitmap {
        IndexedBitmap::new(
            IMAGE_W,
            IMAGE_H,
            vec![index; IMAGE_W * IMAGE_H],
            vec![Color::default(); 64],
        )
    }

    #[test]
    fn counts_every_pixel() {
        let histogram = Histogram::build(&solid_bitmap(7));
        assert_eq!(histogram.total, 1);
        assert_eq!(histogram.colors[7].occurrences, (IMAGE_W * IMAGE_H) as u32);
        assert_eq!(histogram.most_used().len(), 1);
        assert_eq!(histogram.most_used()[0].index, 7);
    }

    #[test]
    fn popularity_order_breaks_ties_by_index() {
        let mut colors = vec![
            ColorUse {
                index: 9,
                occurrences: 5,
                ..Default::default()
            },
            ColorUse {
                index: 3,
                occurrences: 5,
                ..Default::default()
            },
            ColorUse {
                index: 1,
                occurrences: 8,
                ..Default::default()
            },
        ];
        sort_by_popularity(&mut colors);
        let order: Vec<RefIdx> = colors.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 3, 9]);
    }

    #[test]
    fn tile_counts_ignore_colors_outside_the_most_used_set() {
        let mut bitmap = solid_bitmap(2);
        bitmap.set_pixel(0, 0, 63);
        let most_used = vec![ColorUse {
            index: 2,
            occurrences: 1,
            ..Default::default()
        }];
        let tiles = build_tile_profiles(&bitmap, &most_used);
        assert_eq!(tiles.len(), NAM_TILES);
        assert_eq!(tiles[0].total, 1);
        assert_eq!(tiles[0].colors[0].index, 2);
        assert_eq!(tiles[0].colors[0].occurrences, 255);
    }
}
