use anyhow::{bail, Result};
use log::{info, warn};

use crate::assign::apply_output_palettes;
use crate::bitmap::IndexedBitmap;
use crate::color;
use crate::common::{IMAGE_H, IMAGE_W, OutputIdx, PAL_SUB_AMOUNT, RefIdx};
use crate::dedup::{compress_links, find_duplicates};
use crate::histogram::{build_tile_profiles, Histogram, TileProfile};
use crate::palette::{Palette, RefPalette};
use crate::reduce::{reduce_global, reduce_tiles};
use crate::select::{rank_representatives, select_output, OutputSet};

pub struct Converter {
    pub ref_palette: RefPalette,
    pub bitmap: IndexedBitmap,
    pub colorkey: Option<RefIdx>,
    pub user_palettes: Option<[Palette; PAL_SUB_AMOUNT]>,
}

// The remapped image plus the palette data needed to serialize it.
pub struct Conversion {
    pub bitmap: IndexedBitmap,
    pub output: OutputSet,
    pub assignments: Vec<Option<OutputIdx>>,
}

impl Converter {
    // Rewrites every pixel as an index into the reference palette, replacing
    // the image's own color table. Ties go to the lowest reference index.
    fn apply_ref_palette(&mut self) -> Result<()> {
        info!("Converting the image's colors to the reference palette...");
        if self.bitmap.colors.is_empty() {
            bail!("Image has no color table");
        }
        let mut table = Vec::with_capacity(self.bitmap.colors.len());
        for &color in &self.bitmap.colors {
            match color::nearest_ref(color, &self.ref_palette) {
                Some(index) => table.push(index),
                None => bail!("Reference palette is empty"),
            }
        }
        for pixel in self.bitmap.pixels.iter_mut() {
            match table.get(*pixel as usize) {
                Some(&index) => *pixel = index,
                None => bail!("Pixel references color {} outside the color table", pixel),
            }
        }
        self.bitmap.colors = self.ref_palette.to_vec();
        Ok(())
    }

    // Rebuilds the global histogram and the per-region profiles, deriving each
    // region's minimal palette from its most popular colors.
    fn profile(&self) -> (Histogram, Vec<TileProfile>) {
        let histogram = Histogram::build(&self.bitmap);
        let most_used = histogram.most_used();
        let mut tiles = build_tile_profiles(&self.bitmap, &most_used);
        for tile in tiles.iter_mut() {
            tile.palette = Palette::most_used(&tile.colors);
        }
        (histogram, tiles)
    }

    pub fn run(mut self) -> Result<Conversion> {
        self.bitmap.crop_to_target();
        self.apply_ref_palette()?;

        let histogram = Histogram::build(&self.bitmap);
        histogram.log_stats((IMAGE_W * IMAGE_H) as u32);
        // An early profiling pass, so over-budget regions are reported against
        // the unreduced image.
        build_tile_profiles(&self.bitmap, &histogram.most_used());

        info!("Reducing the image's colors to the most used ones...");
        reduce_global(&mut self.bitmap, &histogram, &self.ref_palette);

        let (_, mut tiles) = self.profile();
        info!("Reducing each region's colors to its own palette...");
        reduce_tiles(&mut self.bitmap, &mut tiles, &self.ref_palette);

        let (histogram, mut tiles) = self.profile();
        histogram.log_stats((IMAGE_W * IMAGE_H) as u32);

        let (output, representatives) = if let Some(palettes) = self.user_palettes {
            if self.colorkey.is_some() {
                warn!("Ignoring the colorkey: the supplied palettes are used as given");
            }
            (OutputSet::from_user(palettes), Vec::new())
        } else {
            find_duplicates(&mut tiles);
            compress_links(&mut tiles)?;
            let mut representatives = rank_representatives(&tiles)?;
            let output = select_output(&mut representatives, &self.ref_palette, self.colorkey);
            (output, representatives)
        };

        let assignments = apply_output_palettes(
            &mut self.bitmap,
            &tiles,
            &representatives,
            &output,
            &self.ref_palette,
            self.user_palettes.is_some(),
        )?;

        Ok(Conversion {
            bitmap: self.bitmap,
            output,
            assignments,
        })
    }
}
