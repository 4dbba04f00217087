use log::{info, warn};

use crate::color::Color;
use crate::common::{IMAGE_H, IMAGE_W, NAM_TILE, NAM_W_TILES};

// An 8bpp indexed image: a buffer of color-table indices plus its color table.
// After the reference-mapping stage the indices are reference-palette indices.
pub struct IndexedBitmap {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
    pub colors: Vec<Color>,
}

impl IndexedBitmap {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>, colors: Vec<Color>) -> Self {
        assert_eq!(pixels.len(), width * height);
        IndexedBitmap {
            width,
            height,
            pixels,
            colors,
        }
    }

    // Forces the image to the fixed 256x240 target resolution: larger inputs are
    // cropped to their top-left corner, smaller ones padded with index 0.
    pub fn crop_to_target(&mut self) {
        if self.width == IMAGE_W && self.height == IMAGE_H {
            info!("Image has the correct dimensions ({}x{})", IMAGE_W, IMAGE_H);
            return;
        }
        warn!(
            "Image has improper dimensions ({}x{}), only the top-left-most {}x{} pixels will be considered",
            self.width, self.height, IMAGE_W, IMAGE_H
        );
        let mut cropped = vec![0u8; IMAGE_W * IMAGE_H];
        for y in 0..IMAGE_H.min(self.height) {
            for x in 0..IMAGE_W.min(self.width) {
                cropped[y * IMAGE_W + x] = self.pixels[y * self.width + x];
            }
        }
        self.width = IMAGE_W;
        self.height = IMAGE_H;
        self.pixels = cropped;
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, value: u8) {
        self.pixels[y * self.width + x] = value;
    }

    // Top-left pixel coordinate of a 16x16 region, given its index in the 16x15 grid.
    pub fn region_origin(region: usize) -> (usize, usize) {
        let tx = region % NAM_W_TILES;
        let ty = region / NAM_W_TILES;
        (tx * NAM_TILE, ty * NAM_TILE)
    }

    // Replaces `old` with `new` across the whole image.
    pub fn repaint(&mut self, old: u8, new: u8) {
        for p in self.pixels.iter_mut() {
            if *p == old {
                *p = new;
            }
        }
    }

    // Replaces `old` with `new` within one 16x16 region only.
    pub fn repaint_region(&mut self, region: usize, old: u8, new: u8) {
        let (x0, y0) = Self::region_origin(region);
        for y in y0..y0 + NAM_TILE {
            for x in x0..x0 + NAM_TILE {
                if self.pixel(x, y) == old {
                    self.set_pixel(x, y, new);
                }
            }
        }
    }
}
