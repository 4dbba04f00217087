use log::warn;

use crate::bitmap::IndexedBitmap;
use crate::common::{
    CHR_MAX_TILES, CHR_TILE, CHR_TILE_SIZE, NAM_ATTR_SIZE, NAM_SIZE, NAM_TILES, NAM_W_TILES,
    OutputIdx, PAL_SIZE,
};
use crate::select::OutputSet;

// An 8x8 block of 2-bit pixel values, the unit of CHR pattern data.
pub type Pattern = [[u8; CHR_TILE]; CHR_TILE];

pub fn encode_pal(output: &OutputSet) -> [u8; PAL_SIZE] {
    let mut data = [0u8; PAL_SIZE];
    for (i, palette) in output.palettes.iter().enumerate() {
        for (j, &color) in palette.colors.iter().enumerate() {
            data[i * palette.colors.len() + j] = color;
        }
    }
    data
}

// Packs a pattern into the planar 2bpp format: 8 bytes of low bits followed
// by 8 bytes of high bits, one byte per row, leftmost pixel in bit 7.
pub fn encode_chr_tile(pattern: &Pattern) -> [u8; CHR_TILE_SIZE] {
    let mut data = [0u8; CHR_TILE_SIZE];
    for y in 0..CHR_TILE {
        for x in 0..CHR_TILE {
            let slot = pattern[y][x] & 3;
            data[y] |= (slot & 1) << (7 - x);
            data[CHR_TILE + y] |= (slot >> 1) << (7 - x);
        }
    }
    data
}

#[cfg(test)]
pub fn decode_chr_tile(data: &[u8; CHR_TILE_SIZE]) -> Pattern {
    let mut pattern = [[0u8; CHR_TILE]; CHR_TILE];
    for y in 0..CHR_TILE {
        for x in 0..CHR_TILE {
            let low = (data[y] >> (7 - x)) & 1;
            let high = (data[CHR_TILE + y] >> (7 - x)) & 1;
            pattern[y][x] = high << 1 | low;
        }
    }
    pattern
}

// Cuts the remapped image into its grid of 8x8 blocks, row-major. Only the
// low 2 bits of each pixel matter here: the block's palette half is carried
// by the attribute table instead.
pub fn extract_blocks(bitmap: &IndexedBitmap) -> Vec<Pattern> {
    let blocks_w = bitmap.width / CHR_TILE;
    let blocks_h = bitmap.height / CHR_TILE;
    let mut blocks = Vec::with_capacity(blocks_w * blocks_h);
    for by in 0..blocks_h {
        for bx in 0..blocks_w {
            let mut pattern = [[0u8; CHR_TILE]; CHR_TILE];
            for y in 0..CHR_TILE {
                for x in 0..CHR_TILE {
                    pattern[y][x] = bitmap.pixel(bx * CHR_TILE + x, by * CHR_TILE + y) & 3;
                }
            }
            blocks.push(pattern);
        }
    }
    blocks
}

// Deduplicates blocks into a first-seen-ordered pattern table, returning the
// table plus each block's pattern reference. The CHR bank holds 256 patterns;
// overflowing blocks keep the image intact but all reference pattern 0.
pub fn dedup_patterns(blocks: &[Pattern]) -> (Vec<[u8; CHR_TILE_SIZE]>, Vec<u16>) {
    let mut patterns: Vec<[u8; CHR_TILE_SIZE]> = Vec::new();
    let mut refs = Vec::with_capacity(blocks.len());
    let mut overflowed = 0usize;
    for block in blocks {
        let encoded = encode_chr_tile(block);
        match patterns.iter().position(|p| *p == encoded) {
            Some(i) => refs.push(i as u16),
            None if patterns.len() < CHR_MAX_TILES => {
                refs.push(patterns.len() as u16);
                patterns.push(encoded);
            }
            None => {
                overflowed += 1;
                refs.push(0);
            }
        }
    }
    if overflowed > 0 {
        warn!(
            "Image needs more than {} unique patterns; {} blocks were replaced with pattern 0",
            CHR_MAX_TILES, overflowed
        );
    }
    (patterns, refs)
}

// Assigns every 16x16 region an index identifying its combination of four
// pattern references (top-left, top-right, bottom-left, bottom-right), again
// deduplicated in first-seen order. The combination table itself is produced
// for downstream tooling and is not part of the NAM file.
pub fn region_combos(pattern_refs: &[u16]) -> (Vec<[u16; 4]>, [u8; NAM_TILES]) {
    let blocks_w = NAM_W_TILES * 2;
    let mut combos: Vec<[u16; 4]> = Vec::new();
    let mut regions = [0u8; NAM_TILES];
    for (region, slot) in regions.iter_mut().enumerate() {
        let bx = (region % NAM_W_TILES) * 2;
        let by = (region / NAM_W_TILES) * 2;
        let combo = [
            pattern_refs[by * blocks_w + bx],
            pattern_refs[by * blocks_w + bx + 1],
            pattern_refs[(by + 1) * blocks_w + bx],
            pattern_refs[(by + 1) * blocks_w + bx + 1],
        ];
        let index = match combos.iter().position(|c| *c == combo) {
            Some(i) => i,
            None => {
                combos.push(combo);
                combos.len() - 1
            }
        };
        // The grid holds 240 regions, so first-seen indices always fit a byte.
        *slot = index as u8;
    }
    (combos, regions)
}

// Packs the per-region palette assignments into the 64-byte attribute table.
// Each attribute byte covers a 2x2 group of regions, two bits per quadrant in
// the order top-left, top-right, bottom-left, bottom-right. The region grid is
// 15 rows tall, so the bottom half of the last attribute row stays zero, as do
// quadrants whose region received no palette.
pub fn encode_attributes(assignments: &[Option<OutputIdx>]) -> [u8; NAM_ATTR_SIZE] {
    let mut attrs = [0u8; NAM_ATTR_SIZE];
    for (i, attr) in attrs.iter_mut().enumerate() {
        let bx = (i % 8) * 2;
        let by = (i / 8) * 2;
        for dy in 0..2 {
            for dx in 0..2 {
                let (rx, ry) = (bx + dx, by + dy);
                if rx >= NAM_W_TILES || ry >= NAM_TILES / NAM_W_TILES {
                    continue;
                }
                let palette = assignments[ry * NAM_W_TILES + rx].unwrap_or(0) & 3;
                *attr |= palette << ((dy * 2 + dx) * 2);
            }
        }
    }
    attrs
}

pub fn encode_nam(regions: &[u8; NAM_TILES], attrs: &[u8; NAM_ATTR_SIZE]) -> Vec<u8> {
    let mut data = Vec::with_capacity(NAM_SIZE);
    data.extend_from_slice(regions);
    data.extend_from_slice(attrs);
    data
}
