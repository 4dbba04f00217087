pub type RefIdx = u8; // Index into the 64-color reference palette
pub type SlotIdx = u8; // Index into one output palette's colors (0-3)
pub type OutputIdx = u8; // Index into the set of output palettes (0-3)

// Reference palette file: 64 colors of 3 bytes each.
pub const REFPAL_COLORS: usize = 64;
pub const REFPAL_COLOR_SIZE: usize = 3;
pub const REFPAL_SIZE: usize = REFPAL_COLORS * REFPAL_COLOR_SIZE;

// Output PAL file: 4 palettes of 4 one-byte reference indices.
pub const PAL_SUB_COLORS: usize = 4;
pub const PAL_SUB_AMOUNT: usize = 4;
pub const PAL_COLORS: usize = PAL_SUB_COLORS * PAL_SUB_AMOUNT;
pub const PAL_SIZE: usize = PAL_COLORS;

// Output CHR file: up to 256 8x8 tiles of 2bpp pixel data, two 8-byte planes each.
pub const CHR_TILE: usize = 8;
pub const CHR_TILE_SIZE: usize = 16;
pub const CHR_MAX_TILES: usize = 256;

// Output NAM file: one region-index byte per 16x16 region, then 64 attribute bytes.
pub const NAM_TILE: usize = 16;
pub const NAM_W_TILES: usize = 16;
pub const NAM_H_TILES: usize = 15;
pub const NAM_TILES: usize = NAM_W_TILES * NAM_H_TILES;
pub const NAM_ATTR_SIZE: usize = 64;
pub const NAM_SIZE: usize = NAM_TILES + NAM_ATTR_SIZE;

// Fixed target resolution of the input image.
pub const IMAGE_W: usize = NAM_W_TILES * NAM_TILE;
pub const IMAGE_H: usize = NAM_H_TILES * NAM_TILE;

// The input color table can hold at most 256 entries (8bpp indexed).
pub const MAX_INPUT_COLORS: usize = 256;

// Squared-distance threshold below which two colors are fused during reduction.
pub const MERGE_THRESHOLD: i64 = 8686;
