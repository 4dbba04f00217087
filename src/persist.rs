use std::{fs, path::Path};

use anyhow::{bail, ensure, Context, Result};
use log::{info, warn};

use crate::color::Color;
use crate::common::{
    PAL_SIZE, PAL_SUB_AMOUNT, PAL_SUB_COLORS, REFPAL_COLOR_SIZE, REFPAL_COLORS, REFPAL_SIZE,
};
use crate::palette::{Palette, RefPalette};

pub fn write_bytes(path: &Path, data: &[u8]) -> Result<()> {
    info!("Saving {}", path.display());
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("invalid parent directory")?;
        }
    }
    fs::write(path, data)?;
    Ok(())
}

// Loads the 8bpp indexed PNG to convert, with its color table.
pub fn load_png(path: &Path) -> Result<(usize, usize, Vec<u8>, Vec<Color>)> {
    info!("Loading {}", path.display());
    let file = fs::File::open(path)
        .with_context(|| format!("Unable to open image {}", path.display()))?;
    let decoder = png::Decoder::new(file);
    let mut reader = decoder.read_info()?;
    let info = reader.info();
    ensure!(
        info.color_type == png::ColorType::Indexed,
        "Image must use an indexed color type"
    );
    ensure!(
        info.bit_depth == png::BitDepth::Eight,
        "Image must use 8 bits per pixel"
    );
    let palette = info
        .palette
        .as_ref()
        .context("Image has no color table")?
        .to_vec();
    let colors = palette
        .chunks_exact(3)
        .map(|c| Color::new(c[0], c[1], c[2]))
        .collect();
    let mut pixels = vec![0u8; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut pixels)?;
    pixels.truncate(frame.buffer_size());
    Ok((frame.width as usize, frame.height as usize, pixels, colors))
}

// Writes the remapped image back out as an indexed PNG carrying the final
// 16-color table, for previewing the conversion.
pub fn save_png(path: &Path, width: usize, height: usize, pixels: &[u8], colors: &[Color]) -> Result<()> {
    info!("Saving {}", path.display());
    let file = fs::File::create(path)
        .with_context(|| format!("Unable to create image {}", path.display()))?;
    let mut encoder = png::Encoder::new(file, width as u32, height as u32);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    let palette: Vec<u8> = colors.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
    encoder.set_palette(palette);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(pixels)?;
    Ok(())
}

// Loads the 192-byte reference palette: 64 colors of 3 bytes each. Oversized
// files are tolerated, only the first 192 bytes are read.
pub fn load_reference_palette(path: &Path) -> Result<RefPalette> {
    info!("Loading {}", path.display());
    let data = fs::read(path)
        .with_context(|| format!("Unable to open reference palette {}", path.display()))?;
    if data.len() != REFPAL_SIZE {
        warn!(
            "Reference palette is of an unexpected size ({} instead of {} bytes)",
            data.len(),
            REFPAL_SIZE
        );
    }
    if data.len() < REFPAL_SIZE {
        bail!("Reference palette is too small");
    }
    let mut palette = [Color::default(); REFPAL_COLORS];
    for (i, c) in data[..REFPAL_SIZE].chunks_exact(REFPAL_COLOR_SIZE).enumerate() {
        palette[i] = Color::new(c[0], c[1], c[2]);
    }
    Ok(palette)
}

// Loads a user-supplied PAL file: exactly 16 reference indices forming the 4
// output palettes. The palettes are used as given, all slots active.
pub fn load_user_palettes(path: &Path) -> Result<[Palette; PAL_SUB_AMOUNT]> {
    info!("Loading {}", path.display());
    let data = fs::read(path)
        .with_context(|| format!("Unable to open palette {}", path.display()))?;
    ensure!(
        data.len() == PAL_SIZE,
        "Palette is of an improper size ({} instead of {} bytes)",
        data.len(),
        PAL_SIZE
    );
    ensure!(
        data.iter().all(|&c| (c as usize) < REFPAL_COLORS),
        "Palette contains a color index outside the {}-color reference palette",
        REFPAL_COLORS
    );
    let mut palettes = [Palette::default(); PAL_SUB_AMOUNT];
    for (i, chunk) in data.chunks_exact(PAL_SUB_COLORS).enumerate() {
        palettes[i].colors.copy_from_slice(chunk);
        palettes[i].len = PAL_SUB_COLORS as u8;
    }
    Ok(palettes)
}
