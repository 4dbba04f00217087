use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use png2nam::bitmap::IndexedBitmap;
use png2nam::color;
use png2nam::common::{IMAGE_H, IMAGE_W};
use png2nam::convert::Converter;
use png2nam::encode;
use png2nam::persist;

/// Converts an indexed PNG image into console-ready assets: a PAL palette
/// file, a CHR pattern bank, and a NAM file of region indices and attributes.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// The PNG file to read (8bpp indexed, ideally 256x240)
    input: PathBuf,

    /// The output filepath stem; derived from INPUT when absent, and a
    /// trailing ".nam" extension is stripped if given
    output: Option<PathBuf>,

    /// Forces the output to use the given palettes (a binary 16-byte PAL file
    /// of reference palette indices)
    #[arg(short, long)]
    palette: Option<PathBuf>,

    /// Places the given color (RRGGBB hex) as the first color of every
    /// output palette
    #[arg(short, long)]
    colorkey: Option<String>,

    /// The 192-byte reference palette file to quantize against
    #[arg(long, default_value = "gen/nes.pal")]
    refpal: PathBuf,

    /// Enables debug-level log output
    #[arg(short, long)]
    verbose: bool,
}

fn output_stem(args: &Args) -> PathBuf {
    match &args.output {
        Some(output) => {
            let s = output.to_string_lossy();
            match s.strip_suffix(".nam") {
                Some(stripped) => PathBuf::from(stripped),
                None => output.clone(),
            }
        }
        None => args.input.with_extension(""),
    }
}

// Joins an extension onto the stem without replacing anything the stem
// already ends with.
fn with_suffix(stem: &PathBuf, suffix: &str) -> PathBuf {
    let mut s = stem.clone().into_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

pub fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::builder()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    let ref_palette = persist::load_reference_palette(&args.refpal)?;
    // The colorkey is matched against the reference palette, like every other
    // color in the image.
    let colorkey = match &args.colorkey {
        Some(arg) => {
            let color = color::parse_hex(arg)?;
            Some(color::nearest_ref(color, &ref_palette).context("Reference palette is empty")?)
        }
        None => None,
    };
    let user_palettes = match &args.palette {
        Some(path) => Some(persist::load_user_palettes(path)?),
        None => None,
    };

    let (width, height, pixels, colors) = persist::load_png(&args.input)?;
    let converter = Converter {
        ref_palette,
        bitmap: IndexedBitmap::new(width, height, pixels, colors),
        colorkey,
        user_palettes,
    };
    let conversion = converter.run()?;

    let stem = output_stem(&args);
    persist::save_png(
        &with_suffix(&stem, ".png"),
        IMAGE_W,
        IMAGE_H,
        &conversion.bitmap.pixels,
        &conversion.bitmap.colors,
    )?;
    persist::write_bytes(
        &with_suffix(&stem, ".pal"),
        &encode::encode_pal(&conversion.output),
    )?;

    let blocks = encode::extract_blocks(&conversion.bitmap);
    let (patterns, refs) = encode::dedup_patterns(&blocks);
    info!("Image uses {} unique patterns", patterns.len());
    let chr: Vec<u8> = patterns.iter().flatten().copied().collect();
    persist::write_bytes(&with_suffix(&stem, ".chr"), &chr)?;

    let (combos, regions) = encode::region_combos(&refs);
    info!("Image uses {} unique region combinations", combos.len());
    let attrs = encode::encode_attributes(&conversion.assignments);
    persist::write_bytes(
        &with_suffix(&stem, ".nam"),
        &encode::encode_nam(&regions, &attrs),
    )?;
    info!("Done");
    Ok(())
}
