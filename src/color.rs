use anyhow::{ensure, Result};

use crate::common::RefIdx;

#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub fn from_rgb24(value: u32) -> Self {
        Color {
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
        }
    }

    // Brightness score used for ordering colors within a palette.
    pub fn sum(&self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }
}

// Sum of squared channel differences. Symmetric, and zero only for equal colors.
pub fn distance(a: Color, b: Color) -> i64 {
    let dr = a.r as i64 - b.r as i64;
    let dg = a.g as i64 - b.g as i64;
    let db = a.b as i64 - b.b as i64;
    dr * dr + dg * dg + db * db
}

// Index of the candidate nearest to `target`; distance ties go to the lowest index.
pub fn nearest(target: Color, candidates: &[Color]) -> Option<usize> {
    let mut best: Option<(i64, usize)> = None;
    for (i, &c) in candidates.iter().enumerate() {
        let d = distance(target, c);
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, i));
        }
    }
    best.map(|(_, i)| i)
}

pub fn nearest_ref(target: Color, ref_palette: &[Color]) -> Option<RefIdx> {
    nearest(target, ref_palette).map(|i| i as RefIdx)
}

// Parses a colorkey argument given as an RRGGBB hex string (a leading '#' is allowed).
pub fn parse_hex(arg: &str) -> Result<Color> {
    let arg = arg.strip_prefix('#').unwrap_or(arg);
    ensure!(arg.len() == 6, "expected an RRGGBB hex color, got {:?}", arg);
    let value = u32::from_str_radix(arg, 16)?;
    Ok(Color::from_rgb24(value))
}
