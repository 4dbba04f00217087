use std::cmp::Reverse;

use crate::color::{self, Color};
use crate::common::{PAL_SUB_COLORS, RefIdx, REFPAL_COLORS};
use crate::histogram::ColorUse;

pub type RefPalette = [Color; REFPAL_COLORS];

// One output palette: up to 4 reference-palette indices. Unused slots hold 0
// and are excluded from containment checks but not from pixel remapping,
// matching the fixed-width layout of the hardware palette.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct Palette {
    pub colors: [RefIdx; PAL_SUB_COLORS],
    pub len: u8,
}

impl Palette {
    // The tile's initial palette: its most popular colors, at most 4. `colors`
    // must already be in popularity order.
    pub fn most_used(colors: &[ColorUse]) -> Self {
        let mut palette = Palette::default();
        for c in colors.iter().take(PAL_SUB_COLORS) {
            if c.occurrences == 0 {
                break;
            }
            palette.colors[palette.len as usize] = c.index;
            palette.len += 1;
        }
        palette
    }

    pub fn active(&self) -> &[RefIdx] {
        &self.colors[..self.len as usize]
    }

    pub fn find(&self, color: RefIdx) -> Option<usize> {
        self.active().iter().position(|&c| c == color)
    }

    pub fn contains(&self, color: RefIdx) -> bool {
        self.find(color).is_some()
    }

    pub fn contains_all(&self, target: &Palette) -> bool {
        target.active().iter().all(|&c| self.contains(c))
    }

    // Reorders the active colors by descending brightness, ties by ascending index.
    pub fn sort_by_brightness(&mut self, ref_palette: &RefPalette) {
        let len = self.len as usize;
        self.colors[..len].sort_by_key(|&c| (Reverse(ref_palette[c as usize].sum()), c));
    }

    // Forces `key` into slot 0. If the key is already present it is swapped in
    // and the remainder re-sorted by brightness; otherwise the colors shift
    // right and a full palette's 4th color is discarded.
    pub fn insert_colorkey(&mut self, key: RefIdx, ref_palette: &RefPalette) {
        if self.len > 0 && self.colors[0] == key {
            return;
        }
        match self.find(key) {
            Some(at) => {
                self.colors.swap(0, at);
                let len = self.len as usize;
                self.colors[1..len].sort_by_key(|&c| (Reverse(ref_palette[c as usize].sum()), c));
            }
            None => {
                for j in (1..PAL_SUB_COLORS).rev() {
                    self.colors[j] = self.colors[j - 1];
                }
                self.colors[0] = key;
                self.len = (self.len + 1).min(PAL_SUB_COLORS as u8);
            }
        }
    }

    // The smallest distance from `target` to any active color of this palette.
    fn smallest_difference(&self, target: RefIdx, ref_palette: &RefPalette) -> i64 {
        self.active()
            .iter()
            .map(|&c| color::distance(ref_palette[target as usize], ref_palette[c as usize]))
            .min()
            .unwrap_or(i64::MAX)
    }
}

// Index of the candidate palette best covering `target`: each candidate is
// scored by summing, over the target colors it lacks, the smallest distance to
// any of its own colors. Score ties go to the lowest candidate index.
pub fn nearest_palette(target: &Palette, candidates: &[Palette], ref_palette: &RefPalette) -> usize {
    let mut best = 0;
    let mut best_score = i64::MAX;
    for (i, candidate) in candidates.iter().enumerate() {
        let mut score: i64 = 0;
        for &c in target.active() {
            if !candidate.contains(c) {
                score = score.saturating_add(candidate.smallest_difference(c, ref_palette));
            }
        }
        if score < best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_refpal() -> RefPalette {
        let mut pal = [Color::default(); REFPAL_COLORS];
        for (i, c) in pal.iter_mut().enumerate() {
            *c = Color::new(i as u8 * 4, i as u8 * 4, i as u8 * 4);
        }
        pal
    }

    fn palette_of(colors: &[RefIdx]) -> Palette {
        let mut palette = Palette::default();
        for &c in colors {
            palette.colors[palette.len as usize] = c;
            palette.len += 1;
        }
        palette
    }

    #[test]
    fn most_used_stops_at_first_unused_color() {
        let colors = [
            ColorUse {
                index: 4,
                occurrences: 10,
                ..Default::default()
            },
            ColorUse {
                index: 9,
                occurrences: 3,
                ..Default::default()
            },
            ColorUse {
                index: 2,
                occurrences: 0,
                ..Default::default()
            },
        ];
        let palette = Palette::most_used(&colors);
        assert_eq!(palette.len, 2);
        assert_eq!(palette.active(), &[4, 9]);
    }

    #[test]
    fn containment_is_reflexive_and_ignores_unused_slots() {
        let a = palette_of(&[1, 2, 3]);
        let b = palette_of(&[2, 1]);
        assert!(a.contains_all(&a));
        assert!(a.contains_all(&b));
        assert!(!b.contains_all(&a));
        // Slot 3 of `a` holds 0 but is inactive.
        assert!(!a.contains(0));
    }

    #[test]
    fn brightness_sort_is_descending() {
        let ref_palette = test_refpal();
        let mut palette = palette_of(&[1, 8, 3]);
        palette.sort_by_brightness(&ref_palette);
        assert_eq!(palette.active(), &[8, 3, 1]);
    }

    #[test]
    fn colorkey_swap_keeps_all_colors() {
        let ref_palette = test_refpal();
        let mut palette = palette_of(&[9, 5, 2, 7]);
        palette.insert_colorkey(2, &ref_palette);
        assert_eq!(palette.colors[0], 2);
        // Remainder re-sorted by brightness, descending.
        assert_eq!(palette.colors, [2, 9, 7, 5]);
        assert_eq!(palette.len, 4);
    }

    #[test]
    fn colorkey_insert_discards_the_fourth_color_of_a_full_palette() {
        let ref_palette = test_refpal();
        let mut palette = palette_of(&[9, 7, 5, 3]);
        palette.insert_colorkey(20, &ref_palette);
        assert_eq!(palette.colors, [20, 9, 7, 5]);
        assert_eq!(palette.len, 4);
        assert!(!palette.contains(3));
    }

    #[test]
    fn colorkey_insert_grows_a_short_palette() {
        let ref_palette = test_refpal();
        let mut palette = palette_of(&[9, 7]);
        palette.insert_colorkey(20, &ref_palette);
        assert_eq!(palette.active(), &[20, 9, 7]);
        assert_eq!(palette.len, 3);
    }

    #[test]
    fn nearest_palette_prefers_full_coverage() {
        let ref_palette = test_refpal();
        let target = palette_of(&[1, 2]);
        let candidates = [
            palette_of(&[10, 11, 12, 13]),
            palette_of(&[1, 2, 30, 31]),
            palette_of(&[1, 2]),
        ];
        // Both candidates 1 and 2 cover the target with score 0; lowest index wins.
        assert_eq!(nearest_palette(&target, &candidates, &ref_palette), 1);
    }
}
