//! Distance and diversity metrics over cultures and the whole grid.
//!
//! Two pairwise distances exist and they are intentionally different:
//!
//! - [`culture_diff`] sums trait magnitudes over the first
//!   `FEATURE_COUNT - 1` slots and drives the exchange probability.
//! - [`feature_distance`] counts mismatching slots over all
//!   `FEATURE_COUNT` slots and feeds the grid-wide average metric.
//!
//! The last slot never contributes to the exchange probability even though
//! it can be exchanged.

use std::collections::HashSet;

use crate::codec::{Culture, FEATURE_COUNT};
use crate::grid::CultureGrid;

/// Number of slots compared by [`culture_diff`].
pub const DIFF_SLOTS: usize = FEATURE_COUNT - 1;

/// Normaliser that maps a [`culture_diff`] onto `[0, 1]`.
pub const MAX_CULTURE_DIFF: u32 = 96;

/// Absolute difference of the traits at `slot`. Range `[0, 15]`.
pub fn trait_distance(a: Culture, b: Culture, slot: usize) -> u8 {
    a.trait_at(slot).abs_diff(b.trait_at(slot))
}

/// Sum of [`trait_distance`] over slots `0..DIFF_SLOTS`.
pub fn culture_diff(a: Culture, b: Culture) -> u32 {
    (0..DIFF_SLOTS)
        .map(|slot| u32::from(trait_distance(a, b, slot)))
        .sum()
}

/// Number of slots, out of all [`FEATURE_COUNT`], where `a` and `b` differ.
pub fn feature_distance(a: Culture, b: Culture) -> u32 {
    let matching = (0..FEATURE_COUNT)
        .filter(|&slot| a.trait_at(slot) == b.trait_at(slot))
        .count();
    // At most FEATURE_COUNT, so both conversions are exact.
    let matching = u32::try_from(matching).unwrap_or(0);
    u32::try_from(FEATURE_COUNT)
        .unwrap_or(0)
        .saturating_sub(matching)
}

/// Grid-wide average feature distance.
///
/// For every cell, sums [`feature_distance`] to each neighbour whose culture
/// is not [`Culture::EMPTY`]. The total is integer-divided by the grid width,
/// scaled by `coverage` and truncated. Returns 0 when there are no
/// qualifying pairs or the grid has zero width; a negative coverage also
/// yields 0.
pub fn grid_average_feature_distance<G: CultureGrid + ?Sized>(grid: &G, coverage: f64) -> u64 {
    let mut total: u64 = 0;
    for index in 0..grid.cell_count() {
        let Some(culture) = grid.culture(index) else {
            continue;
        };
        for neighbour in grid.neighbours(index) {
            match grid.culture(neighbour) {
                Some(other) if !other.is_empty() => {
                    total = total.saturating_add(u64::from(feature_distance(culture, other)));
                }
                _ => {}
            }
        }
    }

    let width = u64::try_from(grid.width()).unwrap_or(u64::MAX);
    let per_width = total.checked_div(width).unwrap_or(0);
    // Float-to-int `as` truncates toward zero and saturates, which is the
    // intended rounding here.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let scaled = (per_width as f64 * coverage) as u64;
    scaled
}

/// Number of distinct culture values on the grid, sentinel included.
pub fn unique_culture_count<G: CultureGrid + ?Sized>(grid: &G) -> usize {
    (0..grid.cell_count())
        .filter_map(|index| grid.culture(index))
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::grid::{LatticeGrid, Neighbourhood};

    fn random_culture(rng: &mut SmallRng) -> Culture {
        Culture::new(rng.random_range(0..=0xFF_FFFF))
    }

    #[test]
    fn trait_distance_per_slot() {
        let a = Culture::new(0x00_00F0);
        let b = Culture::new(0x00_0030);
        assert_eq!(trait_distance(a, b, 1), 12);
        assert_eq!(trait_distance(a, b, 0), 0);
    }

    #[test]
    fn culture_diff_skips_last_slot() {
        let a = Culture::new(0x00_0000);
        let b = Culture::new(0xF0_0000);
        assert_eq!(culture_diff(a, b), 0);
        assert_eq!(feature_distance(a, b), 1);
    }

    #[test]
    fn culture_diff_maximum() {
        let a = Culture::new(0x00_0000);
        let b = Culture::new(0x0F_FFFF);
        assert_eq!(culture_diff(a, b), 75);
    }

    #[test]
    fn distances_are_symmetric_and_zero_on_identity() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let a = random_culture(&mut rng);
            let b = random_culture(&mut rng);
            for slot in 0..FEATURE_COUNT {
                assert_eq!(trait_distance(a, b, slot), trait_distance(b, a, slot));
            }
            assert_eq!(culture_diff(a, b), culture_diff(b, a));
            assert_eq!(feature_distance(a, b), feature_distance(b, a));
            assert!(culture_diff(a, b) <= MAX_CULTURE_DIFF);
            assert!(feature_distance(a, b) <= 6);
            assert_eq!(culture_diff(a, a), 0);
            assert_eq!(feature_distance(a, a), 0);
        }
    }

    #[test]
    fn average_distance_of_uniform_grid_is_zero() {
        let grid =
            LatticeGrid::from_cultures(3, Neighbourhood::Moore, vec![Culture::new(0x12_3456); 9])
                .unwrap();
        assert_eq!(grid_average_feature_distance(&grid, 1.0), 0);
    }

    #[test]
    fn average_distance_ignores_empty_neighbours() {
        let grid = LatticeGrid::new(3, Neighbourhood::Moore).unwrap();
        assert_eq!(grid_average_feature_distance(&grid, 1.0), 0);
    }

    #[test]
    fn average_distance_two_cells() {
        // Cells 0 and 1 see each other: 6 + 6.
        let cultures = vec![
            Culture::new(0x00_0000),
            Culture::new(0x11_1111),
            Culture::EMPTY,
            Culture::EMPTY,
        ];
        let grid = LatticeGrid::from_cultures(2, Neighbourhood::Moore, cultures).unwrap();
        // Empty cells still count their populated neighbours: 2 * (6 + 6).
        // Total 36, divided by width 2.
        assert_eq!(grid_average_feature_distance(&grid, 1.0), 18);
        assert_eq!(grid_average_feature_distance(&grid, 0.5), 9);
        assert_eq!(grid_average_feature_distance(&grid, -1.0), 0);
    }

    #[test]
    fn unique_count_includes_sentinel() {
        let cultures = vec![
            Culture::new(1),
            Culture::new(1),
            Culture::new(2),
            Culture::EMPTY,
        ];
        let grid = LatticeGrid::from_cultures(2, Neighbourhood::Moore, cultures).unwrap();
        assert_eq!(unique_culture_count(&grid), 3);
    }
}
