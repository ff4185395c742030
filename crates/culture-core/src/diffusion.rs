//! The pairwise trait-exchange rule.
//!
//! One call to [`interact`] is one sampled interaction: a random focal cell
//! is chosen, and each populated neighbour is offered a chance to exchange a
//! single trait with it. The chance falls linearly with [`culture_diff`]:
//! similar cultures talk more, and identical ones have nothing to trade.
//!
//! Draw order per neighbour is fixed (acceptance roll, slot, direction) so
//! a seeded run is reproducible.

use rand::Rng;
use serde::Deserialize;
use tracing::trace;

use crate::codec::{Culture, FEATURE_COUNT};
use crate::grid::{CultureGrid, GridError};
use crate::metrics::{MAX_CULTURE_DIFF, culture_diff};

/// How donor and recipient are chosen once an exchange is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeDirection {
    /// Fair coin: either the neighbour adopts the focal agent's trait or the
    /// focal agent adopts the neighbour's.
    #[default]
    CoinFlip,
    /// The neighbour always adopts the focal agent's trait. Matches runs
    /// produced with the legacy single-outcome draw.
    NeighbourAdopts,
}

/// Result of one sampled interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionOutcome {
    /// The sampled focal cell, or `None` if the grid has no cells.
    pub focal: Option<usize>,
    /// Number of trait exchanges performed.
    pub exchanges: u32,
}

/// Probability that two cultures at `diff` exchange a trait: `1 - diff/96`.
pub fn exchange_probability(diff: u32) -> f64 {
    1.0 - f64::from(diff) / f64::from(MAX_CULTURE_DIFF)
}

/// Run one sampled interaction against `grid`.
///
/// Picks a focal cell uniformly. Empty focal cells do nothing. Otherwise
/// each non-empty neighbour is considered in turn, re-reading the focal
/// culture each time since an earlier exchange may have changed it.
///
/// # Errors
///
/// Returns [`GridError`] if the grid rejects a write.
pub fn interact<G, R>(
    grid: &mut G,
    rng: &mut R,
    direction: ExchangeDirection,
) -> Result<InteractionOutcome, GridError>
where
    G: CultureGrid + ?Sized,
    R: Rng + ?Sized,
{
    let cells = grid.cell_count();
    if cells == 0 {
        return Ok(InteractionOutcome {
            focal: None,
            exchanges: 0,
        });
    }

    let focal = rng.random_range(0..cells);
    let mut exchanges: u32 = 0;

    if grid.culture(focal).is_none_or(Culture::is_empty) {
        return Ok(InteractionOutcome {
            focal: Some(focal),
            exchanges,
        });
    }

    for neighbour in grid.neighbours(focal) {
        let (Some(focal_culture), Some(neighbour_culture)) =
            (grid.culture(focal), grid.culture(neighbour))
        else {
            continue;
        };
        if neighbour_culture.is_empty() {
            continue;
        }

        let diff = culture_diff(focal_culture, neighbour_culture);
        let roll: f64 = rng.random();
        if roll >= exchange_probability(diff) {
            continue;
        }

        let slot = rng.random_range(0..FEATURE_COUNT);
        if diff == 0 {
            continue;
        }

        let neighbour_adopts = match direction {
            ExchangeDirection::CoinFlip => rng.random_bool(0.5),
            ExchangeDirection::NeighbourAdopts => true,
        };

        if neighbour_adopts {
            let adopted = neighbour_culture.with_trait(slot, focal_culture.trait_at(slot));
            grid.set_culture(neighbour, adopted)?;
        } else {
            let adopted = focal_culture.with_trait(slot, neighbour_culture.trait_at(slot));
            grid.set_culture(focal, adopted)?;
        }
        exchanges = exchanges.saturating_add(1);
        trace!(focal, neighbour, slot, diff, neighbour_adopts, "trait exchanged");
    }

    Ok(InteractionOutcome {
        focal: Some(focal),
        exchanges,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::grid::{LatticeGrid, Neighbourhood};
    use crate::metrics::feature_distance;

    #[test]
    fn probability_bounds() {
        assert!((exchange_probability(0) - 1.0).abs() < f64::EPSILON);
        assert!(exchange_probability(96).abs() < f64::EPSILON);
        assert!((exchange_probability(48) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn identical_cultures_never_exchange() {
        for seed in 0..200 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut grid = LatticeGrid::from_cultures(
                2,
                Neighbourhood::Moore,
                vec![Culture::new(0x12_3456); 4],
            )
            .unwrap();
            let outcome = interact(&mut grid, &mut rng, ExchangeDirection::CoinFlip).unwrap();
            assert_eq!(outcome.exchanges, 0);
            assert!(grid.cultures().iter().all(|c| c.raw() == 0x12_3456));
        }
    }

    #[test]
    fn last_slot_difference_is_not_exchanged() {
        // culture_diff ignores slot 5, so these two are "identical".
        let cultures = vec![
            Culture::new(0x02_3456),
            Culture::new(0x92_3456),
            Culture::EMPTY,
            Culture::EMPTY,
        ];
        let mut rng = SmallRng::seed_from_u64(3);
        let mut grid = LatticeGrid::from_cultures(2, Neighbourhood::Moore, cultures.clone()).unwrap();
        for _ in 0..100 {
            let outcome = interact(&mut grid, &mut rng, ExchangeDirection::CoinFlip).unwrap();
            assert_eq!(outcome.exchanges, 0);
        }
        assert_eq!(grid.cultures(), cultures.as_slice());
    }

    #[test]
    fn empty_grid_is_a_noop() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut grid = LatticeGrid::new(0, Neighbourhood::Moore).unwrap();
        let outcome = interact(&mut grid, &mut rng, ExchangeDirection::CoinFlip).unwrap();
        assert_eq!(outcome.focal, None);
        assert_eq!(outcome.exchanges, 0);
    }

    #[test]
    fn empty_focal_cells_never_change_anything() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut grid = LatticeGrid::new(3, Neighbourhood::Moore).unwrap();
        for _ in 0..50 {
            let outcome = interact(&mut grid, &mut rng, ExchangeDirection::CoinFlip).unwrap();
            assert_eq!(outcome.exchanges, 0);
        }
        assert!(grid.cultures().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn exchange_moves_cultures_closer() {
        let a = Culture::new(0x00_0000);
        let b = Culture::new(0x00_0001);
        let mut rng = SmallRng::seed_from_u64(9);
        let mut total: u32 = 0;
        for _ in 0..500 {
            let mut grid = LatticeGrid::from_cultures(
                2,
                Neighbourhood::VonNeumann,
                vec![a, b, Culture::EMPTY, Culture::EMPTY],
            )
            .unwrap();
            let outcome = interact(&mut grid, &mut rng, ExchangeDirection::CoinFlip).unwrap();
            total = total.saturating_add(outcome.exchanges);
            let x = grid.culture(0).unwrap();
            let y = grid.culture(1).unwrap();
            assert!(feature_distance(x, y) <= 1);
        }
        assert!(total > 0);
    }

    #[test]
    fn neighbour_adopts_only_writes_neighbour() {
        let focal = Culture::new(0x00_0000);
        let other = Culture::new(0x00_0001);
        let mut rng = SmallRng::seed_from_u64(21);
        for _ in 0..300 {
            let mut grid = LatticeGrid::from_cultures(
                2,
                Neighbourhood::VonNeumann,
                vec![focal, other, Culture::EMPTY, Culture::EMPTY],
            )
            .unwrap();
            let outcome =
                interact(&mut grid, &mut rng, ExchangeDirection::NeighbourAdopts).unwrap();
            if outcome.exchanges == 0 {
                continue;
            }
            // Whichever cell was focal kept its culture.
            let chosen = outcome.focal.unwrap();
            let before = if chosen == 0 { focal } else { other };
            assert_eq!(grid.culture(chosen), Some(before));
        }
    }

    #[test]
    fn exchange_can_produce_the_empty_sentinel() {
        // Slot 0 copied into the first, or slot 5 into the second, yields 0xFFFFFF.
        let a = Culture::new(0xFF_FFF0);
        let b = Culture::new(0x0F_FFFF);
        let mut rng = SmallRng::seed_from_u64(17);
        let mut collisions: u32 = 0;
        for _ in 0..500 {
            let mut grid = LatticeGrid::from_cultures(
                2,
                Neighbourhood::VonNeumann,
                vec![a, b, Culture::EMPTY, Culture::EMPTY],
            )
            .unwrap();
            interact(&mut grid, &mut rng, ExchangeDirection::CoinFlip).unwrap();
            if grid.cultures().iter().filter(|c| !c.is_empty()).count() != 1 {
                continue;
            }
            collisions = collisions.saturating_add(1);
            // The collided cell now counts as empty and never interacts again.
            for _ in 0..20 {
                let outcome = interact(&mut grid, &mut rng, ExchangeDirection::CoinFlip).unwrap();
                assert_eq!(outcome.exchanges, 0);
            }
        }
        assert!(collisions > 0);
    }
}
