//! Tick cycle: the controller that drives the diffusion simulation.
//!
//! The controller is a small state machine:
//!
//! ```text
//! Uninitialized --initialize--> Running --tick > duration--> Terminated
//!                                  |                            ^
//!                                  +--------terminate-----------+
//! ```
//!
//! Each tick that runs does the same three things:
//!
//! 1. **Advance** -- bump the clock by one.
//! 2. **Diffuse** -- run the configured number of sampled interactions,
//!    strictly in sequence, counting trait exchanges.
//! 3. **Measure** -- compute the grid metrics once on the resulting grid and
//!    append them to the recorder.
//!
//! All run state lives in [`SimulationState`]. Given the same seed the tick
//! cycle is deterministic.


use rand::Rng;
use tracing::{debug, info};

use crate::clock::{ClockError, SimulationClock};
use crate::codec::Culture;
use crate::config::SimulationConfig;
use crate::diffusion::{self, ExchangeDirection};
use crate::grid::{CultureGrid, GridError};
use crate::metrics;
use crate::recorder::{MetricSample, TimeSeriesRecorder};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The grid rejected a read or write.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },

    /// A tick was requested before [`SimulationState::initialize`].
    #[error("simulation has not been initialized")]
    NotInitialized,

    /// A tick was requested after the simulation terminated.
    #[error("simulation already terminated at tick {tick}")]
    AlreadyTerminated {
        /// Tick counter at termination.
        tick: u64,
    },
}

/// Lifecycle phase of a simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimulationPhase {
    /// Created but not yet populated.
    #[default]
    Uninitialized,
    /// Populated and accepting ticks.
    Running,
    /// Finished. No further ticks run.
    Terminated,
}

/// Parameters fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParameters {
    /// Sampled interactions per tick.
    pub interactions: u32,
    /// Fraction of cells populated at initialization.
    pub coverage: f64,
    /// Duration in ticks.
    pub duration: u64,
    /// Donor/recipient rule.
    pub direction: ExchangeDirection,
}

impl RunParameters {
    /// Extract the run parameters from a loaded configuration.
    pub const fn from_config(config: &SimulationConfig) -> Self {
        Self {
            interactions: config.diffusion.interactions,
            coverage: config.diffusion.coverage,
            duration: config.simulation.duration,
            direction: config.diffusion.direction,
        }
    }
}

impl Default for RunParameters {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Configured duration.
    pub duration: u64,
    /// Interactions sampled this tick.
    pub interactions: u32,
    /// Configured coverage.
    pub coverage: f64,
    /// Trait exchanges performed this tick (before division by width).
    pub exchanges: u64,
    /// The metrics recorded for this tick.
    pub sample: MetricSample,
}

impl TickSummary {
    /// Human-readable status block for terminal display.
    pub fn status_line(&self) -> String {
        format!(
            "Number of cultural interactions: {}\n\
             Simulation coverage: {:.0}%\n\
             Simulation tick: {}/{}\n\
             average distance between cultures: {}\n\
             number of unique cultures        : {}\n\
             number of cultural exchanges     : {}\n\
             Ctrl-c to quit simulation and save data.",
            self.interactions,
            self.coverage * 100.0,
            self.tick,
            self.duration,
            self.sample.avg_distance,
            self.sample.unique,
            self.exchanges,
        )
    }
}

/// What a call to [`run_tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A tick ran and was recorded.
    Advanced(TickSummary),
    /// The clock had passed the duration; the state is now terminated.
    Expired,
}

impl TickOutcome {
    /// The tick summary, if a tick ran.
    pub const fn summary(&self) -> Option<&TickSummary> {
        match self {
            Self::Advanced(summary) => Some(summary),
            Self::Expired => None,
        }
    }
}

/// The mutable simulation state passed through the tick cycle.
///
/// Owns the grid exclusively for the whole run.
#[derive(Debug)]
pub struct SimulationState<G> {
    /// The agent grid.
    grid: G,
    /// Fixed run parameters.
    params: RunParameters,
    /// Tick counter and duration.
    clock: SimulationClock,
    /// Per-tick metric series.
    recorder: TimeSeriesRecorder,
    /// Lifecycle phase.
    phase: SimulationPhase,
}

impl<G: CultureGrid> SimulationState<G> {
    /// Wrap a grid with run parameters. The state starts uninitialized.
    pub const fn new(grid: G, params: RunParameters) -> Self {
        Self {
            grid,
            params,
            clock: SimulationClock::new(params.duration),
            recorder: TimeSeriesRecorder::new(),
            phase: SimulationPhase::Uninitialized,
        }
    }

    /// Populate the grid and enter [`SimulationPhase::Running`].
    ///
    /// Cells are visited in row-major order. Each is populated with
    /// probability `coverage` with a uniform culture below the empty
    /// sentinel, otherwise set to [`Culture::EMPTY`].
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Grid`] if the grid rejects a write.
    pub fn initialize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), TickError> {
        let mut populated: usize = 0;
        for index in 0..self.grid.cell_count() {
            let roll: f64 = rng.random();
            let culture = if roll < self.params.coverage {
                populated = populated.saturating_add(1);
                Culture::new(rng.random_range(0..Culture::EMPTY.raw()))
            } else {
                Culture::EMPTY
            };
            self.grid.set_culture(index, culture)?;
        }
        debug!(cells = self.grid.cell_count(), populated, "Grid populated");
        self.start();
        Ok(())
    }

    /// Enter [`SimulationPhase::Running`] with the grid as it currently is.
    ///
    /// Resets the clock and clears the recorder. Useful when the grid was
    /// seeded by hand.
    pub fn start(&mut self) {
        self.clock.reset();
        self.recorder.reset();
        self.phase = SimulationPhase::Running;
    }

    /// Move to [`SimulationPhase::Terminated`]. Idempotent.
    pub fn terminate(&mut self) {
        if self.phase != SimulationPhase::Terminated {
            debug!(tick = self.clock.tick(), "Simulation terminated");
        }
        self.phase = SimulationPhase::Terminated;
    }

    /// The agent grid.
    pub const fn grid(&self) -> &G {
        &self.grid
    }

    /// The run parameters.
    pub const fn params(&self) -> &RunParameters {
        &self.params
    }

    /// The simulation clock.
    pub const fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// The recorded metric series.
    pub const fn recorder(&self) -> &TimeSeriesRecorder {
        &self.recorder
    }

    /// The lifecycle phase.
    pub const fn phase(&self) -> SimulationPhase {
        self.phase
    }
}

/// Execute one tick of the simulation.
///
/// If the clock has already passed the duration the state is terminated and
/// [`TickOutcome::Expired`] is returned without running anything.
///
/// # Errors
///
/// Returns [`TickError::NotInitialized`] or [`TickError::AlreadyTerminated`]
/// when called in the wrong phase, and propagates clock and grid errors.
pub fn run_tick<G, R>(state: &mut SimulationState<G>, rng: &mut R) -> Result<TickOutcome, TickError>
where
    G: CultureGrid,
    R: Rng + ?Sized,
{
    match state.phase {
        SimulationPhase::Uninitialized => return Err(TickError::NotInitialized),
        SimulationPhase::Terminated => {
            return Err(TickError::AlreadyTerminated {
                tick: state.clock.tick(),
            });
        }
        SimulationPhase::Running => {}
    }

    if state.clock.is_expired() {
        state.terminate();
        return Ok(TickOutcome::Expired);
    }

    // --- Advance ---
    let tick = state.clock.advance()?;

    // --- Diffuse ---
    let mut exchanges: u64 = 0;
    for _ in 0..state.params.interactions {
        let outcome = diffusion::interact(&mut state.grid, rng, state.params.direction)?;
        exchanges = exchanges.saturating_add(u64::from(outcome.exchanges));
    }
    debug!(tick, interactions = state.params.interactions, exchanges, "Diffusion batch done");

    // --- Measure ---
    let width = u64::try_from(state.grid.width()).unwrap_or(u64::MAX);
    let sample = MetricSample {
        avg_distance: metrics::grid_average_feature_distance(&state.grid, state.params.coverage),
        changes: exchanges.checked_div(width).unwrap_or(0),
        unique: u64::try_from(metrics::unique_culture_count(&state.grid)).unwrap_or(u64::MAX),
    };
    state.recorder.record(sample);

    info!(
        tick,
        duration = state.params.duration,
        avg_distance = sample.avg_distance,
        exchanges,
        unique = sample.unique,
        remaining = state.clock.remaining(),
        "Tick complete"
    );

    Ok(TickOutcome::Advanced(TickSummary {
        tick,
        duration: state.params.duration,
        interactions: state.params.interactions,
        coverage: state.params.coverage,
        exchanges,
        sample,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::grid::{LatticeGrid, Neighbourhood};

    fn params(interactions: u32, coverage: f64, duration: u64) -> RunParameters {
        RunParameters {
            interactions,
            coverage,
            duration,
            direction: ExchangeDirection::CoinFlip,
        }
    }

    fn make_state(width: usize, run: RunParameters) -> SimulationState<LatticeGrid> {
        let grid = LatticeGrid::new(width, Neighbourhood::Moore).unwrap();
        SimulationState::new(grid, run)
    }

    #[test]
    fn tick_before_initialize_is_rejected() {
        let mut state = make_state(3, params(1, 1.0, 5));
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(matches!(
            run_tick(&mut state, &mut rng),
            Err(TickError::NotInitialized)
        ));
    }

    #[test]
    fn full_coverage_populates_every_cell() {
        let mut state = make_state(4, params(0, 1.0, 5));
        let mut rng = SmallRng::seed_from_u64(2);
        state.initialize(&mut rng).unwrap();
        assert_eq!(state.phase(), SimulationPhase::Running);
        assert!(state.grid().cultures().iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn zero_coverage_leaves_grid_empty() {
        let mut state = make_state(4, params(0, 0.0, 5));
        let mut rng = SmallRng::seed_from_u64(3);
        state.initialize(&mut rng).unwrap();
        assert!(state.grid().cultures().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn coverage_above_one_saturates() {
        let mut state = make_state(4, params(0, 2.5, 5));
        let mut rng = SmallRng::seed_from_u64(4);
        state.initialize(&mut rng).unwrap();
        assert!(state.grid().cultures().iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn tick_advances_clock_and_records() {
        let mut state = make_state(5, params(20, 1.0, 10));
        let mut rng = SmallRng::seed_from_u64(5);
        state.initialize(&mut rng).unwrap();

        let summary = run_tick(&mut state, &mut rng)
            .unwrap()
            .summary()
            .copied()
            .unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(state.clock().tick(), 1);
        assert_eq!(state.recorder().len(), 1);
        assert_eq!(state.recorder().last(), Some(summary.sample));
        assert_eq!(Some(summary.sample.changes), summary.exchanges.checked_div(5));
    }

    #[test]
    fn duration_runs_inclusive_then_expires() {
        let mut state = make_state(3, params(5, 1.0, 2));
        let mut rng = SmallRng::seed_from_u64(6);
        state.initialize(&mut rng).unwrap();

        for expected in 1..=3 {
            let outcome = run_tick(&mut state, &mut rng).unwrap();
            assert!(matches!(outcome, TickOutcome::Advanced(s) if s.tick == expected));
        }
        assert_eq!(run_tick(&mut state, &mut rng).unwrap(), TickOutcome::Expired);
        assert_eq!(state.phase(), SimulationPhase::Terminated);
        assert_eq!(state.recorder().len(), 3);
        assert!(matches!(
            run_tick(&mut state, &mut rng),
            Err(TickError::AlreadyTerminated { tick: 3 })
        ));
    }

    #[test]
    fn reinitialize_clears_history() {
        let mut state = make_state(3, params(1, 1.0, 10));
        let mut rng = SmallRng::seed_from_u64(7);
        state.initialize(&mut rng).unwrap();
        let _ = run_tick(&mut state, &mut rng).unwrap();
        state.terminate();

        state.initialize(&mut rng).unwrap();
        assert_eq!(state.phase(), SimulationPhase::Running);
        assert_eq!(state.clock().tick(), 0);
        assert!(state.recorder().is_empty());
    }

    #[test]
    fn same_seed_same_series() {
        let run = |seed| {
            let mut state = make_state(6, params(50, 0.8, 4));
            let mut rng = SmallRng::seed_from_u64(seed);
            state.initialize(&mut rng).unwrap();
            while let TickOutcome::Advanced(_) = run_tick(&mut state, &mut rng).unwrap() {}
            state.recorder().rows()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn status_line_mentions_progress() {
        let summary = TickSummary {
            tick: 3,
            duration: 200,
            interactions: 100,
            coverage: 0.5,
            exchanges: 17,
            sample: MetricSample {
                avg_distance: 9,
                changes: 0,
                unique: 12,
            },
        };
        let line = summary.status_line();
        assert!(line.contains("Simulation tick: 3/200"));
        assert!(line.contains("Simulation coverage: 50%"));
        assert!(line.contains("number of cultural exchanges     : 17"));
        assert!(line.ends_with("Ctrl-c to quit simulation and save data."));
        assert_eq!(line.lines().count(), 7);
        assert!(line.lines().all(|l| !l.starts_with(' ')));
    }
}
