//! Simulation loop runner with operator controls.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives the tick loop with support for:
//!
//! - **Bounded simulation**: stop once the clock passes the duration
//! - **Paced ticks**: optional pause between ticks, cut short by a stop
//! - **Clean shutdown**: on interrupt or completion the recorder is flushed
//!   exactly once before returning
//!
//! The runner wraps the single-tick [`run_tick`] function and adds the
//! control plane around it. It never exits the process; the caller decides
//! what to do with the returned [`SimulationResult`].
//!
//! [`run_tick`]: crate::tick::run_tick

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};

use crate::grid::CultureGrid;
use crate::operator::{OperatorState, SimulationEndReason};
use crate::recorder::{RecorderError, log_file_name};
use crate::tick::{self, SimulationState, TickError, TickOutcome, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },

    /// The recorded series could not be written.
    #[error("recorder error: {source}")]
    Recorder {
        /// The underlying recorder error.
        #[from]
        source: RecorderError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// Total number of ticks executed.
    pub total_ticks: u64,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Where the time series were written.
    pub output_path: PathBuf,
}

/// Callback invoked after each tick completes.
///
/// Implementations can use this to render status, collect extra
/// statistics, etc. The callback receives the tick summary and the current
/// simulation state.
pub trait TickCallback<G>: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState<G>);
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl<G> TickCallback<G> for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState<G>) {}
}

/// Run the simulation loop until the duration elapses or a stop is
/// requested, then flush the recorder into `output_dir`.
///
/// The state must already be initialized.
///
/// # Arguments
///
/// * `state` - Initialized simulation state (grid, parameters, clock)
/// * `rng` - Source of randomness for the diffusion step
/// * `operator` - Shared operator control state
/// * `callback` - Called after each tick
/// * `output_dir` - Directory that receives the time-series file
///
/// # Errors
///
/// Returns [`RunnerError::Tick`] if a tick fails and
/// [`RunnerError::Recorder`] if the final flush fails. The ticks recorded
/// before a failing tick are still flushed.
pub async fn run_simulation<G, R>(
    state: &mut SimulationState<G>,
    rng: &mut R,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback<G>,
    output_dir: &Path,
) -> Result<SimulationResult, RunnerError>
where
    G: CultureGrid,
    R: Rng + ?Sized,
{
    let mut final_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        width = state.grid().width(),
        interactions = state.params().interactions,
        coverage = state.params().coverage,
        duration = state.params().duration,
        tick_interval_ms = operator.tick_interval_ms(),
        "Simulation starting"
    );

    let outcome: Result<SimulationEndReason, TickError> = loop {
        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!(tick = state.clock().tick(), "Stop requested");
            break Ok(SimulationEndReason::Interrupted);
        }

        // --- Execute tick ---
        let summary = match tick::run_tick(state, rng) {
            Ok(TickOutcome::Advanced(summary)) => summary,
            Ok(TickOutcome::Expired) => {
                info!(
                    tick = state.clock().tick(),
                    duration = state.params().duration,
                    "Duration elapsed"
                );
                break Ok(SimulationEndReason::DurationElapsed);
            }
            Err(source) => {
                error!(
                    tick = state.clock().tick(),
                    error = %source,
                    "Tick failed, saving recorded ticks"
                );
                break Err(source);
            }
        };
        total_ticks = total_ticks.saturating_add(1);

        // --- Notify callback ---
        callback.on_tick(&summary, state);
        final_summary = Some(summary);

        // --- Pace ---
        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_millis(interval_ms)) => {}
                () = operator.stopped() => {}
            }
        } else {
            tokio::task::yield_now().await;
        }
    };

    // --- Flush (every exit path) ---
    state.terminate();
    let file_name = log_file_name(
        state.params().interactions,
        state.grid().width(),
        state.params().coverage,
    );
    let flushed = state.recorder().flush_to(output_dir, &file_name);

    let end_reason = match outcome {
        Ok(reason) => reason,
        Err(source) => {
            if let Err(ref flush_error) = flushed {
                error!(error = %flush_error, "Recorded ticks could not be saved");
            }
            return Err(RunnerError::Tick { source });
        }
    };
    let output_path = flushed?;

    Ok(SimulationResult {
        end_reason,
        total_ticks,
        final_summary,
        output_path,
    })
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        output = %result.output_path.display(),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            avg_distance = summary.sample.avg_distance,
            unique = summary.sample.unique,
            exchanges = summary.exchanges,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}
