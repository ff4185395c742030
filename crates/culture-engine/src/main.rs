//! Engine binary for the cultural diffusion simulation.
//!
//! This is the main entry point that wires together configuration, the
//! lattice grid, the tick loop, and the interrupt handler. It runs the
//! simulation until the duration elapses or Ctrl-C is pressed, flushes the
//! recorded time series, and maps the outcome to a process exit code.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `culture-config.yaml` (or `CULTURE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the grid and seed the random source
//! 4. Populate the grid
//! 5. Install the interrupt handler
//! 6. Run the simulation loop
//! 7. Log the result
//!
//! Completion and interrupt both exit with status 0; any fatal error exits
//! with status 1.

mod error;
mod status;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use culture_core::config::SimulationConfig;
use culture_core::grid::LatticeGrid;
use culture_core::operator::OperatorState;
use culture_core::runner::{self, NoOpCallback, TickCallback};
use culture_core::tick::{RunParameters, SimulationState};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::status::StatusLineCallback;

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "CULTURE_CONFIG";

/// Configuration file used when `CULTURE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "culture-config.yaml";

/// Application entry point for the engine.
#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load configuration. Logging is not up yet, so the outcome is
    //    reported after the subscriber is installed.
    let config_path = config_path();
    let loaded = load_config(&config_path);

    // 2. Initialize structured logging.
    let level = loaded
        .as_ref()
        .map_or("info", |config| config.logging.level.as_str());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(true)
        .init();

    info!("culture-engine starting");

    let result = match loaded {
        Ok(config) => run(&config, &config_path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "culture-engine failed");
            ExitCode::FAILURE
        }
    }
}

/// Steps 3 to 7 of the startup sequence.
async fn run(config: &SimulationConfig, config_path: &Path) -> Result<(), EngineError> {
    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        path = %config_path.display(),
        width = config.grid.width,
        neighbourhood = ?config.grid.neighbourhood,
        interactions = config.diffusion.interactions,
        coverage = config.diffusion.coverage,
        direction = ?config.diffusion.direction,
        duration = config.simulation.duration,
        seed = ?config.simulation.seed,
        "Configuration loaded"
    );
    config.warn_on_unusual_values();

    // 3. Build the grid and seed the random source.
    let grid = LatticeGrid::new(config.grid.width, config.grid.neighbourhood)?;
    let mut rng = match config.simulation.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    // 4. Populate the grid.
    let mut sim_state = SimulationState::new(grid, RunParameters::from_config(config));
    sim_state.initialize(&mut rng)?;
    info!(cells = config.grid.width.saturating_mul(config.grid.width), "Grid initialized");

    // 5. Install the interrupt handler.
    let operator = Arc::new(OperatorState::new(config.simulation.tick_interval_ms));
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping at next tick boundary");
                    operator.request_stop();
                }
                Err(e) => warn!(error = %e, "Interrupt handler unavailable"),
            }
        });
    }

    // 6. Run the simulation.
    let mut callback: Box<dyn TickCallback<LatticeGrid>> = if config.logging.status_line {
        Box::new(StatusLineCallback::new(config.logging.clear_screen))
    } else {
        Box::new(NoOpCallback)
    };

    let result = runner::run_simulation(
        &mut sim_state,
        &mut rng,
        &operator,
        callback.as_mut(),
        &config.output.dir,
    )
    .await?;

    // 7. Log results.
    runner::log_simulation_end(&result);
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        elapsed_ms = u64::try_from(operator.elapsed().as_millis()).unwrap_or(u64::MAX),
        "culture-engine shutdown complete"
    );

    Ok(())
}

/// Resolve the configuration path from `CULTURE_CONFIG` or the default.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load the simulation configuration.
///
/// A missing file is not an error: defaults are used, and the environment
/// overrides still apply.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }
}
