//! Configuration loading and typed config structures for the simulation.
//!
//! The canonical configuration lives in `culture-config.yaml` at the project
//! root. Every field has a default, so a missing file or a partial file is
//! fine. A handful of environment variables override the YAML values for the
//! run parameters (see [`SimulationConfig::apply_env_overrides`]).
//!
//! Values are deliberately not range-checked: a coverage outside `[0, 1]`
//! is accepted and simply saturates the sampling behaviour.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::diffusion::ExchangeDirection;
use crate::grid::Neighbourhood;

/// Environment variable overriding `diffusion.interactions`.
pub const ENV_INTERACTIONS: &str = "CULTURE_INTERACTIONS";
/// Environment variable overriding `diffusion.coverage`.
pub const ENV_COVERAGE: &str = "CULTURE_COVERAGE";
/// Environment variable overriding `simulation.duration`.
pub const ENV_DURATION: &str = "CULTURE_DURATION";
/// Environment variable overriding `grid.width`.
pub const ENV_WIDTH: &str = "CULTURE_WIDTH";
/// Environment variable overriding `simulation.seed`.
pub const ENV_SEED: &str = "CULTURE_SEED";
/// Environment variable overriding `output.dir`.
pub const ENV_OUTPUT_DIR: &str = "CULTURE_OUTPUT_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {variable}")]
    InvalidOverride {
        /// Name of the environment variable.
        variable: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `culture-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Grid shape.
    #[serde(default)]
    pub grid: GridConfig,

    /// Interaction sampling and exchange rule.
    #[serde(default)]
    pub diffusion: DiffusionConfig,

    /// Run length, seeding and pacing.
    #[serde(default)]
    pub simulation: RunConfig,

    /// Where the time series are written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging and status display.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for an unparsable override.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Override run parameters from the process environment.
    ///
    /// - `CULTURE_INTERACTIONS` -> `diffusion.interactions`
    /// - `CULTURE_COVERAGE` -> `diffusion.coverage`
    /// - `CULTURE_DURATION` -> `simulation.duration`
    /// - `CULTURE_WIDTH` -> `grid.width`
    /// - `CULTURE_SEED` -> `simulation.seed`
    /// - `CULTURE_OUTPUT_DIR` -> `output.dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if a set variable does not
    /// parse as the field's type.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override run parameters from an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if a value does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override(&lookup, ENV_INTERACTIONS)? {
            self.diffusion.interactions = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_COVERAGE)? {
            self.diffusion.coverage = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_DURATION)? {
            self.simulation.duration = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_WIDTH)? {
            self.grid.width = v;
        }
        if let Some(v) = parse_override(&lookup, ENV_SEED)? {
            self.simulation.seed = Some(v);
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output.dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Log a warning for values that are accepted but unusual.
    pub fn warn_on_unusual_values(&self) {
        if !(0.0..=1.0).contains(&self.diffusion.coverage) {
            warn!(
                coverage = self.diffusion.coverage,
                "coverage outside [0, 1]; sampling saturates"
            );
        }
        if self.grid.width == 0 {
            warn!("grid width is 0; every tick is empty");
        }
    }
}

fn parse_override<F, T>(lookup: &F, variable: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(variable)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_err| ConfigError::InvalidOverride { variable, value })
        })
        .transpose()
}

/// Grid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Side length of the square grid.
    #[serde(default = "default_width")]
    pub width: usize,

    /// Adjacency rule used for neighbour lookup.
    #[serde(default)]
    pub neighbourhood: Neighbourhood,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            neighbourhood: Neighbourhood::default(),
        }
    }
}

/// Diffusion configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiffusionConfig {
    /// Sampled interactions per tick.
    #[serde(default = "default_interactions")]
    pub interactions: u32,

    /// Fraction of cells populated at initialization. Not validated.
    #[serde(default = "default_coverage")]
    pub coverage: f64,

    /// Donor/recipient rule for accepted exchanges.
    #[serde(default)]
    pub direction: ExchangeDirection,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            interactions: default_interactions(),
            coverage: default_coverage(),
            direction: ExchangeDirection::default(),
        }
    }
}

/// Run length, seeding and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Duration in ticks. The run stops once `tick > duration`.
    #[serde(default = "default_duration")]
    pub duration: u64,

    /// Random seed for reproducibility; `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Real-time milliseconds between ticks (0 = as fast as possible).
    #[serde(default)]
    pub tick_interval_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            seed: None,
            tick_interval_ms: 0,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Directory the time-series file is written to.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Print the human-readable status block after each tick.
    #[serde(default = "default_true")]
    pub status_line: bool,

    /// Clear the terminal before each status block.
    #[serde(default)]
    pub clear_screen: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            status_line: true,
            clear_screen: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (used by serde)
// ---------------------------------------------------------------------------

const fn default_width() -> usize {
    50
}

const fn default_interactions() -> u32 {
    100
}

const fn default_coverage() -> f64 {
    1.0
}

const fn default_duration() -> u64 {
    200
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
