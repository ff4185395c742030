//! Trait codec, metrics, diffusion rule, and tick orchestration for the
//! cultural diffusion simulation.
//!
//! Agents sit on a square grid and each holds a culture: six 4-bit traits
//! packed into one integer. Every tick a number of random agents are
//! sampled, and each one may copy a single trait to or from its neighbours
//! with a probability that grows with how similar they already are.
//!
//! # Modules
//!
//! - [`codec`] -- Bit packing of traits into a [`Culture`] value.
//! - [`metrics`] -- Pairwise distances and grid-wide diversity metrics.
//! - [`grid`] -- The [`CultureGrid`] interface and a square lattice adapter.
//! - [`diffusion`] -- One sampled interaction of the exchange rule.
//! - [`clock`] -- Tick counter and duration bound.
//! - [`recorder`] -- Per-tick metric series and their CSV output.
//! - [`config`] -- Configuration loading from `culture-config.yaml`.
//! - [`tick`] -- The simulation state machine and single-tick cycle.
//! - [`operator`] -- Shared stop flag and pacing for the run loop.
//! - [`runner`] -- The async run loop with clean shutdown.
//!
//! [`Culture`]: codec::Culture
//! [`CultureGrid`]: grid::CultureGrid

pub mod clock;
pub mod codec;
pub mod config;
pub mod diffusion;
pub mod grid;
pub mod metrics;
pub mod operator;
pub mod recorder;
pub mod runner;
pub mod tick;
