//! Operator control state for a running simulation.
//!
//! This module provides the shared state used by the tick loop and the
//! process-level interrupt handler. The handler only ever flips the stop
//! flag; the loop observes it at the next tick boundary, flushes the
//! recorder, and returns.
//!
//! # Architecture
//!
//! The stop flag is a [`std::sync::atomic`] boolean so the state can be
//! shared through an [`Arc`](std::sync::Arc) between the simulation task
//! and the signal task without locks on the hot path. A [`Notify`] wakes
//! the loop if it is sleeping between ticks when a stop arrives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// The tick counter passed the configured duration.
    DurationElapsed,
    /// An interrupt was received before the duration elapsed.
    Interrupted,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes the tick loop out of its inter-tick sleep.
    stop_notify: Notify,

    /// Pause between ticks in milliseconds.
    tick_interval_ms: u64,

    /// Monotonic time when the operator state was created.
    started_at: Instant,
}

impl OperatorState {
    /// Create a new operator state with the given inter-tick pause.
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            tick_interval_ms,
            started_at: Instant::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean simulation stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait until a stop is requested. Returns immediately if one already was.
    pub async fn stopped(&self) {
        while !self.is_stop_requested() {
            self.stop_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Get the tick interval in milliseconds (0 = no pause).
    pub const fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Time elapsed since the operator state was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
