//! Simulation clock: the tick counter and the duration bound.
//!
//! The clock is the single source of truth for temporal state. It starts
//! at tick 0, advances once per tick with checked arithmetic, and reports
//! expiry when the tick counter is strictly greater than the configured
//! duration. The expiry check happens before a tick runs, so a duration of
//! `d` executes `d + 1` ticks.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Tick counter paired with the run's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    /// Current tick number (0 before the first tick, incremented at the
    /// start of each tick).
    tick: u64,

    /// Configured duration in ticks.
    duration: u64,
}

impl SimulationClock {
    /// Create a clock at tick 0 for a run of `duration` ticks.
    pub const fn new(duration: u64) -> Self {
        Self { tick: 0, duration }
    }

    /// Create a clock at an explicit tick.
    #[cfg(test)]
    pub const fn from_parts(tick: u64, duration: u64) -> Self {
        Self { tick, duration }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Reset the tick counter to 0.
    pub const fn reset(&mut self) {
        self.tick = 0;
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Return the configured duration.
    pub const fn duration(&self) -> u64 {
        self.duration
    }

    /// Whether the run is over: `tick > duration`.
    pub const fn is_expired(&self) -> bool {
        self.tick > self.duration
    }

    /// Ticks still to run before the clock expires.
    pub const fn remaining(&self) -> u64 {
        self.duration.saturating_add(1).saturating_sub(self.tick)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_tick_zero() {
        let clock = SimulationClock::new(200);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.duration(), 200);
        assert!(!clock.is_expired());
    }

    #[test]
    fn clock_advances() {
        let mut clock = SimulationClock::new(10);
        assert_eq!(clock.advance().unwrap(), 1);
        assert_eq!(clock.advance().unwrap(), 2);
        assert_eq!(clock.tick(), 2);
    }

    #[test]
    fn expiry_uses_strict_greater_than() {
        let mut clock = SimulationClock::new(0);
        assert!(!clock.is_expired());
        clock.advance().unwrap();
        assert!(clock.is_expired());

        let at_duration = SimulationClock::from_parts(5, 5);
        assert!(!at_duration.is_expired());
        assert_eq!(at_duration.remaining(), 1);
    }

    #[test]
    fn overflow_is_an_error() {
        let mut clock = SimulationClock::from_parts(u64::MAX, u64::MAX);
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut clock = SimulationClock::from_parts(42, 100);
        clock.reset();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.remaining(), 101);
    }
}
