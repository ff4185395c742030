//! Tick callback that prints the status block to the terminal.
//!
//! The structured per-tick event is already emitted by the core through
//! `tracing`; this callback adds the human-readable view on stdout.

use std::io::{self, Write};

use culture_core::grid::CultureGrid;
use culture_core::runner::TickCallback;
use culture_core::tick::{SimulationState, TickSummary};
use tracing::debug;

/// ANSI sequence that homes the cursor and clears the screen.
const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

/// Callback that renders [`TickSummary::status_line`] after every tick.
pub struct StatusLineCallback {
    clear_screen: bool,
}

impl StatusLineCallback {
    /// Create a status printer. With `clear_screen` the terminal is cleared
    /// before each block.
    pub const fn new(clear_screen: bool) -> Self {
        Self { clear_screen }
    }

    /// Render one status block into `out`.
    fn render<W: Write>(&self, out: &mut W, summary: &TickSummary) -> io::Result<()> {
        if self.clear_screen {
            write!(out, "{CLEAR_SCREEN}")?;
        }
        writeln!(out, "\n{}", summary.status_line())?;
        out.flush()
    }
}

impl<G: CultureGrid> TickCallback<G> for StatusLineCallback {
    fn on_tick(&mut self, summary: &TickSummary, _state: &SimulationState<G>) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if let Err(error) = self.render(&mut handle, summary) {
            debug!(%error, "Status line not written");
        }
    }
}
