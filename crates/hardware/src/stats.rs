//! Simulation statistics: cycle/retirement/stall counters and a summary
//! printer used by the `vulsim-cli run` subcommand.

/// Cumulative simulation counters.
#[derive(Default, Debug, Clone, Copy)]
pub struct Stats {
    /// Total ticks executed.
    pub cycles: u64,
    /// Instructions retired at WB.
    pub instret: u64,
    /// Ticks where a stage stalled on a structural (scoreboard) hazard.
    pub stalls: u64,
    /// Pipeline flushes triggered by a taken branch/jump or exception.
    pub flushes: u64,
    /// Traps (exceptions) serviced.
    pub traps: u64,
}

impl Stats {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Instructions-per-cycle, `0.0` before any cycle has elapsed.
    #[must_use]
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.instret as f64 / self.cycles as f64
        }
    }

    /// Prints a one-screen run summary.
    pub fn print(&self) {
        println!("cycles   = {}", self.cycles);
        println!("instret  = {}", self.instret);
        println!("ipc      = {:.3}", self.ipc());
        println!("stalls   = {}", self.stalls);
        println!("flushes  = {}", self.flushes);
        println!("traps    = {}", self.traps);
    }
}
