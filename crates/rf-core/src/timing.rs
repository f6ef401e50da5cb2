//! Wall-clock timing for report statistics.
//!
//! Report steps record how long the nonlinear solves and output writes took,
//! the way a simulator report carries solver and output-write time.

use std::time::Instant;

/// A stopwatch that can be started and stopped repeatedly and accumulates
/// the elapsed seconds of every run.
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    started: Option<Instant>,
    total_s: f64,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and start a stopwatch.
    pub fn started() -> Self {
        Self {
            started: Some(Instant::now()),
            total_s: 0.0,
        }
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stop the running segment and return its length in seconds.
    ///
    /// Stopping a stopwatch that is not running returns zero.
    pub fn stop(&mut self) -> f64 {
        match self.started.take() {
            Some(t0) => {
                let elapsed = t0.elapsed().as_secs_f64();
                self.total_s += elapsed;
                elapsed
            }
            None => 0.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Accumulated seconds over all stopped segments plus the running one.
    pub fn total_seconds(&self) -> f64 {
        let running = self
            .started
            .map(|t0| t0.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.total_s + running
    }
}
