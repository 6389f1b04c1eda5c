//! Step statistics
//!
//! Tracks how many generations ran and how long each took, for the overlay and
//! periodic log lines.

use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct StepStats {
    pub step_count: u64,
    pub time_accumulator: Duration,
    pub last_step_time: Duration,
}

impl StepStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed generation and how long the kernel took
    pub fn record_step(&mut self, elapsed: Duration) {
        self.step_count += 1;
        self.time_accumulator += elapsed;
        self.last_step_time = elapsed;
    }

    /// Average kernel time per generation
    pub fn average_step_time(&self) -> Duration {
        if self.step_count > 0 {
            let nanos = self.time_accumulator.as_nanos() / u128::from(self.step_count);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        } else {
            Duration::ZERO
        }
    }

    /// Upper bound on generations per second given the average kernel time
    pub fn frequency(&self) -> f32 {
        let avg = self.average_step_time().as_secs_f32();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
