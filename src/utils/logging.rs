use log::{Level, log_enabled, warn};
use std::time::{Duration, Instant};

/// Scoped timer that traces the duration of a step phase.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Emits a warning when a step took longer than `budget_ms`. Returns whether it did.
pub fn warn_if_step_budget_exceeded(duration: Duration, budget_ms: f32) -> bool {
    let elapsed_ms = duration.as_secs_f32() * 1000.0;
    if elapsed_ms > budget_ms {
        warn!(
            "Step exceeded budget: {:.2} ms > {:.2} ms",
            elapsed_ms, budget_ms
        );
        return true;
    }
    false
}
