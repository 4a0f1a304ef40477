use std::time::{Duration, Instant};

/// Timing and population data for the most recent step.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfile {
    pub integrate_positions_time: Duration,
    pub broad_phase_time: Duration,
    pub narrow_phase_time: Duration,
    pub solver_time: Duration,
    pub integrate_velocities_time: Duration,
    pub callback_time: Duration,
    pub total_step_time: Duration,

    pub body_count: usize,
    pub shape_count: usize,
    pub candidate_pair_count: usize,
    pub arbiter_count: usize,
    pub contact_count: usize,
    pub constraint_count: usize,
}

impl StepProfile {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        let total_us = self.total_step_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        let share = |d: Duration| (d.as_micros() as f32 / total_us) * 100.0;

        log::debug!(
            "step profile: bodies {}, shapes {}, pairs {}, arbiters {}, contacts {}, constraints {}",
            self.body_count,
            self.shape_count,
            self.candidate_pair_count,
            self.arbiter_count,
            self.contact_count,
            self.constraint_count
        );
        log::debug!(
            "  total {:.3} ms | positions {:.1}% | broad {:.1}% | narrow {:.1}% | solver {:.1}% | velocities {:.1}% | callbacks {:.1}%",
            self.total_step_time.as_secs_f32() * 1000.0,
            share(self.integrate_positions_time),
            share(self.broad_phase_time),
            share(self.narrow_phase_time),
            share(self.solver_time),
            share(self.integrate_velocities_time),
            share(self.callback_time)
        );
    }
}

/// Adds the elapsed time of its scope to the referenced duration.
pub struct ScopedTimer<'a> {
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(output: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            output,
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        *self.output += self.start.elapsed();
    }
}
