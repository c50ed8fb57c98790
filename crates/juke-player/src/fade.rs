//! Timed linear volume ramps.
//!
//! A plan is a bounded list of volume samples plus the interval between
//! them; the player applies each sample to the sink as it comes due,
//! re-checking its fade generation immediately before every write so a
//! superseded ramp can never land a stale step.

use std::time::Duration;

/// Longest permitted ramp, in seconds.
pub const MAX_FADE_SECS: f32 = 10.0;

/// Samples per second of ramp.
const STEPS_PER_SEC: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FadePlan {
    steps: Vec<f32>,
    interval: Duration,
}

impl FadePlan {
    /// Build a ramp from `start` to `end` over `secs` seconds:
    /// `max(1, floor(secs * 10))` evenly spaced linear steps. A zero
    /// duration collapses to a single immediate step at `end`.
    pub fn new(start: f32, end: f32, secs: f32) -> Self {
        let secs = if secs.is_finite() {
            secs.clamp(0.0, MAX_FADE_SECS)
        } else {
            0.0
        };
        let count = ((secs * STEPS_PER_SEC).floor() as usize).max(1);

        let steps = (1..=count)
            .map(|i| start + (end - start) * (i as f32 / count as f32))
            .collect();
        let interval = Duration::from_secs_f32(secs / count as f32);

        Self { steps, interval }
    }

    pub fn steps(&self) -> &[f32] {
        &self.steps
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_one_immediate_step_at_target() {
        let plan = FadePlan::new(0.8, 0.0, 0.0);
        assert_eq!(plan.steps(), &[0.0]);
        assert_eq!(plan.interval(), Duration::ZERO);
    }

    #[test]
    fn step_count_is_ten_per_second() {
        assert_eq!(FadePlan::new(0.0, 1.0, 2.0).steps().len(), 20);
        assert_eq!(FadePlan::new(0.0, 1.0, 0.55).steps().len(), 5);
        // Sub-tenth durations still emit one step.
        assert_eq!(FadePlan::new(0.0, 1.0, 0.05).steps().len(), 1);
    }

    #[test]
    fn ramp_is_linear_and_ends_on_target() {
        let plan = FadePlan::new(0.0, 1.0, 1.0);
        let steps = plan.steps();
        assert_eq!(steps.len(), 10);
        assert!((steps[0] - 0.1).abs() < 1e-6);
        assert!((steps[4] - 0.5).abs() < 1e-6);
        assert!((steps[9] - 1.0).abs() < 1e-6);
        for pair in steps.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn duration_clamps_to_ten_seconds() {
        let plan = FadePlan::new(1.0, 0.0, 25.0);
        assert_eq!(plan.steps().len(), 100);
        let interval_ms = plan.interval().as_secs_f32() * 1000.0;
        assert!((interval_ms - 100.0).abs() < 1.0);
    }

    #[test]
    fn descending_ramp_reaches_zero() {
        let plan = FadePlan::new(0.6, 0.0, 0.5);
        let last = *plan.steps().last().unwrap();
        assert!(last.abs() < 1e-6);
        for pair in plan.steps().windows(2) {
            assert!(pair[1] < pair[0]);
        }
    }
}
