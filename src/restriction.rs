/*!

Social-distancing schedule.

Strictness is an integer level from 0 (no restriction) to 4; each level removes a quarter of the
non-household contacts an agent would otherwise have.

*/

use serde::{Deserialize, Serialize};

pub const MAX_STRICTNESS: u32 = 4;

/// How strictness evolves inside the restriction window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestrictionPolicy {
    /// The starting strictness holds for the whole window.
    Constant,
    /// Strictness steps down by one level at a time, reaching 1 on the last day of the window.
    Decreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictionScheduler {
    pub start_day: u32,
    pub duration: u32,
    pub strictness: u32,
    pub policy: RestrictionPolicy,
}

impl RestrictionScheduler {
    #[must_use]
    pub fn new(start_day: u32, duration: u32, strictness: u32, policy: RestrictionPolicy) -> Self {
        debug_assert!(strictness <= MAX_STRICTNESS);
        RestrictionScheduler {
            start_day,
            duration,
            strictness,
            policy,
        }
    }

    /// A schedule that never restricts anything.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self::new(0, 0, 0, RestrictionPolicy::Constant)
    }

    /// Strictness level in force on `day`.
    #[must_use]
    pub fn strictness_on(&self, day: u32) -> u32 {
        if self.duration == 0 || self.strictness == 0 {
            return 0;
        }
        if day < self.start_day || day - self.start_day >= self.duration {
            return 0;
        }
        match self.policy {
            RestrictionPolicy::Constant => self.strictness,
            RestrictionPolicy::Decreasing => self.decreasing_strictness(day - self.start_day),
        }
    }

    /// Fraction of optional contacts kept on `day`.
    #[must_use]
    pub fn factor_on(&self, day: u32) -> f64 {
        restriction_factor(self.strictness_on(day))
    }

    // The window is split into `strictness` consecutive steps of `duration / strictness` days;
    // the remainder goes one day each to the earliest steps.
    fn decreasing_strictness(&self, offset: u32) -> u32 {
        let steps = self.strictness;
        let base_days = self.duration / steps;
        let spare_days = self.duration - base_days * steps;

        let mut step_end = 0;
        for step in 0..steps {
            step_end += base_days + u32::from(step < spare_days);
            if offset < step_end {
                return steps - step;
            }
        }
        // `offset < duration` and the last step ends exactly at `duration`.
        unreachable!("day offset {offset} lies outside a window of {} days", self.duration)
    }
}

/// Converts a strictness level into the fraction of optional contacts that are kept.
#[must_use]
pub fn restriction_factor(strictness: u32) -> f64 {
    debug_assert!(strictness <= MAX_STRICTNESS);
    1.0 - 0.25 * f64::from(strictness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_disables_the_schedule() {
        let schedule = RestrictionScheduler::new(0, 0, 3, RestrictionPolicy::Decreasing);
        assert!((0..200).all(|day| schedule.strictness_on(day) == 0));
        assert!((0..200).all(|day| schedule.factor_on(day) == 1.0));
    }

    #[test]
    fn constant_policy_holds_inside_window_only() {
        let schedule = RestrictionScheduler::new(10, 5, 2, RestrictionPolicy::Constant);
        assert_eq!(schedule.strictness_on(9), 0);
        assert_eq!(schedule.strictness_on(10), 2);
        assert_eq!(schedule.strictness_on(14), 2);
        assert_eq!(schedule.strictness_on(15), 0);
        assert_eq!(schedule.factor_on(12), 0.5);
    }

    #[test]
    fn decreasing_policy_distributes_spare_days_first() {
        // 10 days over 3 levels: steps of 4, 3, 3 days.
        let schedule = RestrictionScheduler::new(5, 10, 3, RestrictionPolicy::Decreasing);
        let levels: Vec<u32> = (5..15).map(|day| schedule.strictness_on(day)).collect();
        assert_eq!(levels, vec![3, 3, 3, 3, 2, 2, 2, 1, 1, 1]);
        assert_eq!(schedule.strictness_on(15), 0);
    }

    #[test]
    fn decreasing_policy_with_short_window() {
        // Fewer days than levels: the trailing steps are zero days long.
        let schedule = RestrictionScheduler::new(0, 2, 4, RestrictionPolicy::Decreasing);
        assert_eq!(schedule.strictness_on(0), 4);
        assert_eq!(schedule.strictness_on(1), 3);
        assert_eq!(schedule.strictness_on(2), 0);
    }

    #[test]
    fn strictness_is_pure() {
        let schedule = RestrictionScheduler::new(3, 21, 2, RestrictionPolicy::Decreasing);
        for day in 0..40 {
            assert_eq!(schedule.strictness_on(day), schedule.strictness_on(day));
        }
    }

    #[test]
    fn factor_per_level() {
        let factors: Vec<f64> = (0..=MAX_STRICTNESS).map(restriction_factor).collect();
        assert_eq!(factors, vec![1.0, 0.75, 0.5, 0.25, 0.0]);
    }
}
