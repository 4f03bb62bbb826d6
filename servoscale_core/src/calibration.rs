//! Boot-time bias calibration.
//!
//! While the controller is `Calibrating`, every iteration is offered to the
//! [`Calibrator`]. Samples further than `window_us` from center are rejected.
//! Accepted samples past the settle period accumulate `-d`; once the iteration
//! count reaches `settle_samples + samples` the sum is divided by `samples` and
//! frozen as the offset added to every later deviation.
//!
//! The iteration count is the shared state counter, so rejected samples still
//! use up calibration iterations while the divisor stays fixed.

use crate::config::CalibrationCfg;
use crate::types::Deviation;

/// Outcome of offering one sample to the calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStep {
    /// Sample outside the window; ignored.
    Rejected,
    /// Sample accepted, more are needed.
    Pending,
    /// Calibration finished with this offset.
    Done { offset: Deviation },
}

#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    accumulated: i32,
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of `-d` over contributing samples so far.
    pub fn accumulated(&self) -> i32 {
        self.accumulated
    }

    /// Offer raw deviation `d` observed on 1-based calibration iteration `n`.
    pub fn observe(&mut self, d: Deviation, n: u32, cfg: &CalibrationCfg) -> CalibrationStep {
        if d.unsigned_abs() > u32::from(cfg.window_us) {
            return CalibrationStep::Rejected;
        }
        let settle = u32::from(cfg.settle_samples);
        if n > settle {
            self.accumulated = self.accumulated.saturating_sub(d);
        }
        if n >= settle + u32::from(cfg.samples) {
            let offset = self.accumulated / i32::from(cfg.samples.max(1));
            self.accumulated = 0;
            return CalibrationStep::Done { offset };
        }
        CalibrationStep::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(cal: &mut Calibrator, samples: &[Deviation]) -> Vec<CalibrationStep> {
        let cfg = CalibrationCfg::default();
        samples
            .iter()
            .zip(1u32..)
            .map(|(&d, n)| cal.observe(d, n, &cfg))
            .collect()
    }

    #[test]
    fn constant_bias_is_cancelled() {
        let mut cal = Calibrator::new();
        let steps = feed(&mut cal, &[30; 20]);
        assert!(steps[..19].iter().all(|s| *s == CalibrationStep::Pending));
        assert_eq!(steps[19], CalibrationStep::Done { offset: -30 });
    }

    #[test]
    fn settle_samples_do_not_count() {
        let mut samples = vec![400; 10];
        samples.extend([-20; 10]);
        let mut cal = Calibrator::new();
        let steps = feed(&mut cal, &samples);
        assert_eq!(steps[19], CalibrationStep::Done { offset: 20 });
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let cfg = CalibrationCfg::default();
        let mut cal = Calibrator::new();
        assert_eq!(cal.observe(500, 11, &cfg), CalibrationStep::Pending);
        assert_eq!(cal.observe(-500, 12, &cfg), CalibrationStep::Pending);
        assert_eq!(cal.observe(501, 13, &cfg), CalibrationStep::Rejected);
        assert_eq!(cal.observe(-501, 14, &cfg), CalibrationStep::Rejected);
        assert_eq!(cal.accumulated(), 0);
    }

    #[test]
    fn offset_division_truncates_toward_zero() {
        let mut samples = vec![0; 10];
        samples.extend([7; 10]);
        let mut cal = Calibrator::new();
        let steps = feed(&mut cal, &samples);
        // -70 / 10
        assert_eq!(steps[19], CalibrationStep::Done { offset: -7 });

        let mut samples = vec![0; 19];
        samples.push(15);
        let mut cal = Calibrator::new();
        let steps = feed(&mut cal, &samples);
        assert_eq!(steps[19], CalibrationStep::Done { offset: -1 });
    }
}
