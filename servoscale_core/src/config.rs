//! Runtime configuration for the control loop.
//!
//! These are the structs used by `ServoCore`. They are separate from the
//! TOML-deserialized config in `servoscale_config`; see `conversions`.

use crate::types::{PulseWidth, Ratio};

/// Pulse center in microseconds.
pub const CENTER_US: u16 = 1_500;
/// Dead band around the center, in microseconds.
pub const MARGIN_US: u16 = 40;
/// Forward deviation considered full throttle.
pub const FWD_FULL_US: u16 = 400;
/// Forward iterations (20ms each) during which a full-throttle burst is tolerated.
pub const MAX_BURST: u8 = 15;
/// Iterations a state must last before a centered stick may leave it.
pub const EXIT_DEBOUNCE: u8 = 4;
/// Calibration accepts samples within this distance from center.
pub const CALIBRATION_WINDOW_US: u16 = 500;
/// Calibration iterations ignored before accumulating.
pub const CALIBRATION_SETTLE_SAMPLES: u8 = 10;
/// Calibration iterations accumulated (and the divisor of the offset).
pub const CALIBRATION_SAMPLES: u8 = 10;
/// Highest calibration iteration the saturating state counter can report.
pub const MAX_CALIBRATION_ITERATIONS: u16 = u8::MAX as u16 + 1;
/// Front light turns on at or above this raw width.
pub const FRONT_LIGHT_US: u16 = 1_400;
/// Nominal receiver frame rate.
pub const FRAME_HZ: u32 = 50;

/// Optional clamp of the regenerated pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputLimits {
    pub min_us: Option<u16>,
    pub max_us: Option<u16>,
}

impl OutputLimits {
    #[inline]
    pub fn clamp(self, width: PulseWidth) -> PulseWidth {
        let mut us = width.as_us();
        if let Some(min) = self.min_us {
            us = us.max(min);
        }
        if let Some(max) = self.max_us {
            us = us.min(max);
        }
        PulseWidth::from_us(us)
    }
}

/// Thresholds and scaling of the driving state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCfg {
    pub center_us: u16,
    pub margin_us: u16,
    pub fwd_full_us: u16,
    pub max_burst: u8,
    pub exit_debounce: u8,
    pub forward_scale: Ratio,
    pub reverse_scale: Ratio,
    pub front_light_us: u16,
    pub output_limits: OutputLimits,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            center_us: CENTER_US,
            margin_us: MARGIN_US,
            fwd_full_us: FWD_FULL_US,
            max_burst: MAX_BURST,
            exit_debounce: EXIT_DEBOUNCE,
            forward_scale: Ratio::new(2, 5),
            reverse_scale: Ratio::new(2, 3),
            front_light_us: FRONT_LIGHT_US,
            output_limits: OutputLimits::default(),
        }
    }
}

impl ControlCfg {
    #[inline]
    pub fn margin(&self) -> i32 {
        i32::from(self.margin_us)
    }

    /// Regenerated width for an output deviation: saturated, then clamped.
    #[inline]
    pub fn output_width(&self, d: i32) -> PulseWidth {
        self.output_limits
            .clamp(PulseWidth::from_deviation(self.center_us, d))
    }
}

/// Boot-time self-calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationCfg {
    pub window_us: u16,
    pub settle_samples: u8,
    pub samples: u8,
}

impl CalibrationCfg {
    /// Iteration on which calibration completes when no sample is rejected.
    pub fn iterations(&self) -> u16 {
        u16::from(self.settle_samples) + u16::from(self.samples)
    }
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            window_us: CALIBRATION_WINDOW_US,
            settle_samples: CALIBRATION_SETTLE_SAMPLES,
            samples: CALIBRATION_SAMPLES,
        }
    }
}

/// Timeouts and watchdogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timeouts {
    /// Fail with `SignalLost` when no complete pulse arrives within this many ms.
    /// `None` blocks forever.
    pub signal_lost_ms: Option<u64>,
}

/// Loop pacing used for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerCfg {
    pub frame_hz: u32,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self { frame_hz: FRAME_HZ }
    }
}
