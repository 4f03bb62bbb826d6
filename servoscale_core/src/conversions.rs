//! `From` implementations bridging `servoscale_config` types to `servoscale_core` types.

use crate::config::{CalibrationCfg, ControlCfg, OutputLimits, RunnerCfg, Timeouts};
use crate::types::Ratio;

// ── Ratio ────────────────────────────────────────────────────────────────────

impl From<servoscale_config::Ratio> for Ratio {
    fn from(r: servoscale_config::Ratio) -> Self {
        Self::new(r.num, r.den)
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<&servoscale_config::Config> for ControlCfg {
    fn from(c: &servoscale_config::Config) -> Self {
        Self {
            center_us: c.control.center_us,
            margin_us: c.control.margin_us,
            fwd_full_us: c.control.fwd_full_us,
            max_burst: c.control.max_burst,
            exit_debounce: c.control.exit_debounce,
            forward_scale: c.scaling.forward.into(),
            reverse_scale: c.scaling.reverse.into(),
            front_light_us: c.indicators.front_light_us,
            output_limits: OutputLimits::from(&c.output),
        }
    }
}

impl From<&servoscale_config::OutputCfg> for OutputLimits {
    fn from(c: &servoscale_config::OutputCfg) -> Self {
        Self {
            min_us: c.min_us,
            max_us: c.max_us,
        }
    }
}

// ── CalibrationCfg ───────────────────────────────────────────────────────────

impl From<&servoscale_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &servoscale_config::CalibrationCfg) -> Self {
        Self {
            window_us: c.window_us,
            settle_samples: c.settle_samples,
            samples: c.samples,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&servoscale_config::Timeouts> for Timeouts {
    fn from(c: &servoscale_config::Timeouts) -> Self {
        Self {
            signal_lost_ms: (c.signal_lost_ms > 0).then_some(c.signal_lost_ms),
        }
    }
}

// ── RunnerCfg ────────────────────────────────────────────────────────────────

impl From<&servoscale_config::RunnerCfg> for RunnerCfg {
    fn from(c: &servoscale_config::RunnerCfg) -> Self {
        Self {
            frame_hz: c.frame_hz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_defaults() {
        let cfg = servoscale_config::load_toml("[pins]\npulse_in = 4\npulse_out = 3\n").unwrap();
        assert_eq!(ControlCfg::from(&cfg), ControlCfg::default());
        assert_eq!(CalibrationCfg::from(&cfg.calibration), CalibrationCfg::default());
        assert_eq!(Timeouts::from(&cfg.timeouts), Timeouts::default());
        assert_eq!(RunnerCfg::from(&cfg.runner), RunnerCfg::default());
    }

    #[test]
    fn zero_signal_timeout_means_wait_forever() {
        let t = servoscale_config::Timeouts { signal_lost_ms: 0 };
        assert_eq!(Timeouts::from(&t).signal_lost_ms, None);
        let t = servoscale_config::Timeouts { signal_lost_ms: 80 };
        assert_eq!(Timeouts::from(&t).signal_lost_ms, Some(80));
    }
}
