#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the servoscale controller.
//!
//! `Config` and its sections are deserialized from TOML and validated. Every
//! tunable defaults to the value the controller was designed around, so a config
//! only needs a `[pins]` section.
use serde::Deserialize;
use serde::de::Deserializer;

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pins {
    pub pulse_in: u8,
    pub pulse_out: u8,
    pub limited_led: Option<u8>,
    /// Tri-state brake/rear light pin.
    pub brake_light: Option<u8>,
    pub front_light: Option<u8>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlCfg {
    pub center_us: u16,
    /// Dead band around center in which the stick counts as released.
    pub margin_us: u16,
    /// Forward deviation treated as full throttle.
    pub fwd_full_us: u16,
    /// Forward iterations during which a full-throttle burst passes unscaled.
    pub max_burst: u8,
    /// Iterations before a centered stick may leave Forward, Braking or Reverse.
    pub exit_debounce: u8,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            center_us: 1500,
            margin_us: 40,
            fwd_full_us: 400,
            max_burst: 15,
            exit_debounce: 4,
        }
    }
}

/// Scale factor `num / den`.
///
/// Accepts either:
/// - a pair: `forward = [2, 5]`
/// - a table: `forward = { num = 2, den = 5 }`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    pub num: i32,
    pub den: i32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RatioToml {
    Pair((i32, i32)),
    Table { num: i32, den: i32 },
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RatioToml::deserialize(deserializer)? {
            RatioToml::Pair((num, den)) | RatioToml::Table { num, den } => Self { num, den },
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScalingCfg {
    pub forward: Ratio,
    pub reverse: Ratio,
}

impl Default for ScalingCfg {
    fn default() -> Self {
        Self {
            forward: Ratio { num: 2, den: 5 },
            reverse: Ratio { num: 2, den: 3 },
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Samples further than this from center are ignored.
    pub window_us: u16,
    /// Leading iterations not accumulated.
    pub settle_samples: u8,
    /// Accumulated iterations; also the offset divisor.
    pub samples: u8,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            window_us: 500,
            settle_samples: 10,
            samples: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndicatorsCfg {
    /// Front light is on at or above this raw width.
    pub front_light_us: u16,
}

impl Default for IndicatorsCfg {
    fn default() -> Self {
        Self {
            front_light_us: 1400,
        }
    }
}

/// Optional clamp of the regenerated pulse; absent by default.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OutputCfg {
    pub min_us: Option<u16>,
    pub max_us: Option<u16>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Timeouts {
    /// Fail with "signal lost" after this many ms without a pulse. 0 waits forever.
    pub signal_lost_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerCfg {
    /// Receiver frame rate; iterations slower than 1.5 frames count as missed.
    pub frame_hz: u32,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self { frame_hz: 50 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub scaling: ScalingCfg,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub indicators: IndicatorsCfg,
    #[serde(default)]
    pub output: OutputCfg,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

const ROTATIONS: [&str; 3] = ["never", "daily", "hourly"];

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        let mut used = vec![("pins.pulse_in", p.pulse_in), ("pins.pulse_out", p.pulse_out)];
        for (name, pin) in [
            ("pins.limited_led", p.limited_led),
            ("pins.brake_light", p.brake_light),
            ("pins.front_light", p.front_light),
        ] {
            if let Some(pin) = pin {
                used.push((name, pin));
            }
        }
        for (i, (a, pa)) in used.iter().enumerate() {
            if let Some((b, _)) = used[i + 1..].iter().find(|(_, pb)| pb == pa) {
                eyre::bail!("{a} and {b} both use pin {pa}");
            }
        }

        // Control
        if self.control.center_us == 0 {
            eyre::bail!("control.center_us must be > 0");
        }
        if self.control.margin_us == 0 {
            eyre::bail!("control.margin_us must be > 0");
        }
        if self.control.fwd_full_us < self.control.margin_us {
            eyre::bail!("control.fwd_full_us must be >= control.margin_us");
        }
        if self.control.max_burst == 0 {
            eyre::bail!("control.max_burst must be > 0");
        }
        if self.control.max_burst > 100 {
            eyre::bail!("control.max_burst is unreasonably large (>100 frames)");
        }

        // Scaling
        for (name, r) in [
            ("scaling.forward", self.scaling.forward),
            ("scaling.reverse", self.scaling.reverse),
        ] {
            if r.den == 0 {
                eyre::bail!("{name} denominator must be non-zero");
            }
            if r.num < 0 || r.den < 0 {
                eyre::bail!("{name} must be a non-negative ratio");
            }
        }

        // Calibration
        if self.calibration.samples == 0 {
            eyre::bail!("calibration.samples must be >= 1");
        }
        // The calibration iteration count saturates at 256.
        let iterations = u16::from(self.calibration.settle_samples) + u16::from(self.calibration.samples);
        if iterations > 256 {
            eyre::bail!(
                "calibration.settle_samples + calibration.samples must be <= 256, got {iterations}"
            );
        }
        if self.calibration.window_us == 0 {
            eyre::bail!("calibration.window_us must be > 0");
        }

        // Output
        if let (Some(min), Some(max)) = (self.output.min_us, self.output.max_us) {
            if min > max {
                eyre::bail!("output.min_us ({min}) must be <= output.max_us ({max})");
            }
        }

        // Timeouts
        if self.timeouts.signal_lost_ms > 60 * 60 * 1000 {
            eyre::bail!("timeouts.signal_lost_ms is unreasonably large (>1h)");
        }

        // Runner
        if self.runner.frame_hz == 0 {
            eyre::bail!("runner.frame_hz must be > 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !ROTATIONS.contains(&rot.to_ascii_lowercase().as_str()) {
                eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
            }
        }

        Ok(())
    }
}
