//! Backend selection: simulated board or Raspberry Pi GPIO.
//!
//! `SERVOSCALE_SIM_WIDTHS` forces the simulator and scripts the receiver as a comma
//! separated list of widths in microseconds; `WxN` repeats a width `N` times.

use eyre::WrapErr;
use servoscale_config::Config;
use servoscale_core::builder::{BoxedInputLine, BoxedPulseOutput};
use servoscale_core::{ServoCore, ServoError, Timeouts, build_servo_core};
use servoscale_core::{CalibrationCfg, ControlCfg, IndicatorDriver, PassthroughMode};
use servoscale_hardware::SimBoard;
use servoscale_hardware::error::HwError;
use servoscale_hardware::sim::DEFAULT_FRAME_US;
use servoscale_traits::{Clock, InputLine};
use std::time::Duration;

pub const SIM_WIDTHS_ENV: &str = "SERVOSCALE_SIM_WIDTHS";

/// Receiver script used when the simulator runs without `SERVOSCALE_SIM_WIDTHS`:
/// a centered stick long enough to calibrate, then a short forward blip.
#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
const DEFAULT_SIM_SCRIPT: &str = "1500x25,1900x5,1500x10";

pub type Core = ServoCore<BoxedInputLine, BoxedPulseOutput>;

/// Which backend the lines came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKind {
    /// Scripted receiver with this many pulses.
    Sim { pulses: u64 },
    Gpio,
}

/// Opened lines, ready to become a `ServoCore`.
pub struct Board {
    pub kind: BoardKind,
    pulse_in: BoxedInputLine,
    pulse_out: BoxedPulseOutput,
    indicators: IndicatorDriver,
    clock: Option<Box<dyn Clock + Send + Sync>>,
}

impl Board {
    pub fn open(cfg: &Config) -> eyre::Result<Self> {
        if let Ok(script) = std::env::var(SIM_WIDTHS_ENV) {
            let widths = parse_sim_widths(&script).wrap_err_with(|| format!("parsing {SIM_WIDTHS_ENV}"))?;
            return Ok(Self::sim(widths));
        }
        #[cfg(all(feature = "hardware", target_os = "linux"))]
        {
            Self::gpio(cfg)
        }
        #[cfg(not(all(feature = "hardware", target_os = "linux")))]
        {
            let _ = cfg;
            tracing::info!("built without hardware support; using the simulated receiver");
            Ok(Self::sim(parse_sim_widths(DEFAULT_SIM_SCRIPT)?))
        }
    }

    pub fn sim(widths: Vec<u16>) -> Self {
        let pulses = widths.len() as u64;
        let board = SimBoard::new(widths);
        tracing::debug!(pulses, "simulated board");
        Self {
            kind: BoardKind::Sim { pulses },
            pulse_in: Box::new(board.pulse_in),
            pulse_out: Box::new(board.pulse_out),
            indicators: IndicatorDriver::new()
                .with_limited_led(board.limited_led)
                .with_brake_light(board.brake_light)
                .with_front_light(board.front_light),
            clock: Some(Box::new(board.clock)),
        }
    }

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    fn gpio(cfg: &Config) -> eyre::Result<Self> {
        use servoscale_hardware::gpio::{GpioBoard, PinMap};

        let p = &cfg.pins;
        let pins = PinMap {
            pulse_in: p.pulse_in,
            pulse_out: p.pulse_out,
            limited_led: p.limited_led,
            brake_light: p.brake_light,
            front_light: p.front_light,
        };
        let board = GpioBoard::open(&pins)
            .map_err(|e| eyre::Report::new(hw_to_servo(&e)))
            .wrap_err("open gpio pins")?;
        let mut indicators = IndicatorDriver::new();
        if let Some(l) = board.limited_led {
            indicators = indicators.with_limited_led(l);
        }
        if let Some(l) = board.brake_light {
            indicators = indicators.with_brake_light(l);
        }
        if let Some(l) = board.front_light {
            indicators = indicators.with_front_light(l);
        }
        Ok(Self {
            kind: BoardKind::Gpio,
            pulse_in: Box::new(board.pulse_in),
            pulse_out: Box::new(board.pulse_out),
            indicators,
            clock: None,
        })
    }

    /// Iteration bound that keeps a simulated run from stalling once the script ends:
    /// one per scripted pulse, or one per simulated microsecond when mirroring levels.
    pub fn default_iterations(&self, mode: Option<PassthroughMode>) -> Option<u64> {
        let BoardKind::Sim { pulses } = self.kind else {
            return None;
        };
        Some(match mode {
            Some(PassthroughMode::Level) => pulses.saturating_add(1).saturating_mul(DEFAULT_FRAME_US),
            _ => pulses,
        })
    }

    /// Wait for one complete pulse on the input line.
    pub fn probe(&mut self, timeout: Duration) -> eyre::Result<()> {
        let input = &mut self.pulse_in;
        servoscale_hardware::util::probe_pulse(
            || input.read_input_line().map_err(|e| HwError::Gpio(e.to_string())),
            timeout,
            Duration::ZERO,
        )
        .map_err(|e| match hw_to_servo(&e) {
            ServoError::SignalLost { .. } => ServoError::SignalLost {
                waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            other => other,
        })
        .map_err(eyre::Report::new)
    }

    pub fn into_core(self, cfg: &Config, timeouts: Timeouts) -> eyre::Result<Core> {
        build_servo_core(
            self.pulse_in,
            self.pulse_out,
            self.indicators,
            ControlCfg::from(cfg),
            CalibrationCfg::from(&cfg.calibration),
            timeouts,
            self.clock,
        )
    }
}

fn hw_to_servo(e: &HwError) -> ServoError {
    servoscale_core::hw_error::map_hw_error(e)
}

/// Parse `"1500,1500x20,1900"` into widths.
pub fn parse_sim_widths(s: &str) -> eyre::Result<Vec<u16>> {
    let mut widths = Vec::new();
    for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (w, n) = match token.split_once(['x', 'X']) {
            Some((w, n)) => (w, n.trim().parse::<usize>().wrap_err_with(|| format!("bad repeat count in {token:?}"))?),
            None => (token, 1),
        };
        let w = w.trim().parse::<u16>().wrap_err_with(|| format!("bad width {token:?}"))?;
        if u64::from(w) >= DEFAULT_FRAME_US {
            eyre::bail!("width {w}us does not fit in a {DEFAULT_FRAME_US}us frame");
        }
        widths.extend(std::iter::repeat_n(w, n));
    }
    Ok(widths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", vec![])]
    #[case("1500", vec![1500])]
    #[case(" 1500 , 1900 ", vec![1500, 1900])]
    #[case("1500x3,1100", vec![1500, 1500, 1500, 1100])]
    #[case("1200X2", vec![1200, 1200])]
    fn parses_scripts(#[case] script: &str, #[case] expected: Vec<u16>) {
        assert_eq!(parse_sim_widths(script).unwrap(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("1500x")]
    #[case("-5")]
    #[case("25000")]
    fn rejects_bad_scripts(#[case] script: &str) {
        assert!(parse_sim_widths(script).is_err());
    }

    #[test]
    fn default_script_calibrates_then_drives() {
        let w = parse_sim_widths(DEFAULT_SIM_SCRIPT).unwrap();
        assert_eq!(w.len(), 40);
        assert!(w[..20].iter().all(|&x| x == 1500));
    }

    #[test]
    fn sim_board_bounds_iterations() {
        let board = Board::sim(vec![1500; 4]);
        assert_eq!(board.kind, BoardKind::Sim { pulses: 4 });
        assert_eq!(board.default_iterations(None), Some(4));
        assert_eq!(board.default_iterations(Some(PassthroughMode::Pulse)), Some(4));
        assert_eq!(board.default_iterations(Some(PassthroughMode::Level)), Some(100_000));
    }

    #[test]
    fn probe_sees_a_scripted_pulse() {
        let mut board = Board::sim(vec![1500]);
        board.probe(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn probe_without_pulses_reports_signal_lost() {
        let mut board = Board::sim(vec![]);
        let err = board.probe(Duration::from_millis(20)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ServoError>(),
            Some(&ServoError::SignalLost { waited_ms: 20 })
        );
    }
}
