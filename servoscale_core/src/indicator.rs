//! Indicator derivation and the lines that display it.
//!
//! Indicator lines are optional and best-effort: a failed write is logged and the
//! control loop carries on, since the regenerated pulse matters more than a lamp.

use servoscale_traits::{OutputLine, PinMode, TriStateLine};

use crate::config::ControlCfg;
use crate::hw_error::map_hw_error;
use crate::types::{BrakeLight, DrivingState, IndicatorState, PulseWidth};

/// Brake/rear pin state for a driving state.
pub const fn brake_light_for(state: DrivingState) -> BrakeLight {
    match state {
        DrivingState::Braking => BrakeLight::High,
        DrivingState::Reverse => BrakeLight::Low,
        _ => BrakeLight::Released,
    }
}

impl IndicatorState {
    /// Indicators for one iteration. The front light follows the raw width only.
    pub fn derive(raw: PulseWidth, state: DrivingState, limited: bool, cfg: &ControlCfg) -> Self {
        Self {
            front_light: raw.as_us() >= cfg.front_light_us,
            brake: brake_light_for(state),
            limited,
        }
    }
}

pub type BoxedOutputLine = Box<dyn OutputLine + Send>;
pub type BoxedTriStateLine = Box<dyn TriStateLine + Send>;

/// Optional indicator lines.
#[derive(Default)]
pub struct IndicatorDriver {
    limited_led: Option<BoxedOutputLine>,
    brake_light: Option<BoxedTriStateLine>,
    front_light: Option<BoxedOutputLine>,
    brake_shown: Option<BrakeLight>,
}

impl core::fmt::Debug for IndicatorDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndicatorDriver")
            .field("limited_led", &self.limited_led.is_some())
            .field("brake_light", &self.brake_light.is_some())
            .field("front_light", &self.front_light.is_some())
            .field("brake_shown", &self.brake_shown)
            .finish()
    }
}

impl IndicatorDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limited_led(mut self, line: impl OutputLine + Send + 'static) -> Self {
        self.limited_led = Some(Box::new(line));
        self
    }

    pub fn with_brake_light(mut self, line: impl TriStateLine + Send + 'static) -> Self {
        self.brake_light = Some(Box::new(line));
        self
    }

    pub fn with_front_light(mut self, line: impl OutputLine + Send + 'static) -> Self {
        self.front_light = Some(Box::new(line));
        self
    }

    /// Drive the limited/syncing LED.
    pub fn show_limited(&mut self, on: bool) {
        if let Some(line) = self.limited_led.as_mut() {
            if let Err(e) = line.set_output_line(on) {
                tracing::warn!(error = %map_hw_error(&*e), "limited led write failed");
            }
        }
    }

    /// Apply front light and brake pin; the limited LED is handled by `show_limited`.
    pub fn apply(&mut self, ind: &IndicatorState) {
        if let Some(line) = self.front_light.as_mut() {
            if let Err(e) = line.set_output_line(ind.front_light) {
                tracing::warn!(error = %map_hw_error(&*e), "front light write failed");
            }
        }
        self.set_brake(ind.brake);
    }

    fn set_brake(&mut self, brake: BrakeLight) {
        // Pin mode changes are only issued on change
        if self.brake_shown == Some(brake) {
            return;
        }
        let Some(line) = self.brake_light.as_mut() else {
            return;
        };
        let res = match brake {
            BrakeLight::Released => line.set_pin_mode(PinMode::Input),
            BrakeLight::High | BrakeLight::Low => line
                .set_output_line(brake == BrakeLight::High)
                .and_then(|()| line.set_pin_mode(PinMode::Output)),
        };
        match res {
            Ok(()) => self.brake_shown = Some(brake),
            Err(e) => {
                tracing::warn!(error = %map_hw_error(&*e), ?brake, "brake light write failed");
            }
        }
    }
}
