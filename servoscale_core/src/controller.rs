//! All mutable loop state in one value, and the pure per-iteration step.

use crate::calibration::{CalibrationStep, Calibrator};
use crate::config::{CalibrationCfg, ControlCfg};
use crate::scaling::{BurstCounter, scale};
use crate::state::StateMachine;
use crate::status::Tick;
use crate::types::{Deviation, DrivingState, IndicatorState, PulseWidth};

/// State carried from one iteration to the next.
#[derive(Debug, Clone)]
pub struct ControllerState {
    control: ControlCfg,
    calibration: CalibrationCfg,
    machine: StateMachine,
    calibrator: Calibrator,
    offset: Deviation,
    burst: BurstCounter,
    limited: bool,
}

impl ControllerState {
    /// Fresh boot state: Calibrating, zero offset, limited LED on.
    pub fn new(control: ControlCfg, calibration: CalibrationCfg) -> Self {
        Self {
            control,
            calibration,
            machine: StateMachine::new(),
            calibrator: Calibrator::new(),
            offset: 0,
            burst: BurstCounter::default(),
            limited: true,
        }
    }

    pub fn control(&self) -> &ControlCfg {
        &self.control
    }

    pub fn state(&self) -> DrivingState {
        self.machine.state()
    }

    /// Frozen calibration offset; zero until calibration completes.
    pub fn offset(&self) -> Deviation {
        self.offset
    }

    pub fn debounce(&self) -> u8 {
        self.machine.debounce()
    }

    pub fn burst(&self) -> i16 {
        self.burst.get()
    }

    /// Limited flag from the last iteration, shown while waiting for the next pulse.
    pub fn limited(&self) -> bool {
        self.limited
    }

    /// Consume one measured width and decide the output.
    pub fn advance(&mut self, raw: PulseWidth) -> Tick {
        let mut d = raw.deviation_from(self.control.center_us);
        let mut calibrated = None;

        let transition = if self.machine.state() == DrivingState::Calibrating {
            let n = u32::from(self.machine.debounce()) + 1;
            match self.calibrator.observe(d, n, &self.calibration) {
                CalibrationStep::Done { offset } => {
                    self.offset = offset;
                    calibrated = Some(offset);
                    self.machine.enter(DrivingState::Idle)
                }
                CalibrationStep::Pending | CalibrationStep::Rejected => None,
            }
        } else {
            d = d.saturating_add(self.offset);
            self.machine.step(d, &self.control)
        };

        let state = self.machine.state();
        let scaled = scale(state, d, &mut self.burst, &self.control);
        self.limited = scaled.limited;
        let output = self.control.output_width(scaled.deviation);
        let indicators = IndicatorState::derive(raw, state, scaled.limited, &self.control);
        self.machine.advance();

        Tick {
            raw,
            deviation: d,
            state,
            transition,
            scaled: scaled.deviation,
            output,
            indicators,
            burst: self.burst.get(),
            calibrated,
        }
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new(ControlCfg::default(), CalibrationCfg::default())
    }
}
