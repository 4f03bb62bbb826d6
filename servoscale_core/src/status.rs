//! Per-iteration result of the control loop.

use crate::types::{Deviation, DrivingState, IndicatorState, PulseWidth, Transition};

/// What one iteration measured, decided and emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub raw: PulseWidth,
    /// Deviation fed to the state machine (bias-corrected once calibrated).
    pub deviation: Deviation,
    /// State after this iteration's transition.
    pub state: DrivingState,
    pub transition: Option<Transition>,
    /// Deviation after scaling.
    pub scaled: Deviation,
    pub output: PulseWidth,
    pub indicators: IndicatorState,
    pub burst: i16,
    /// Offset frozen on this iteration, when calibration completed.
    pub calibrated: Option<Deviation>,
}
