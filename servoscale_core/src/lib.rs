#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core servo pulse controller (hardware-agnostic).
//!
//! This crate reads an RC servo pulse, classifies it into a driving state,
//! rescales the commanded throw and regenerates the pulse. All hardware access
//! goes through the `servoscale_traits` line and clock traits.
//!
//! ## Architecture
//!
//! - **Pulse timing**: measure and emit pulses on a `Clock` (`pulse` module)
//! - **Calibration**: boot-time bias offset (`calibration` module)
//! - **State machine**: six driving states with exit debounce (`state` module)
//! - **Scaling**: forward/reverse attenuation and burst limiting (`scaling` module)
//! - **Indicators**: front light, brake tri-state pin, limited LED (`indicator` module)
//! - **Loop**: `ControllerState` holds everything carried between iterations;
//!   `ServoCore` wires it to the lines; `runner` drives it.
//!
//! ## Units
//!
//! Widths are whole microseconds (`PulseWidth`, `u16`). Deviations from center
//! are `i32` and every division truncates toward zero.

pub mod builder;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod core;
pub mod error;
pub mod hw_error;
pub mod indicator;
pub mod pulse;
pub mod runner;
pub mod scaling;
pub mod state;
pub mod status;
pub mod types;
pub mod util;

pub use builder::{Missing, Servoscale, ServoscaleBuilder, Set, build_servo_core};
pub use calibration::{CalibrationStep, Calibrator};
pub use config::{CalibrationCfg, ControlCfg, OutputLimits, RunnerCfg, Timeouts};
pub use controller::ControllerState;
pub use crate::core::ServoCore;
pub use error::{BuildError, Report, Result, ServoError};
pub use indicator::IndicatorDriver;
pub use pulse::PulseTimer;
pub use runner::{LoopStats, PassthroughMode, RunParams, RunSummary, StopReason};
pub use state::{DebounceCounter, StateMachine};
pub use status::Tick;
pub use types::{BrakeLight, Deviation, DrivingState, IndicatorState, PulseWidth, Ratio, Transition};
