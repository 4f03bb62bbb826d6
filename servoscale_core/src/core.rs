//! The servoscale control loop (`ServoCore`).
//!
//! One call to [`ServoCore::step`] is one iteration: show the limited LED while
//! waiting, measure the incoming pulse, clear the LED, run the controller, update
//! the indicators and emit the regenerated pulse. Output `n` always reflects input `n`.

use std::time::Duration;

use servoscale_traits::{Clock, InputLine, OutputLine};
use std::sync::Arc;

use crate::controller::ControllerState;
use crate::error::Result;
use crate::indicator::IndicatorDriver;
use crate::pulse::PulseTimer;
use crate::status::Tick;
use crate::types::{DrivingState, PulseWidth};

/// Generic core over the pulse lines; indicators are always boxed.
pub struct ServoCore<I: InputLine, O: OutputLine> {
    pub(crate) timer: PulseTimer<I, O>,
    pub(crate) indicators: IndicatorDriver,
    pub(crate) state: ControllerState,
    pub(crate) iterations: u64,
}

impl<I: InputLine, O: OutputLine> core::fmt::Debug for ServoCore<I, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServoCore")
            .field("state", &self.state.state())
            .field("offset", &self.state.offset())
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl<I: InputLine, O: OutputLine> ServoCore<I, O> {
    pub fn new(timer: PulseTimer<I, O>, indicators: IndicatorDriver, state: ControllerState) -> Self {
        Self {
            timer,
            indicators,
            state,
            iterations: 0,
        }
    }

    pub fn state(&self) -> DrivingState {
        self.state.state()
    }

    pub fn offset(&self) -> i32 {
        self.state.offset()
    }

    pub fn controller(&self) -> &ControllerState {
        &self.state
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        self.timer.clock()
    }

    pub fn signal_timeout(&self) -> Option<Duration> {
        self.timer.timeout()
    }

    /// One full iteration, blocking until a pulse arrives (or the signal timeout fires).
    pub fn step(&mut self) -> Result<Tick> {
        self.indicators.show_limited(self.state.limited());
        let raw = self.timer.measure()?;
        self.indicators.show_limited(false);
        self.step_from_width(raw)
    }

    /// Iteration for an externally measured width; emits the output pulse.
    pub fn step_from_width(&mut self, raw: PulseWidth) -> Result<Tick> {
        let tick = self.state.advance(raw);
        self.iterations = self.iterations.saturating_add(1);

        if let Some(offset) = tick.calibrated {
            tracing::info!(offset, "calibration complete");
        }
        if let Some(t) = tick.transition {
            tracing::debug!(from = %t.from, to = %t.to, deviation = tick.deviation, "state transition");
        }
        tracing::trace!(
            raw = tick.raw.as_us(),
            output = tick.output.as_us(),
            state = %tick.state,
            burst = tick.burst,
            "tick"
        );

        self.indicators.apply(&tick.indicators);
        self.timer.emit(tick.output)?;
        Ok(tick)
    }

    /// Re-emit the next pulse unchanged; the limited LED shows whether it is at or above center.
    pub fn pass_pulse(&mut self) -> Result<PulseWidth> {
        let raw = self.timer.measure()?;
        self.indicators
            .show_limited(raw.as_us() >= self.state.control().center_us);
        self.timer.emit(raw)?;
        self.iterations = self.iterations.saturating_add(1);
        Ok(raw)
    }

    /// Copy the input level to the output and the limited LED.
    pub fn mirror_level(&mut self) -> Result<bool> {
        let level = self.timer.mirror_once()?;
        self.indicators.show_limited(level);
        Ok(level)
    }
}
