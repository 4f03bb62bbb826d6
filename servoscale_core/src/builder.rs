//! Type-state builder for `Servoscale` and generic `build_servo_core` constructor.
//!
//! The builder enforces at compile time that the pulse input and output lines are
//! provided before `build()` is available. `try_build()` is always available for
//! dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use servoscale_traits::{Clock, InputLine, MonotonicClock, OutputLine, TriStateLine};

use crate::config::{CalibrationCfg, ControlCfg, MAX_CALIBRATION_ITERATIONS, Timeouts};
use crate::controller::ControllerState;
use crate::core::ServoCore;
use crate::error::{BuildError, Result};
use crate::indicator::IndicatorDriver;
use crate::pulse::PulseTimer;
use crate::status::Tick;
use crate::types::{DrivingState, PulseWidth};

pub type BoxedInputLine = Box<dyn InputLine + Send>;
pub type BoxedPulseOutput = Box<dyn OutputLine + Send>;

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Boxed controller for callers that pick the backend at runtime.
pub struct Servoscale {
    pub(crate) inner: ServoCore<BoxedInputLine, BoxedPulseOutput>,
}

impl core::fmt::Debug for Servoscale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.inner, f)
    }
}

impl Servoscale {
    /// Start building a Servoscale.
    pub fn builder() -> ServoscaleBuilder<Missing, Missing> {
        ServoscaleBuilder::default()
    }

    pub fn state(&self) -> DrivingState {
        self.inner.state()
    }

    pub fn offset(&self) -> i32 {
        self.inner.offset()
    }

    pub fn iterations(&self) -> u64 {
        self.inner.iterations()
    }

    /// One iteration of the control loop.
    pub fn step(&mut self) -> Result<Tick> {
        self.inner.step()
    }

    pub fn step_from_width(&mut self, raw: PulseWidth) -> Result<Tick> {
        self.inner.step_from_width(raw)
    }

    pub fn pass_pulse(&mut self) -> Result<PulseWidth> {
        self.inner.pass_pulse()
    }

    pub fn mirror_level(&mut self) -> Result<bool> {
        self.inner.mirror_level()
    }

    /// Borrow the underlying core, e.g. for `runner::run`.
    pub fn core_mut(&mut self) -> &mut ServoCore<BoxedInputLine, BoxedPulseOutput> {
        &mut self.inner
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Servoscale`. All fields are validated on `build()`.
pub struct ServoscaleBuilder<I, O> {
    input: Option<BoxedInputLine>,
    output: Option<BoxedPulseOutput>,
    indicators: IndicatorDriver,
    control: Option<ControlCfg>,
    calibration: Option<CalibrationCfg>,
    timeouts: Option<Timeouts>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _i: PhantomData<I>,
    _o: PhantomData<O>,
}

impl Default for ServoscaleBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            indicators: IndicatorDriver::new(),
            control: None,
            calibration: None,
            timeouts: None,
            clock: None,
            _i: PhantomData,
            _o: PhantomData,
        }
    }
}

/// Validate configuration and construct a `ServoCore`.
///
/// Single source of truth for validation, shared by `ServoscaleBuilder::try_build()`
/// and `build_servo_core()`.
fn validate_and_build<I: InputLine, O: OutputLine>(
    input: I,
    output: O,
    indicators: IndicatorDriver,
    control: ControlCfg,
    calibration: CalibrationCfg,
    timeouts: Timeouts,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<ServoCore<I, O>> {
    // ── Validation ───────────────────────────────────────────────────────────
    if control.margin_us == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "margin_us must be > 0",
        )));
    }
    if control.max_burst == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "max_burst must be > 0",
        )));
    }
    if control.forward_scale.den == 0 || control.reverse_scale.den == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "scale denominators must be non-zero",
        )));
    }
    if calibration.samples == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "calibration samples must be > 0",
        )));
    }
    if calibration.iterations() > MAX_CALIBRATION_ITERATIONS {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "calibration settle_samples + samples must be <= 256",
        )));
    }
    if let (Some(min), Some(max)) = (control.output_limits.min_us, control.output_limits.max_us) {
        if min > max {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "output min_us must be <= max_us",
            )));
        }
    }
    if timeouts.signal_lost_ms == Some(0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "signal_lost_ms must be >= 1 when set",
        )));
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let timeout = timeouts.signal_lost_ms.map(Duration::from_millis);

    Ok(ServoCore::new(
        PulseTimer::new(input, output, clock, timeout),
        indicators,
        ControllerState::new(control, calibration),
    ))
}

impl<I, O> ServoscaleBuilder<I, O> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Servoscale> {
        let input = self
            .input
            .ok_or_else(|| eyre::Report::new(BuildError::MissingInput))?;
        let output = self
            .output
            .ok_or_else(|| eyre::Report::new(BuildError::MissingOutput))?;

        let inner = validate_and_build(
            input,
            output,
            self.indicators,
            self.control.unwrap_or_default(),
            self.calibration.unwrap_or_default(),
            self.timeouts.unwrap_or_default(),
            self.clock,
        )?;

        Ok(Servoscale { inner })
    }
}

/// Chainable setters that do not affect type-state.
impl<I, O> ServoscaleBuilder<I, O> {
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = Some(control);
        self
    }
    pub fn with_calibration(mut self, calibration: CalibrationCfg) -> Self {
        self.calibration = Some(calibration);
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
    pub fn with_limited_led(mut self, line: impl OutputLine + Send + 'static) -> Self {
        self.indicators = self.indicators.with_limited_led(line);
        self
    }
    pub fn with_brake_light(mut self, line: impl TriStateLine + Send + 'static) -> Self {
        self.indicators = self.indicators.with_brake_light(line);
        self
    }
    pub fn with_front_light(mut self, line: impl OutputLine + Send + 'static) -> Self {
        self.indicators = self.indicators.with_front_light(line);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<O> ServoscaleBuilder<Missing, O> {
    pub fn with_input(self, line: impl InputLine + Send + 'static) -> ServoscaleBuilder<Set, O> {
        ServoscaleBuilder {
            input: Some(Box::new(line)),
            output: self.output,
            indicators: self.indicators,
            control: self.control,
            calibration: self.calibration,
            timeouts: self.timeouts,
            clock: self.clock,
            _i: PhantomData,
            _o: PhantomData,
        }
    }
}

impl<I> ServoscaleBuilder<I, Missing> {
    pub fn with_output(self, line: impl OutputLine + Send + 'static) -> ServoscaleBuilder<I, Set> {
        ServoscaleBuilder {
            input: self.input,
            output: Some(Box::new(line)),
            indicators: self.indicators,
            control: self.control,
            calibration: self.calibration,
            timeouts: self.timeouts,
            clock: self.clock,
            _i: PhantomData,
            _o: PhantomData,
        }
    }
}

impl ServoscaleBuilder<Set, Set> {
    /// Validate and build. Only available when both pulse lines are set.
    pub fn build(self) -> Result<Servoscale> {
        self.try_build()
    }
}

/// Build a generic, statically-dispatched `ServoCore` from concrete lines.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_servo_core<I, O>(
    input: I,
    output: O,
    indicators: IndicatorDriver,
    control: ControlCfg,
    calibration: CalibrationCfg,
    timeouts: Timeouts,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<ServoCore<I, O>>
where
    I: InputLine,
    O: OutputLine,
{
    validate_and_build(input, output, indicators, control, calibration, timeouts, clock)
}
