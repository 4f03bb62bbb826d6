use std::sync::atomic::{AtomicBool, Ordering};

use servoscale_traits::{InputLine, OutputLine};

use crate::core::ServoCore;
use crate::error::Result;
use crate::types::DrivingState;

/// Loop bounds and pacing.
#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    /// Stop after this many iterations; `None` runs until shutdown or error.
    pub max_iterations: Option<u64>,
    /// Expected receiver frame rate, used to count missed frames.
    pub frame_hz: u32,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_iterations: None,
            frame_hz: crate::config::FRAME_HZ,
        }
    }
}

/// Why a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    IterationLimit,
    Shutdown,
}

/// Iteration timing collected by the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    pub transitions: u64,
    /// Iterations that took longer than one and a half frame periods.
    pub missed_frames: u64,
    pub min_period_us: u64,
    pub max_period_us: u64,
    pub total_period_us: u64,
}

impl LoopStats {
    pub fn mean_period_us(&self) -> u64 {
        self.total_period_us.checked_div(self.iterations).unwrap_or(0)
    }

    fn record(&mut self, period_us: u64, overrun_us: u64) {
        if self.iterations == 0 || period_us < self.min_period_us {
            self.min_period_us = period_us;
        }
        self.max_period_us = self.max_period_us.max(period_us);
        self.total_period_us = self.total_period_us.saturating_add(period_us);
        self.iterations += 1;
        if period_us > overrun_us {
            self.missed_frames += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: LoopStats,
    pub final_state: DrivingState,
    pub offset: i32,
    pub stopped_by: StopReason,
}

/// Overrun threshold for missed-frame counting: 1.5 frame periods.
#[inline]
fn overrun_threshold_us(frame_hz: u32) -> u64 {
    let p = crate::util::period_us(frame_hz);
    p.saturating_add(p / 2)
}

#[inline]
fn should_stop(iterations: u64, max: Option<u64>, shutdown: Option<&AtomicBool>) -> Option<StopReason> {
    if max.is_some_and(|m| iterations >= m) {
        return Some(StopReason::IterationLimit);
    }
    if shutdown.is_some_and(|f| f.load(Ordering::Relaxed)) {
        return Some(StopReason::Shutdown);
    }
    None
}

/// Run the control loop until the iteration limit, a shutdown request, or an error.
///
/// Errors (signal lost, pulse line failures) end the run; indicator failures do not.
pub fn run<I, O>(core: &mut ServoCore<I, O>, params: &RunParams, shutdown: Option<&AtomicBool>) -> Result<RunSummary>
where
    I: InputLine,
    O: OutputLine,
{
    let overrun_us = overrun_threshold_us(params.frame_hz);
    let clock = core.clock().clone();
    let mut stats = LoopStats::default();
    let mut last = clock.now();

    tracing::info!(
        max_iterations = ?params.max_iterations,
        signal_timeout_ms = ?core.signal_timeout().map(|d| d.as_millis()),
        "servoscale start"
    );

    let stopped_by = loop {
        if let Some(reason) = should_stop(stats.iterations, params.max_iterations, shutdown) {
            break reason;
        }
        let tick = match core.step() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, iterations = stats.iterations, "servoscale loop failed");
                return Err(e);
            }
        };
        let period_us = clock.us_since(last);
        last = clock.now();
        stats.record(period_us, overrun_us);
        if tick.transition.is_some() {
            stats.transitions += 1;
        }
        if period_us > overrun_us {
            tracing::debug!(period_us, "frame overrun");
        }
    };

    let summary = RunSummary {
        final_state: core.state(),
        offset: core.offset(),
        stats,
        stopped_by,
    };
    tracing::info!(
        iterations = summary.stats.iterations,
        missed_frames = summary.stats.missed_frames,
        state = %summary.final_state,
        offset = summary.offset,
        reason = ?summary.stopped_by,
        "servoscale stop"
    );
    Ok(summary)
}

/// Diagnostic passthrough flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughMode {
    /// Measure each pulse and re-emit it unchanged.
    Pulse,
    /// Mirror the raw input level continuously.
    Level,
}

/// Run a passthrough loop; returns the number of iterations (pulses or polls).
pub fn run_passthrough<I, O>(
    core: &mut ServoCore<I, O>,
    mode: PassthroughMode,
    max_iterations: Option<u64>,
    shutdown: Option<&AtomicBool>,
) -> Result<u64>
where
    I: InputLine,
    O: OutputLine,
{
    tracing::info!(?mode, ?max_iterations, "passthrough start");
    let mut n = 0u64;
    while should_stop(n, max_iterations, shutdown).is_none() {
        match mode {
            PassthroughMode::Pulse => {
                let w = core.pass_pulse()?;
                tracing::trace!(width = w.as_us(), "pass");
            }
            PassthroughMode::Level => {
                core.mirror_level()?;
            }
        }
        n += 1;
    }
    tracing::info!(iterations = n, "passthrough stop");
    Ok(n)
}
