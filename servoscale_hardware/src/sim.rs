//! Simulated lines driven by a shared `SimClock`.
//!
//! Each input poll costs a fixed amount of simulated time, which models the constant
//! per-iteration cost of a real busy-wait loop. Output pulses are recorded with the width
//! observed on the simulated timeline.

use std::sync::{Arc, Mutex};

use servoscale_traits::{HalError, InputLine, OutputLine, PinMode, SimClock, TriStateLine};

/// Nominal servo frame period (50 Hz).
pub const DEFAULT_FRAME_US: u64 = 20_000;
/// Simulated cost of one input poll.
pub const DEFAULT_POLL_COST_US: u64 = 1;

/// Input line replaying a scripted pulse train: one pulse per frame, then idle low forever.
#[derive(Debug, Clone)]
pub struct SimPulseInput {
    clock: SimClock,
    widths: Vec<u16>,
    frame_us: u64,
    lead_in_us: u64,
    poll_cost_us: u64,
}

impl SimPulseInput {
    /// Pulse `k` rises at `lead_in + k * frame` and lasts `widths[k]` microseconds.
    pub fn new(clock: SimClock, widths: impl Into<Vec<u16>>) -> Self {
        Self {
            clock,
            widths: widths.into(),
            frame_us: DEFAULT_FRAME_US,
            lead_in_us: DEFAULT_FRAME_US,
            poll_cost_us: DEFAULT_POLL_COST_US,
        }
    }

    pub fn with_frame_us(mut self, frame_us: u64) -> Self {
        self.frame_us = frame_us.max(1);
        self
    }

    pub fn with_lead_in_us(mut self, lead_in_us: u64) -> Self {
        self.lead_in_us = lead_in_us;
        self
    }

    pub fn with_poll_cost_us(mut self, poll_cost_us: u64) -> Self {
        self.poll_cost_us = poll_cost_us.max(1);
        self
    }

    /// Number of scripted pulses.
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Line level at simulated time `t_us`.
    pub fn level_at(&self, t_us: u64) -> bool {
        if t_us < self.lead_in_us {
            return false;
        }
        let since = t_us - self.lead_in_us;
        let k = (since / self.frame_us) as usize;
        match self.widths.get(k) {
            Some(&w) => since % self.frame_us < u64::from(w),
            None => false,
        }
    }
}

impl InputLine for SimPulseInput {
    fn read_input_line(&mut self) -> Result<bool, HalError> {
        let level = self.level_at(self.clock.elapsed_us());
        self.clock.advance_us(self.poll_cost_us);
        Ok(level)
    }
}

/// Shared record of pulse widths seen on a `SimPulseOutput`.
#[derive(Debug, Clone, Default)]
pub struct PulseLog(Arc<Mutex<Vec<u16>>>);

impl PulseLog {
    pub fn widths(&self) -> Vec<u16> {
        self.0.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<u16> {
        self.0.lock().ok().and_then(|g| g.last().copied())
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, width: u16) {
        if let Ok(mut g) = self.0.lock() {
            g.push(width);
        }
    }
}

/// Output line that measures each high period on the simulated timeline.
#[derive(Debug)]
pub struct SimPulseOutput {
    clock: SimClock,
    rose_at_us: Option<u64>,
    log: PulseLog,
}

impl SimPulseOutput {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            rose_at_us: None,
            log: PulseLog::default(),
        }
    }

    /// Handle for inspecting emitted widths after the line has been moved into a loop.
    pub fn log(&self) -> PulseLog {
        self.log.clone()
    }
}

impl OutputLine for SimPulseOutput {
    fn set_output_line(&mut self, high: bool) -> Result<(), HalError> {
        let now = self.clock.elapsed_us();
        if high {
            self.rose_at_us.get_or_insert(now);
        } else if let Some(rose) = self.rose_at_us.take() {
            let width = now.saturating_sub(rose).min(u64::from(u16::MAX)) as u16;
            self.log.push(width);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct LineState {
    level: bool,
    mode: PinMode,
    writes: u64,
}

/// Shared view of a `SimLine`.
#[derive(Debug, Clone)]
pub struct LineProbe(Arc<Mutex<LineState>>);

impl LineProbe {
    fn read(&self) -> LineState {
        self.0.lock().map(|g| *g).unwrap_or(LineState {
            level: false,
            mode: PinMode::Input,
            writes: 0,
        })
    }

    /// Last written level (meaningful only while the pin is an output).
    pub fn level(&self) -> bool {
        self.read().level
    }

    pub fn mode(&self) -> PinMode {
        self.read().mode
    }

    /// `None` when released to high impedance, otherwise the driven level.
    pub fn driven(&self) -> Option<bool> {
        let s = self.read();
        match s.mode {
            PinMode::Input => None,
            PinMode::Output => Some(s.level),
        }
    }

    pub fn writes(&self) -> u64 {
        self.read().writes
    }
}

/// Indicator line: plain output or tri-state pin.
#[derive(Debug)]
pub struct SimLine {
    state: Arc<Mutex<LineState>>,
}

impl SimLine {
    /// Push-pull output, initially low.
    pub fn new_output() -> Self {
        Self::with_mode(PinMode::Output)
    }

    /// Bidirectional pin, initially released.
    pub fn new_tristate() -> Self {
        Self::with_mode(PinMode::Input)
    }

    fn with_mode(mode: PinMode) -> Self {
        Self {
            state: Arc::new(Mutex::new(LineState {
                level: false,
                mode,
                writes: 0,
            })),
        }
    }

    pub fn probe(&self) -> LineProbe {
        LineProbe(self.state.clone())
    }
}

impl OutputLine for SimLine {
    fn set_output_line(&mut self, high: bool) -> Result<(), HalError> {
        if let Ok(mut s) = self.state.lock() {
            s.level = high;
            s.writes = s.writes.saturating_add(1);
        }
        Ok(())
    }
}

impl TriStateLine for SimLine {
    fn set_pin_mode(&mut self, mode: PinMode) -> Result<(), HalError> {
        if let Ok(mut s) = self.state.lock() {
            s.mode = mode;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servoscale_traits::Clock;

    #[test]
    fn pulse_train_levels_follow_script() {
        let clock = SimClock::new();
        let input = SimPulseInput::new(clock, [1500u16, 1000]);
        assert!(!input.level_at(0));
        assert!(input.level_at(20_000));
        assert!(input.level_at(21_499));
        assert!(!input.level_at(21_500));
        assert!(input.level_at(40_999));
        assert!(!input.level_at(41_000));
        // Script exhausted: idle low
        assert!(!input.level_at(60_000));
    }

    #[test]
    fn faster_frame_rate_packs_pulses_closer() {
        let input = SimPulseInput::new(SimClock::new(), [1500u16, 1500])
            .with_frame_us(10_000)
            .with_lead_in_us(0);
        assert_eq!(input.len(), 2);
        assert!(input.level_at(0));
        assert!(!input.level_at(1_500));
        assert!(input.level_at(10_000));
        assert!(!input.level_at(20_000));
    }

    #[test]
    fn each_poll_costs_simulated_time() {
        let clock = SimClock::new();
        let mut input = SimPulseInput::new(clock.clone(), [1500u16]).with_poll_cost_us(3);
        for _ in 0..4 {
            input.read_input_line().unwrap();
        }
        assert_eq!(clock.elapsed_us(), 12);
    }

    #[test]
    fn output_records_high_time() {
        let clock = SimClock::new();
        let mut out = SimPulseOutput::new(clock.clone());
        let log = out.log();
        out.set_output_line(true).unwrap();
        clock.delay_us(1_234);
        out.set_output_line(false).unwrap();
        // Low without a preceding high records nothing
        out.set_output_line(false).unwrap();
        assert_eq!(log.widths(), vec![1_234]);
    }

    #[test]
    fn tristate_line_reports_release() {
        let mut pin = SimLine::new_tristate();
        let probe = pin.probe();
        assert_eq!(probe.driven(), None);
        pin.set_pin_mode(PinMode::Output).unwrap();
        pin.set_output_line(true).unwrap();
        assert_eq!(probe.driven(), Some(true));
        pin.set_pin_mode(PinMode::Input).unwrap();
        assert_eq!(probe.driven(), None);
        assert_eq!(probe.writes(), 1);
    }
}
