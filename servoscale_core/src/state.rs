//! Driving-state machine with exit debounce.

use crate::config::ControlCfg;
use crate::types::{Deviation, DrivingState, Transition};

/// Iterations spent in the current state, saturating at 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebounceCounter(u8);

impl DebounceCounter {
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn reset(&mut self) {
        self.0 = 0;
    }

    #[inline]
    pub fn advance(&mut self) {
        self.0 = self.0.saturating_add(1);
    }
}

/// Transition rule for every state but `Calibrating`, which the calibrator owns.
///
/// `d` is the bias-corrected deviation and `debounce` the iterations already spent
/// in `state`. Centered input only leaves Forward, Braking or Reverse once
/// `debounce >= exit_debounce`.
pub fn next_state(state: DrivingState, d: Deviation, debounce: u8, cfg: &ControlCfg) -> DrivingState {
    use DrivingState::*;

    let margin = cfg.margin();
    let ahead = d >= margin;
    let back = d <= -margin;
    let settled = debounce >= cfg.exit_debounce;

    match state {
        Calibrating => Calibrating,
        Idle if ahead => Forward,
        Idle if back => Reverse,
        Forward if back => Braking,
        Forward if !ahead && settled => Stopped,
        Stopped if ahead => Forward,
        Stopped if back => Braking,
        Braking | Reverse if ahead => Forward,
        Braking | Reverse if !back && settled => Idle,
        s => s,
    }
}

/// Owns the active state and its debounce counter.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: DrivingState,
    debounce: DebounceCounter,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> DrivingState {
        self.state
    }

    #[inline]
    pub fn debounce(&self) -> u8 {
        self.debounce.get()
    }

    /// Switch to `to`, resetting the counter. Re-entering the current state is a no-op.
    pub fn enter(&mut self, to: DrivingState) -> Option<Transition> {
        if to == self.state {
            return None;
        }
        let from = self.state;
        self.state = to;
        self.debounce.reset();
        Some(Transition { from, to })
    }

    /// Apply the transition table to one deviation sample.
    pub fn step(&mut self, d: Deviation, cfg: &ControlCfg) -> Option<Transition> {
        let next = next_state(self.state, d, self.debounce.get(), cfg);
        self.enter(next)
    }

    /// End-of-iteration bookkeeping; runs on every iteration including a transition.
    #[inline]
    pub fn advance(&mut self) {
        self.debounce.advance();
    }
}
