//! Per-state output scaling with a short full-throttle allowance.

use crate::config::ControlCfg;
use crate::types::{Deviation, DrivingState};

/// Forward dwell used to grant, then revoke, a full-throttle burst.
///
/// Counts up while in Forward and is pinned at `2 * max_burst` once it reaches
/// `max_burst`, so the same number of non-forward iterations must pass before
/// another burst is allowed. Decays toward zero outside Forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BurstCounter(i16);

impl BurstCounter {
    #[inline]
    pub const fn get(self) -> i16 {
        self.0
    }

    /// Count one Forward iteration; returns whether the allowance is exhausted.
    #[inline]
    pub fn charge(&mut self, max_burst: u8) -> bool {
        let max = i16::from(max_burst);
        self.0 = self.0.saturating_add(1);
        if self.0 >= max {
            self.0 = max.saturating_mul(2);
        }
        self.0 >= max
    }

    #[inline]
    pub fn decay(&mut self) {
        self.0 = (self.0 - 1).max(0);
    }
}

/// Output deviation and whether it was attenuated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaled {
    pub deviation: Deviation,
    pub limited: bool,
}

/// Scale `d` for `state`. Only Forward and Reverse attenuate; Calibrating reports
/// `limited` as the syncing indicator without touching the deviation.
pub fn scale(state: DrivingState, d: Deviation, burst: &mut BurstCounter, cfg: &ControlCfg) -> Scaled {
    match state {
        DrivingState::Forward => {
            let exhausted = burst.charge(cfg.max_burst);
            if d < i32::from(cfg.fwd_full_us) || exhausted {
                Scaled {
                    deviation: cfg.forward_scale.apply(d),
                    limited: true,
                }
            } else {
                Scaled {
                    deviation: d,
                    limited: false,
                }
            }
        }
        DrivingState::Reverse => {
            burst.decay();
            Scaled {
                deviation: cfg.reverse_scale.apply(d),
                limited: true,
            }
        }
        DrivingState::Calibrating => Scaled {
            deviation: d,
            limited: true,
        },
        DrivingState::Idle | DrivingState::Stopped | DrivingState::Braking => {
            burst.decay();
            Scaled {
                deviation: d,
                limited: false,
            }
        }
    }
}
