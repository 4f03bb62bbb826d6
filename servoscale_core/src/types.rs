//! Domain value types shared across the control loop.

use core::fmt;

/// Signed distance from the pulse center, in microseconds.
pub type Deviation = i32;

/// Width of one servo pulse in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PulseWidth(u16);

impl PulseWidth {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn from_us(us: u16) -> Self {
        Self(us)
    }

    #[inline]
    pub const fn as_us(self) -> u16 {
        self.0
    }

    /// Saturating conversion from a wide microsecond count.
    #[inline]
    pub fn from_us_saturating(us: u64) -> Self {
        Self(u16::try_from(us).unwrap_or(u16::MAX))
    }

    #[inline]
    pub fn deviation_from(self, center_us: u16) -> Deviation {
        i32::from(self.0) - i32::from(center_us)
    }

    /// `center + d`, saturating to `[0, u16::MAX]`.
    #[inline]
    pub fn from_deviation(center_us: u16, d: Deviation) -> Self {
        let us = i32::from(center_us).saturating_add(d);
        Self(us.clamp(0, i32::from(u16::MAX)) as u16)
    }
}

impl fmt::Display for PulseWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Integer scale factor applied as `d * num / den`, truncating toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    pub num: i32,
    pub den: i32,
}

impl Ratio {
    pub const IDENTITY: Self = Self { num: 1, den: 1 };

    #[inline]
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    #[inline]
    pub fn apply(self, d: Deviation) -> Deviation {
        d.saturating_mul(self.num).checked_div(self.den).unwrap_or(d)
    }
}

/// Driving mode derived from the commanded throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrivingState {
    /// Boot-time bias measurement; the only initial state.
    #[default]
    Calibrating,
    Idle,
    Reverse,
    Forward,
    /// Throttle released after driving forward; reverse is locked out until braking ends.
    Stopped,
    Braking,
}

impl DrivingState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calibrating => "calibrating",
            Self::Idle => "idle",
            Self::Reverse => "reverse",
            Self::Forward => "forward",
            Self::Stopped => "stopped",
            Self::Braking => "braking",
        }
    }
}

impl fmt::Display for DrivingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Brake/rear light pin state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrakeLight {
    /// High impedance; neither lamp is forced.
    #[default]
    Released,
    /// Driven high: brake lamps.
    High,
    /// Driven low: reverse lamp.
    Low,
}

/// Indicator outputs derived in one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndicatorState {
    pub front_light: bool,
    pub brake: BrakeLight,
    pub limited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: DrivingState,
    pub to: DrivingState,
}
