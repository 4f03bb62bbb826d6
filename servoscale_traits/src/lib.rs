pub mod clock;

pub use clock::{Clock, MonotonicClock};
#[cfg(feature = "sim")]
pub use clock::sim_clock::SimClock;

/// Error type crossing the hardware boundary.
pub type HalError = Box<dyn std::error::Error + Send + Sync>;

/// Direction of a bidirectional pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// High impedance; the pin does not drive the line.
    Input,
    /// Push-pull output driving the last written level.
    Output,
}

/// A line sampled by polling.
pub trait InputLine {
    fn read_input_line(&mut self) -> Result<bool, HalError>;
}

/// A line driven high or low.
pub trait OutputLine {
    fn set_output_line(&mut self, high: bool) -> Result<(), HalError>;
}

/// A pin that can be released to high impedance or driven as an output.
pub trait TriStateLine: OutputLine {
    fn set_pin_mode(&mut self, mode: PinMode) -> Result<(), HalError>;
}

impl<T: InputLine + ?Sized> InputLine for Box<T> {
    fn read_input_line(&mut self) -> Result<bool, HalError> {
        (**self).read_input_line()
    }
}

impl<T: OutputLine + ?Sized> OutputLine for Box<T> {
    fn set_output_line(&mut self, high: bool) -> Result<(), HalError> {
        (**self).set_output_line(high)
    }
}

impl<T: TriStateLine + ?Sized> TriStateLine for Box<T> {
    fn set_pin_mode(&mut self, mode: PinMode) -> Result<(), HalError> {
        (**self).set_pin_mode(mode)
    }
}
