pub mod error;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use sim::{LineProbe, PulseLog, SimLine, SimPulseInput, SimPulseOutput};

use servoscale_traits::SimClock;

/// A complete simulated board sharing one timeline.
pub struct SimBoard {
    pub clock: SimClock,
    pub pulse_in: SimPulseInput,
    pub pulse_out: SimPulseOutput,
    pub limited_led: SimLine,
    pub brake_light: SimLine,
    pub front_light: SimLine,
}

impl SimBoard {
    /// Board whose receiver plays `widths` once, one pulse per 20ms frame.
    pub fn new(widths: impl Into<Vec<u16>>) -> Self {
        let clock = SimClock::new();
        Self {
            pulse_in: SimPulseInput::new(clock.clone(), widths),
            pulse_out: SimPulseOutput::new(clock.clone()),
            limited_led: SimLine::new_output(),
            brake_light: SimLine::new_tristate(),
            front_light: SimLine::new_output(),
            clock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servoscale_traits::{Clock, InputLine, OutputLine};

    #[test]
    fn sim_board_shares_one_clock() {
        let mut board = SimBoard::new([1500u16]);
        let log = board.pulse_out.log();
        let epoch = board.clock.now();
        board.pulse_in.read_input_line().unwrap();
        board.pulse_out.set_output_line(true).unwrap();
        board.clock.delay_us(10);
        board.pulse_out.set_output_line(false).unwrap();
        assert_eq!(board.clock.us_since(epoch), 11);
        assert_eq!(log.last(), Some(10));
    }
}
