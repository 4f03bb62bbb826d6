//! Raspberry Pi GPIO lines backed by `rppal`.

use rppal::gpio::{Gpio, InputPin, IoPin, Level, Mode, OutputPin};
use servoscale_traits::{HalError, InputLine, OutputLine, PinMode, TriStateLine};
use tracing::debug;

use crate::error::{HwError, Result};

fn gpio_err(pin: u8, e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(format!("pin {pin}: {e}"))
}

pub struct GpioInput {
    pin: InputPin,
}

impl GpioInput {
    pub fn open(gpio: &Gpio, pin: u8) -> Result<Self> {
        let pin = gpio.get(pin).map_err(|e| gpio_err(pin, e))?.into_input();
        Ok(Self { pin })
    }
}

impl InputLine for GpioInput {
    #[inline(always)]
    fn read_input_line(&mut self) -> std::result::Result<bool, HalError> {
        Ok(self.pin.is_high())
    }
}

pub struct GpioOutput {
    pin: OutputPin,
}

impl GpioOutput {
    pub fn open(gpio: &Gpio, pin: u8) -> Result<Self> {
        // idle low between pulses
        let pin = gpio.get(pin).map_err(|e| gpio_err(pin, e))?.into_output_low();
        Ok(Self { pin })
    }
}

impl OutputLine for GpioOutput {
    #[inline(always)]
    fn set_output_line(&mut self, high: bool) -> std::result::Result<(), HalError> {
        self.pin.write(if high { Level::High } else { Level::Low });
        Ok(())
    }
}

/// Bidirectional pin; starts released so nothing is forced at boot.
pub struct GpioTriState {
    pin: IoPin,
}

impl GpioTriState {
    pub fn open(gpio: &Gpio, pin: u8) -> Result<Self> {
        let pin = gpio.get(pin).map_err(|e| gpio_err(pin, e))?.into_io(Mode::Input);
        Ok(Self { pin })
    }
}

impl OutputLine for GpioTriState {
    fn set_output_line(&mut self, high: bool) -> std::result::Result<(), HalError> {
        self.pin.write(if high { Level::High } else { Level::Low });
        Ok(())
    }
}

impl TriStateLine for GpioTriState {
    fn set_pin_mode(&mut self, mode: PinMode) -> std::result::Result<(), HalError> {
        self.pin.set_mode(match mode {
            PinMode::Input => Mode::Input,
            PinMode::Output => Mode::Output,
        });
        Ok(())
    }
}

/// BCM pin numbers for one servoscale board.
#[derive(Debug, Clone, Copy)]
pub struct PinMap {
    pub pulse_in: u8,
    pub pulse_out: u8,
    pub limited_led: Option<u8>,
    pub brake_light: Option<u8>,
    pub front_light: Option<u8>,
}

/// Every line of the board, opened and in its idle state.
pub struct GpioBoard {
    pub pulse_in: GpioInput,
    pub pulse_out: GpioOutput,
    pub limited_led: Option<GpioOutput>,
    pub brake_light: Option<GpioTriState>,
    pub front_light: Option<GpioOutput>,
}

impl GpioBoard {
    pub fn open(pins: &PinMap) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        let board = Self {
            pulse_in: GpioInput::open(&gpio, pins.pulse_in)?,
            pulse_out: GpioOutput::open(&gpio, pins.pulse_out)?,
            limited_led: pins
                .limited_led
                .map(|p| GpioOutput::open(&gpio, p))
                .transpose()?,
            brake_light: pins
                .brake_light
                .map(|p| GpioTriState::open(&gpio, p))
                .transpose()?,
            front_light: pins
                .front_light
                .map(|p| GpioOutput::open(&gpio, p))
                .transpose()?,
        };
        debug!(?pins, "gpio board opened");
        Ok(board)
    }
}
