//! Pulse measurement and regeneration.
//!
//! `measure` polls the input line through the three edges of one pulse and times
//! the high phase on the [`Clock`]. `emit` drives the output high for the requested
//! width using the clock's busy-wait. Both rely on the clock having a constant
//! per-poll cost so widths stay within a few microseconds.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use servoscale_traits::{Clock, InputLine, OutputLine};

use crate::error::{Result, ServoError};
use crate::hw_error::map_hw_error;
use crate::types::PulseWidth;

pub struct PulseTimer<I: InputLine, O: OutputLine> {
    input: I,
    output: O,
    clock: Arc<dyn Clock + Send + Sync>,
    timeout: Option<Duration>,
}

impl<I: InputLine, O: OutputLine> core::fmt::Debug for PulseTimer<I, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PulseTimer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<I: InputLine, O: OutputLine> PulseTimer<I, O> {
    /// `timeout = None` blocks forever when no pulse arrives.
    pub fn new(input: I, output: O, clock: Arc<dyn Clock + Send + Sync>, timeout: Option<Duration>) -> Self {
        Self {
            input,
            output,
            clock,
            timeout,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Width of the next complete pulse. A pulse already in progress is skipped.
    pub fn measure(&mut self) -> Result<PulseWidth> {
        let start = self.clock.now();
        self.wait_for(false, start)?;
        self.wait_for(true, start)?;
        let rose = self.clock.now();
        self.wait_for(false, start)?;
        Ok(PulseWidth::from_us_saturating(self.clock.us_since(rose)))
    }

    /// Drive a pulse of `width`; zero yields a near-zero pulse.
    pub fn emit(&mut self, width: PulseWidth) -> Result<()> {
        self.write(true)?;
        self.clock.delay_us(u32::from(width.as_us()));
        self.write(false)
    }

    /// Copy the current input level to the output and return it.
    pub fn mirror_once(&mut self) -> Result<bool> {
        let level = self.read()?;
        self.write(level)?;
        Ok(level)
    }

    #[inline]
    fn wait_for(&mut self, level: bool, start: Instant) -> Result<()> {
        while self.read()? != level {
            if let Some(limit) = self.timeout {
                let waited = self.clock.now().saturating_duration_since(start);
                if waited >= limit {
                    let waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX);
                    return Err(eyre::Report::new(ServoError::SignalLost { waited_ms }));
                }
            }
        }
        Ok(())
    }

    #[inline]
    fn read(&mut self) -> Result<bool> {
        self.input
            .read_input_line()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading pulse input")
    }

    #[inline]
    fn write(&mut self, high: bool) -> Result<()> {
        self.output
            .set_output_line(high)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("driving pulse output")
    }
}
