use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Poll `read` until it reports `level`, or fail with `SignalLost` once `timeout` expires.
/// Sleeps `poll_interval` between reads; use a zero interval to spin.
pub fn wait_for_level_with_timeout(
    mut read: impl FnMut() -> Result<bool>,
    level: bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while read()? != level {
        if Instant::now() >= deadline {
            return Err(HwError::SignalLost);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
    Ok(())
}

/// Wait for one full low-high-low cycle on the line, proving pulses arrive.
pub fn probe_pulse(
    mut read: impl FnMut() -> Result<bool>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let remaining = |deadline: Instant| deadline.saturating_duration_since(Instant::now());
    wait_for_level_with_timeout(&mut read, false, remaining(deadline), poll_interval)?;
    wait_for_level_with_timeout(&mut read, true, remaining(deadline), poll_interval)?;
    wait_for_level_with_timeout(&mut read, false, remaining(deadline), poll_interval)
}
