use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction for pulse timing across the stack.
///
/// - now(): returns a monotonic Instant
/// - sleep(): coarse sleep for the provided duration (implementations may simulate)
/// - delay_us(): precise busy-wait used to shape output pulses
///
/// Implementations of `delay_us` must have a constant, measured cost per call so that
/// emitted pulse widths stay within a few microseconds of the request.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Busy-wait for `us` microseconds.
    fn delay_us(&self, us: u32) {
        self.sleep(Duration::from_micros(u64::from(us)));
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }

    /// Microseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn us_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_micros().min(u128::from(u64::MAX)) as u64
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }

    /// Spin on the monotonic clock; `thread::sleep` overshoots by tens of microseconds.
    #[inline]
    fn delay_us(&self, us: u32) {
        let deadline = Instant::now() + Duration::from_micros(u64::from(us));
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

#[cfg(any(test, feature = "sim"))]
pub mod sim_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic clock whose time only moves when something advances it.
    ///
    /// now() = origin + offset
    /// sleep(d) and delay_us() advance internal time without actually sleeping.
    /// Clones share the same timeline, so simulated lines can advance it per poll.
    #[derive(Debug, Clone)]
    pub struct SimClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for SimClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SimClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Advance the clock by whole microseconds.
        pub fn advance_us(&self, us: u64) {
            self.advance(Duration::from_micros(us));
        }

        /// Set the absolute offset relative to origin.
        pub fn set_offset(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = d;
            }
        }

        /// Simulated time since creation, in microseconds.
        pub fn elapsed_us(&self) -> u64 {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            off.as_micros().min(u128::from(u64::MAX)) as u64
        }
    }

    impl Clock for SimClock {
        fn now(&self) -> Instant {
            let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
            self.origin + off
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }

        fn delay_us(&self, us: u32) {
            self.advance_us(u64::from(us));
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_delay_waits_at_least_requested() {
        let c = MonotonicClock::new();
        let epoch = c.now();
        c.delay_us(200);
        assert!(c.us_since(epoch) >= 200);
    }

    #[test]
    fn since_saturates_for_future_epoch() {
        let c = MonotonicClock::new();
        let future = c.now() + Duration::from_secs(5);
        assert_eq!(c.ms_since(future), 0);
        assert_eq!(c.us_since(future), 0);
    }
}
