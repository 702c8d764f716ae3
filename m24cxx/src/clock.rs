//! Monotonic time source for write cycle tracking.

use core::time::Duration;

/// A monotonic clock.
///
/// The driver only compares two readings, so the origin is arbitrary. Readings
/// must never go backwards.
///
/// Any `Fn() -> Duration` is a clock, which makes it easy to plug in a
/// platform timer:
///
/// ```ignore
/// let clock = || Duration::from_micros(timer.now().ticks());
/// let eeprom = M24C64::new(i2c, clock, 0x50, Config::default())?;
/// ```
pub trait Clock {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;
}

impl<F> Clock for F
where
    F: Fn() -> Duration,
{
    fn now(&self) -> Duration {
        self()
    }
}

/// Clock backed by [`std::time::Instant`].
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Create a clock whose origin is the current instant
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
