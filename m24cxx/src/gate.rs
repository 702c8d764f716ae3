//! Write cycle tracking.
//!
//! After a write burst the device commits the data internally and ignores the
//! bus until it is done (tW, at most 5 ms on the M24C64). Every transaction
//! issued in that window would be NACKed, so the engine waits here first.
//!
//! The wait is a spin with an early exit: the device is probed on every
//! iteration and the wait ends as soon as it acknowledges again, or once the
//! configured write cycle time has passed, whichever comes first.

use core::time::Duration;

use crate::Clock;

#[derive(Debug)]
pub(crate) struct WriteCycle {
    duration: Duration,
    started: Option<Duration>,
}

impl WriteCycle {
    pub(crate) const fn new(duration: Duration) -> Self {
        Self {
            duration,
            started: None,
        }
    }

    /// Record the end of a write burst
    pub(crate) fn start<C: Clock>(&mut self, clock: &C) {
        self.started = Some(clock.now());
    }

    /// Whether a write cycle may still be running
    pub(crate) fn is_pending(&self) -> bool {
        self.started.is_some()
    }

    /// Block until the current write cycle has ended.
    ///
    /// `probe` returns true when the device acknowledges. Returns immediately
    /// when no write happened since the last wait.
    pub(crate) fn wait<C: Clock>(&mut self, clock: &C, mut probe: impl FnMut() -> bool) {
        let Some(started) = self.started.take() else {
            return;
        };

        while clock.now().saturating_sub(started) < self.duration {
            if probe() {
                trace!("write cycle ended early");
                return;
            }
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;

    const TW: Duration = Duration::from_millis(5);

    #[test]
    fn test_no_wait_without_write() {
        let clock = ManualClock::new();
        let mut cycle = WriteCycle::new(TW);
        let mut probes = 0;

        cycle.wait(&clock, || {
            probes += 1;
            true
        });

        assert_eq!(probes, 0);
        assert_eq!(clock.peek(), Duration::ZERO);
    }

    #[test]
    fn test_exits_on_first_ack() {
        let clock = ManualClock::with_tick(Duration::from_micros(100));
        let mut cycle = WriteCycle::new(TW);
        cycle.start(&clock);

        let mut probes = 0;
        cycle.wait(&clock, || {
            probes += 1;
            probes == 3
        });

        assert_eq!(probes, 3);
        assert!(clock.peek() < TW);
        assert!(!cycle.is_pending());
    }

    #[test]
    fn test_waits_full_cycle_without_ack() {
        let clock = ManualClock::with_tick(Duration::from_micros(100));
        let mut cycle = WriteCycle::new(TW);
        cycle.start(&clock);
        let started = clock.peek();

        cycle.wait(&clock, || false);

        assert!(clock.peek() - started >= TW);
        assert!(!cycle.is_pending());
    }

    #[test]
    fn test_elapsed_cycle_needs_no_probe() {
        let clock = ManualClock::new();
        let mut cycle = WriteCycle::new(TW);
        cycle.start(&clock);
        clock.advance(Duration::from_millis(6));

        let mut probes = 0;
        cycle.wait(&clock, || {
            probes += 1;
            true
        });

        assert_eq!(probes, 0);
    }
}
