//! CPU Clock.
use std::{
    thread,
    time::{Duration, Instant},
};

/// Timer to synchronize thread with the software clock of the virtual CPU.
///
/// It is designed to work with the yielding cooperative pattern
/// of the runner loop. When the VM yields control back to the
/// caller, time elapses until it is resumed. Once the runner
/// is resumed, the elapsed time is taken into account when determining
/// the next cycle.
pub struct Clock {
    start: Instant,
    interval: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    ///
    /// A zero interval makes every cycle elapse immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            start: Instant::now(),
            interval,
        }
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        loop {
            if self.start.elapsed() < self.interval {
                // Sleep does not have enough resolution, and causes
                // the clock to run at 30 FPS.
                //
                // Spinning a loop causes high CPU usage and fan madness.
                //
                // Yielding in a loop is the best alternative.
                thread::yield_now();
            } else {
                // Reset back to zero, rather than trying to catch up.
                //
                // If the runner was paused, and a large amount of time
                // has elapsed until it is resumed, it should simply
                // continue at the next cycle running at its usual speed.
                self.reset();
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_interval_does_not_block() {
        let mut clock = Clock::new(Duration::ZERO);
        clock.wait();
        clock.wait();
    }

    #[test]
    fn test_wait_for_interval() {
        let interval = Duration::from_millis(5);

        let start = Instant::now();
        let mut clock = Clock::new(interval);
        clock.wait();
        assert!(start.elapsed() >= interval);

        let start = Instant::now();
        clock.reset();
        clock.wait();
        assert!(start.elapsed() >= interval);
    }
}
