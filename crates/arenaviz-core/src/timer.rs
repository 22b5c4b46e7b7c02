//! Monotonic stopwatch used for tick and broadcast pacing.
//!
//! Both paced loops follow the same pattern: start the timer, do the
//! work, stop the timer, sleep whatever remains of the budget. The timer
//! is deliberately dumb -- it measures, it never sleeps.

use std::time::{Duration, Instant};

/// A monotonic stopwatch.
///
/// A freshly created timer is stopped with zero elapsed time. While
/// running, [`elapsed`](Self::elapsed) measures from the last
/// [`start`](Self::start); once [`stop`](Self::stop)ped, the elapsed
/// value is frozen until the next start or reset.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
    end: Instant,
    running: bool,
}

impl Timer {
    /// Create a stopped timer with zero elapsed time.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            end: now,
            running: false,
        }
    }

    /// Start (or restart) the stopwatch from zero.
    pub fn start(&mut self) {
        self.start = Instant::now();
        self.end = self.start;
        self.running = true;
    }

    /// Stop the stopwatch, freezing the elapsed time.
    pub fn stop(&mut self) {
        self.end = Instant::now();
        self.running = false;
    }

    /// Return the timer to its initial stopped, zero-elapsed state.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.end = now;
        self.running = false;
    }

    /// Elapsed time: since start if running, else between start and stop.
    pub fn elapsed(&self) -> Duration {
        if self.running {
            self.start.elapsed()
        } else {
            self.end.saturating_duration_since(self.start)
        }
    }

    /// Whether the stopwatch is currently running.
    pub const fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn new_timer_is_stopped_at_zero() {
        let timer = Timer::new();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[test]
    fn elapsed_grows_while_running() {
        let mut timer = Timer::new();
        timer.start();
        assert!(timer.is_running());
        thread::sleep(Duration::from_millis(20));
        let first = timer.elapsed();
        assert!(first >= Duration::from_millis(10));
        thread::sleep(Duration::from_millis(20));
        assert!(timer.elapsed() > first);
    }

    #[test]
    fn stop_freezes_elapsed() {
        let mut timer = Timer::new();
        timer.start();
        thread::sleep(Duration::from_millis(20));
        timer.stop();
        let frozen = timer.elapsed();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(timer.elapsed(), frozen);
    }

    #[test]
    fn reset_clears_elapsed() {
        let mut timer = Timer::new();
        timer.start();
        thread::sleep(Duration::from_millis(10));
        timer.reset();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[test]
    fn restart_measures_from_zero() {
        let mut timer = Timer::new();
        timer.start();
        thread::sleep(Duration::from_millis(30));
        timer.stop();
        timer.start();
        assert!(timer.elapsed() < Duration::from_millis(25));
    }
}
