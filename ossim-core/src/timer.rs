//! Wall-clock timer for simulated time.

use std::thread;
use std::time::{Duration, Instant};

/// Lap timer measured from a zero mark.
#[derive(Debug, Clone, Copy)]
pub struct SimTimer {
    zero: Instant,
    mark: Instant,
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            zero: now,
            mark: now,
        }
    }

    /// Reset both marks to now.
    pub fn zero(&mut self) -> Duration {
        *self = Self::new();
        Duration::ZERO
    }

    /// Elapsed since the last `zero`.
    pub fn since_zero(&self) -> Duration {
        self.zero.elapsed()
    }

    /// Elapsed since the previous lap; starts a new lap.
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now - self.mark;
        self.mark = now;
        lap
    }

    /// Block the calling thread for `ms` milliseconds.
    pub fn wait(ms: u64) {
        if ms > 0 {
            thread::sleep(Duration::from_millis(ms));
        }
    }
}

/// Seconds with microsecond precision, as printed in log lines.
pub fn format_seconds(d: Duration) -> String {
    format!("{:.6}", d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_and_lap() {
        let mut timer = SimTimer::new();
        SimTimer::wait(15);
        let lap = timer.lap();
        assert!(lap >= Duration::from_millis(15));
        assert!(timer.since_zero() >= lap);

        let second = timer.lap();
        assert!(second < lap);
    }

    #[test]
    fn test_zero_resets() {
        let mut timer = SimTimer::new();
        SimTimer::wait(100);
        assert_eq!(timer.zero(), Duration::ZERO);
        assert!(timer.since_zero() < Duration::from_millis(100));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(Duration::ZERO), "0.000000");
        assert_eq!(format_seconds(Duration::from_micros(1_250_001)), "1.250001");
    }
}
