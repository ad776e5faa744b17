//! Per-channel rate estimation over wall-clock windows

use std::time::{Duration, Instant};

/// Event counts for the rate-role channels over the current window.
/// Counts and the window clock reset together, so a rate never mixes
/// two windows.
pub struct RateEstimator {
    channels: Vec<u8>,
    counts: Vec<u64>,
    window_start: Instant,
}

impl RateEstimator {
    pub fn new(channels: Vec<u8>) -> RateEstimator {
        let counts = vec![0; channels.len()];
        RateEstimator {
            channels,
            counts,
            window_start: Instant::now(),
        }
    }

    /// Count one event, if its channel is rate-tracked
    pub fn record(&mut self, channel: u8) {
        if let Some(i) = self.channels.iter().position(|&c| c == channel) {
            self.counts[i] += 1;
        }
    }

    /// Time since the current window opened
    pub fn elapsed(&self) -> Duration {
        self.window_start.elapsed()
    }

    /// Close the window: counts become per-second rates against the
    /// measured elapsed time, and the next window opens. Returns nothing
    /// if no time has passed, leaving the window untouched.
    pub fn snapshot(&mut self) -> Option<(Vec<(u8, f64)>, Duration)> {
        let elapsed = self.window_start.elapsed();
        if elapsed.is_zero() {
            return None;
        }
        let secs = elapsed.as_secs_f64();
        let rates = self
            .channels
            .iter()
            .zip(&self.counts)
            .map(|(&c, &n)| (c, n as f64 / secs))
            .collect();
        for n in &mut self.counts {
            *n = 0;
        }
        self.window_start = Instant::now();
        Some((rates, elapsed))
    }
}
