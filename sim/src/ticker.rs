use std::time::{Duration, Instant};

/// Blocking counterpart of `embassy_time::Ticker` for plain threads.
pub struct Ticker {
    started_at: Instant,
    expires_at: Instant,
    duration: Duration,
}

impl Ticker {
    /// Creates a new ticker that ticks at the specified duration interval.
    pub fn every(duration: Duration) -> Self {
        let started_at = Instant::now();
        Self {
            started_at,
            expires_at: started_at + duration,
            duration,
        }
    }

    /// Time since the ticker was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Blocks until the next tick. Ticks that were missed fire instantly,
    /// so the average rate is kept.
    pub fn next(&mut self) {
        if let Some(duration) = self.expires_at.checked_duration_since(Instant::now()) {
            std::thread::sleep(duration);
        }

        self.expires_at += self.duration;
    }
}
