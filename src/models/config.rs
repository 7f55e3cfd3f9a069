use std::time::Duration;

/// Rescan timer configuration
#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    /// Minimum delay between two scans
    pub interval: Duration,
    /// Upper bound (exclusive) of the random delay added to `interval`
    pub jitter: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(8000),
            jitter: Duration::from_millis(2000),
        }
    }
}

impl WatchConfig {
    /// Pick the delay before the next scan.
    pub fn next_delay(&self) -> Duration {
        use rand::Rng;

        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.interval;
        }
        self.interval + Duration::from_millis(rand::rng().random_range(0..jitter_ms))
    }
}
