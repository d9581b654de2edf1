//! Configuration for the sweep scheduler and the analyzer.

use std::time::Duration;

/// Configuration for the feed sweep scheduler.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often the scheduler tick fires. A tick that lands while a sweep is
    /// still running is dropped, not queued.
    pub tick_interval: Duration,

    /// Only items published within this many days are ingested.
    pub lookback_days: i64,

    /// Fixed delay between per-item notification sends. Deliberate
    /// backpressure against upstream rate limits.
    pub item_delay: Duration,

    /// Fixed delay between feeds within one sweep.
    pub feed_delay: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10 * 60),
            lookback_days: 10,
            item_delay: Duration::from_secs(2),
            feed_delay: Duration::from_secs(2),
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scheduler tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the publication lookback window in days.
    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    /// Set both throttle delays. Tests set these to zero.
    pub fn with_delays(mut self, item_delay: Duration, feed_delay: Duration) -> Self {
        self.item_delay = item_delay;
        self.feed_delay = feed_delay;
        self
    }
}

/// Configuration for the LLM extraction client.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Model identifier sent to the completion endpoint.
    pub model: String,

    /// Low temperature keeps the extraction deterministic.
    pub temperature: f32,

    /// Token cap on the completion.
    pub max_tokens: u32,

    /// Post bodies are truncated to this many characters before prompting.
    pub content_cap: usize,

    /// Attempt budget across transient failures.
    pub max_attempts: u32,

    /// Base delay for the linear backoff (attempt × base).
    pub base_delay: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.1,
            max_tokens: 500,
            content_cap: 2500,
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.base_delay = base_delay;
        self
    }

    /// Backoff before the next attempt: linear in the attempt number.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly() {
        let config = AnalyzerConfig::default().with_retry(3, Duration::from_millis(100));
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(300));
    }
}
