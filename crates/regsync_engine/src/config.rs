//! Configuration for the sync orchestrator.

use std::time::Duration;

/// Configuration for the orchestrator's triggers and remote naming.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Name prefix for the remote snapshot file.
    pub remote_prefix: String,
    /// Delay before the one-shot startup trigger fires, so that
    /// authorization and host state can settle after initialization.
    pub startup_delay: Duration,
    /// Interval of the unconditional periodic trigger.
    pub periodic_interval: Duration,
    /// Quiet period after the last change event before a cycle starts.
    pub debounce_delay: Duration,
    /// Per-operation timeout for remote store calls.
    pub op_timeout: Duration,
}

impl SyncConfig {
    /// Creates a configuration with default timings.
    pub fn new(remote_prefix: impl Into<String>) -> Self {
        Self {
            remote_prefix: remote_prefix.into(),
            startup_delay: Duration::from_secs(10),
            periodic_interval: Duration::from_secs(300),
            debounce_delay: Duration::from_secs(2),
            op_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the startup delay.
    #[must_use]
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Sets the periodic interval.
    #[must_use]
    pub fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = interval;
        self
    }

    /// Sets the debounce delay.
    #[must_use]
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("regsync")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = SyncConfig::new("registry")
            .with_startup_delay(Duration::from_millis(5))
            .with_periodic_interval(Duration::from_secs(60))
            .with_debounce_delay(Duration::from_millis(100))
            .with_op_timeout(Duration::from_secs(5));

        assert_eq!(config.remote_prefix, "registry");
        assert_eq!(config.startup_delay, Duration::from_millis(5));
        assert_eq!(config.periodic_interval, Duration::from_secs(60));
        assert_eq!(config.debounce_delay, Duration::from_millis(100));
        assert_eq!(config.op_timeout, Duration::from_secs(5));
    }

    #[test]
    fn default_timings() {
        let config = SyncConfig::default();
        assert_eq!(config.startup_delay, Duration::from_secs(10));
        assert_eq!(config.periodic_interval, Duration::from_secs(300));
        assert_eq!(config.debounce_delay, Duration::from_secs(2));
    }
}
