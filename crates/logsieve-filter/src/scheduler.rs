use logsieve_types::{FilterConfig, ReloadMode};

/// Decides on which records the pipeline consults its config provider
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReloadScheduler {
    enabled: bool,
    interval: u64,
    mode: ReloadMode,
}

impl ReloadScheduler {
    pub fn new(enabled: bool, interval: u64, mode: ReloadMode) -> Self {
        Self {
            enabled,
            interval,
            mode,
        }
    }

    pub fn for_config(config: &FilterConfig) -> Self {
        Self::new(
            config.dynamic_reload_enabled,
            config.reload_check_interval,
            config.reload_mode,
        )
    }

    /// Whether the record numbered `processed_count` (1-based) triggers a check
    ///
    /// In threshold mode the counter is never reset, so once it passes the
    /// interval every record triggers a modification-time check.
    pub fn is_due(&self, processed_count: u64) -> bool {
        if !self.enabled {
            return false;
        }
        match self.mode {
            ReloadMode::Threshold => processed_count > self.interval,
            ReloadMode::Periodic => {
                self.interval == 0 || processed_count % self.interval == 0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_due() {
        let scheduler = ReloadScheduler::new(false, 0, ReloadMode::Threshold);
        assert!((1..100).all(|n| !scheduler.is_due(n)));
    }

    #[test]
    fn test_threshold_fires_on_every_record_past_interval() {
        let scheduler = ReloadScheduler::new(true, 3, ReloadMode::Threshold);
        let due: Vec<u64> = (1..=7).filter(|n| scheduler.is_due(*n)).collect();
        assert_eq!(due, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_periodic_fires_on_multiples() {
        let scheduler = ReloadScheduler::new(true, 3, ReloadMode::Periodic);
        let due: Vec<u64> = (1..=10).filter(|n| scheduler.is_due(*n)).collect();
        assert_eq!(due, vec![3, 6, 9]);
    }

    #[test]
    fn test_periodic_zero_interval_checks_every_record() {
        let scheduler = ReloadScheduler::new(true, 0, ReloadMode::Periodic);
        assert!((1..10).all(|n| scheduler.is_due(n)));
    }

    #[test]
    fn test_for_config() {
        let config = FilterConfig::with_keywords(["X"]).reloading(5, ReloadMode::Periodic);
        assert_eq!(
            ReloadScheduler::for_config(&config),
            ReloadScheduler::new(true, 5, ReloadMode::Periodic)
        );
    }
}
