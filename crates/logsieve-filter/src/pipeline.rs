use chrono::{DateTime, Utc};

use logsieve_config::{
    ConfigError, ConfigProvider, FileConfigProvider, Properties, conf_path, filter_config,
};
use logsieve_types::{FilterConfig, Record};

use crate::{Clock, KeywordMatcher, ReloadScheduler, SystemClock, WaitQueue};

/// Transport-facing contract: one record in, at most one record out
pub trait RecordFilter {
    fn process(&mut self, record: Record) -> Option<Record>;

    /// Apply `process` to each record in order, keeping the emitted ones
    fn process_batch(&mut self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter_map(|record| self.process(record))
            .collect()
    }
}

/// Counters describing what a pipeline has done so far
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub processed: u64,
    pub matched: u64,
    pub dropped: u64,
    pub emitted: u64,
    /// Records currently waiting in the queue
    pub buffered: usize,
    pub reloads: u64,
    pub reload_failures: u64,
}

/// Config snapshot together with the matcher compiled from it
///
/// Replaced as one value on reload so a record never sees the keywords of one
/// config and the wait policy of another.
#[derive(Debug)]
struct ActiveConfig {
    config: FilterConfig,
    matcher: KeywordMatcher,
}

impl ActiveConfig {
    fn build(config: FilterConfig) -> Self {
        let matcher = KeywordMatcher::new(&config.keywords).unwrap_or_else(|e| {
            tracing::warn!("cannot compile keyword set, every record will be dropped: {e}");
            KeywordMatcher::empty()
        });
        Self { config, matcher }
    }
}

/// Mutable per-pipeline state
#[derive(Debug, Default)]
struct PipelineState {
    /// Records seen since the pipeline was built; never reset
    processed_count: u64,
    last_config_mtime: Option<DateTime<Utc>>,
    queue: WaitQueue,
}

/// Keyword filter with an optional wait queue and a reloadable config
///
/// Single-threaded: wrap in a [`crate::SharedPipeline`] when several threads
/// deliver records.
pub struct FilterPipeline {
    active: ActiveConfig,
    /// Startup options, the layer a reloaded config file is read over
    base: Properties,
    provider: Option<Box<dyn ConfigProvider>>,
    state: PipelineState,
    stats: PipelineStats,
    clock: Box<dyn Clock>,
}

impl FilterPipeline {
    /// Create a pipeline with a fixed config and no config provider
    pub fn new(config: FilterConfig) -> Self {
        Self {
            base: Properties::from(&config),
            active: ActiveConfig::build(config),
            provider: None,
            state: PipelineState::default(),
            stats: PipelineStats::default(),
            clock: Box::new(SystemClock),
        }
    }

    /// Create a pipeline from host options
    ///
    /// `conf_path` selects the file to watch. Startup never fails: a missing
    /// or unreadable file is logged and the options alone are used, and
    /// missing keywords leave a pipeline that drops everything.
    pub fn from_options(options: Properties) -> Self {
        let provider = match conf_path(&[&options]) {
            Some(path) => Some(Box::new(FileConfigProvider::new(path)) as Box<dyn ConfigProvider>),
            None => {
                tracing::warn!("no conf_path configured, the filter config cannot be reloaded");
                None
            }
        };
        Self::with_options(options, provider)
    }

    /// Create a pipeline from host options and an explicit config provider
    ///
    /// The provider is loaded once immediately; its properties take priority
    /// over `options`.
    pub fn with_options(options: Properties, provider: Option<Box<dyn ConfigProvider>>) -> Self {
        let mut last_config_mtime = None;

        let config = match provider.as_deref().map(|p| (p.path().to_path_buf(), p.load())) {
            Some((_, Ok((file, modified)))) => {
                last_config_mtime = Some(modified);
                filter_config(&[&file, &options])
            }
            Some((path, Err(e))) => {
                tracing::error!(path = %path.display(), "initializing - {e}");
                filter_config(&[&options])
            }
            None => filter_config(&[&options]),
        };

        tracing::info!(
            keywords = config.keywords.len(),
            wait = config.wait.enabled,
            dynamic_reload = config.dynamic_reload_enabled,
            "filter pipeline ready"
        );

        Self {
            active: ActiveConfig::build(config),
            base: options,
            provider,
            state: PipelineState {
                last_config_mtime,
                ..PipelineState::default()
            },
            stats: PipelineStats::default(),
            clock: Box::new(SystemClock),
        }
    }

    /// Attach a config provider, consulted on scheduled reload checks
    pub fn with_provider(mut self, provider: Box<dyn ConfigProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the clock used for admission timestamps
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Filter one record, using the pipeline clock for queue timestamps
    pub fn process(&mut self, record: Record) -> Option<Record> {
        let now = self.clock.now();
        self.process_at(record, now)
    }

    /// Filter a batch in arrival order, keeping the emitted records
    pub fn process_batch(&mut self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter_map(|record| self.process(record))
            .collect()
    }

    /// Filter one record at an explicit time (seconds since the Unix epoch)
    ///
    /// Returns the record to emit, if any. With the wait queue enabled that is
    /// the queue head, which need not be the record just passed in.
    pub fn process_at(&mut self, record: Record, now: i64) -> Option<Record> {
        self.state.processed_count += 1;
        self.stats.processed += 1;

        if ReloadScheduler::for_config(&self.active.config).is_due(self.state.processed_count) {
            self.check_reload();
        }

        if !self.active.matcher.matches(record.body()) {
            tracing::debug!(processed = self.state.processed_count, "dropped record");
            self.stats.dropped += 1;
            return None;
        }
        tracing::debug!(
            processed = self.state.processed_count,
            keyword = self.active.matcher.first_match(record.body()).unwrap_or_default(),
            "matched record"
        );
        self.stats.matched += 1;

        let wait = self.active.config.wait;
        if !wait.enabled {
            self.stats.emitted += 1;
            return Some(record);
        }

        self.state.queue.admit(record, now);
        let evicted = self
            .state
            .queue
            .try_evict(now, wait.max_age_secs, wait.max_size);

        tracing::trace!(
            queued = self.state.queue.len(),
            evicted = evicted.is_some(),
            "admitted record to wait queue"
        );

        if evicted.is_some() {
            self.stats.emitted += 1;
        }
        evicted
    }

    /// Release every queued record older than the age threshold
    ///
    /// Nothing calls this implicitly; hosts that want buffered records to
    /// leave without further matching traffic call it on a timer.
    pub fn flush_expired(&mut self) -> Vec<Record> {
        let now = self.clock.now();
        let released = self
            .state
            .queue
            .evict_expired(now, self.active.config.wait.max_age_secs);

        if !released.is_empty() {
            tracing::debug!(released = released.len(), "flushed expired records");
        }
        self.stats.emitted += released.len() as u64;
        released
    }

    /// Release every queued record in admission order, for shutdown
    pub fn close(&mut self) -> Vec<Record> {
        let drained = self.state.queue.drain();
        if !drained.is_empty() {
            tracing::info!(drained = drained.len(), "drained wait queue");
        }
        self.stats.emitted += drained.len() as u64;
        drained
    }

    /// Check the provider now, ignoring the scheduler
    ///
    /// Returns whether a new config was swapped in.
    pub fn reload_now(&mut self) -> Result<bool, ConfigError> {
        let result = self.reload_if_modified();
        if result.is_err() {
            self.stats.reload_failures += 1;
        }
        result
    }

    pub fn config(&self) -> &FilterConfig {
        &self.active.config
    }

    pub fn matcher(&self) -> &KeywordMatcher {
        &self.active.matcher
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            buffered: self.state.queue.len(),
            ..self.stats
        }
    }

    /// Records currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.state.queue.len()
    }

    pub fn processed_count(&self) -> u64 {
        self.state.processed_count
    }

    pub fn last_config_mtime(&self) -> Option<DateTime<Utc>> {
        self.state.last_config_mtime
    }

    /// Scheduled reload; failures are logged and the current config is kept
    fn check_reload(&mut self) {
        if let Err(e) = self.reload_now() {
            tracing::warn!("intercepting - {e}, keeping the current filter config");
        }
    }

    fn reload_if_modified(&mut self) -> Result<bool, ConfigError> {
        let Some(provider) = self.provider.as_deref() else {
            return Ok(false);
        };

        let modified = provider.modified()?;
        if self
            .state
            .last_config_mtime
            .is_some_and(|last| modified <= last)
        {
            return Ok(false);
        }

        let (file, modified) = provider.load()?;
        let config = filter_config(&[&file, &self.base]);

        tracing::info!(
            path = %provider.path().display(),
            keywords = config.keywords.len(),
            wait = config.wait.enabled,
            "reloaded filter config"
        );

        self.active = ActiveConfig::build(config);
        self.state.last_config_mtime = Some(modified);
        self.stats.reloads += 1;
        Ok(true)
    }
}

impl RecordFilter for FilterPipeline {
    fn process(&mut self, record: Record) -> Option<Record> {
        FilterPipeline::process(self, record)
    }

    fn process_batch(&mut self, records: Vec<Record>) -> Vec<Record> {
        FilterPipeline::process_batch(self, records)
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("config", &self.active.config)
            .field("provider", &self.provider.as_deref().map(|p| p.path()))
            .field("processed_count", &self.state.processed_count)
            .field("queued", &self.state.queue.len())
            .finish()
    }
}
