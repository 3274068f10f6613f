//! Shared types for logsieve
//!
//! This crate contains the record and configuration types used across the
//! logsieve crates.

use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;

// ============================================================================
// Records
// ============================================================================

/// A single log record as delivered by the host transport
///
/// The filter only ever reads the body. Headers travel with the record
/// untouched and are handed back as-is on emission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Record {
    /// Create a record with the given body and no headers
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Create a record from an existing header map and body
    pub fn from_parts(headers: HashMap<String, String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Attach a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Raw payload bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Payload as text, replacing invalid UTF-8 sequences
    pub fn body_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Split the record back into headers and body
    pub fn into_parts(self) -> (HashMap<String, String>, Vec<u8>) {
        (self.headers, self.body)
    }
}

impl From<&str> for Record {
    fn from(body: &str) -> Self {
        Self::new(body.as_bytes())
    }
}

impl From<String> for Record {
    fn from(body: String) -> Self {
        Self::new(body.into_bytes())
    }
}

impl From<Vec<u8>> for Record {
    fn from(body: Vec<u8>) -> Self {
        Self::new(body)
    }
}

// ============================================================================
// Option Keys
// ============================================================================

/// A recognised configuration option
///
/// `alias` is the spelling used by older interceptor configurations; lookups
/// try `name` first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionKey {
    pub name: &'static str,
    pub alias: Option<&'static str>,
}

impl OptionKey {
    const fn new(name: &'static str, alias: Option<&'static str>) -> Self {
        Self { name, alias }
    }

    /// All spellings of this key, canonical first
    pub fn spellings(self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.alias)
    }
}

pub const CONF_PATH: OptionKey = OptionKey::new("conf_path", Some("confpath"));
pub const DYNAMIC_PROP: OptionKey = OptionKey::new("dynamic_prop", Some("dynamicprop"));
pub const KEYWORDS: OptionKey = OptionKey::new("keywords", None);
pub const PROP_MONITOR_INTERVAL: OptionKey =
    OptionKey::new("prop_monitor_interval", Some("prop.monitor.rollInterval"));
pub const PROP_MONITOR_MODE: OptionKey = OptionKey::new("prop_monitor_mode", None);
pub const LOG_WAIT: OptionKey = OptionKey::new("log_wait", Some("logwait"));
pub const LOG_WAIT_TIME: OptionKey = OptionKey::new("log_wait_time", Some("logwaittime"));
pub const LOG_WAIT_CACHE: OptionKey = OptionKey::new("log_wait_cache", Some("logwaitcache"));

pub const DEFAULT_DYNAMIC_PROP: bool = false;
pub const DEFAULT_PROP_MONITOR_INTERVAL: u64 = 500_000;
pub const DEFAULT_LOG_WAIT: bool = false;
/// Seconds
pub const DEFAULT_LOG_WAIT_TIME: u64 = 0;
pub const DEFAULT_LOG_WAIT_CACHE: usize = 0;

// ============================================================================
// Filter Configuration
// ============================================================================

/// When the pipeline asks its config provider whether the file changed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMode {
    /// Check on every record once the processed count exceeds the interval
    #[default]
    Threshold,
    /// Check once every `interval` records
    Periodic,
}

impl ReloadMode {
    /// Parse a mode name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "threshold" => Some(Self::Threshold),
            "periodic" | "modulo" => Some(Self::Periodic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Periodic => "periodic",
        }
    }
}

/// Wait queue parameters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WaitPolicy {
    pub enabled: bool,
    /// Age eviction threshold in seconds
    pub max_age_secs: u64,
    /// Size eviction threshold
    pub max_size: usize,
}

/// Immutable filter settings snapshot
///
/// A reload builds a fresh value and swaps it in whole; nothing mutates a
/// snapshot in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilterConfig {
    pub keywords: Vec<String>,
    pub dynamic_reload_enabled: bool,
    /// Record count used by the reload scheduler
    pub reload_check_interval: u64,
    pub reload_mode: ReloadMode,
    pub wait: WaitPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            dynamic_reload_enabled: DEFAULT_DYNAMIC_PROP,
            reload_check_interval: DEFAULT_PROP_MONITOR_INTERVAL,
            reload_mode: ReloadMode::default(),
            wait: WaitPolicy {
                enabled: DEFAULT_LOG_WAIT,
                max_age_secs: DEFAULT_LOG_WAIT_TIME,
                max_size: DEFAULT_LOG_WAIT_CACHE,
            },
        }
    }
}

impl FilterConfig {
    /// Config matching the given keywords with every other option at its default
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Enable the wait queue with the given thresholds
    pub fn waiting(mut self, max_age_secs: u64, max_size: usize) -> Self {
        self.wait = WaitPolicy {
            enabled: true,
            max_age_secs,
            max_size,
        };
        self
    }

    /// Enable dynamic reload checks
    pub fn reloading(mut self, interval: u64, mode: ReloadMode) -> Self {
        self.dynamic_reload_enabled = true;
        self.reload_check_interval = interval;
        self.reload_mode = mode;
        self
    }
}

/// Split a comma-separated keyword list
///
/// Items are trimmed, empty items are dropped and duplicates keep their first
/// position.
pub fn parse_keywords(list: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !keywords.iter().any(|k| k == item) {
            keywords.push(item.to_string());
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_keywords("ERROR, WARN,,ERROR , "), vec!["ERROR", "WARN"]);
        assert!(parse_keywords("").is_empty());
        assert!(parse_keywords(" , ,").is_empty());
    }

    #[test]
    fn test_record_keeps_headers() {
        let record = Record::from("ERROR boom").with_header("host", "web-1");
        assert_eq!(record.header("host"), Some("web-1"));
        assert_eq!(record.body(), b"ERROR boom");

        let (headers, body) = record.clone().into_parts();
        assert_eq!(headers.len(), 1);
        assert_eq!(body, b"ERROR boom".to_vec());
        assert_eq!(Record::from_parts(headers, body), record);
    }

    #[test]
    fn test_reload_mode_parse() {
        assert_eq!(ReloadMode::parse("Periodic"), Some(ReloadMode::Periodic));
        assert_eq!(ReloadMode::parse(" threshold "), Some(ReloadMode::Threshold));
        assert_eq!(ReloadMode::parse("sometimes"), None);
    }

    #[test]
    fn test_option_key_spellings() {
        let spellings: Vec<_> = PROP_MONITOR_INTERVAL.spellings().collect();
        assert_eq!(spellings, vec!["prop_monitor_interval", "prop.monitor.rollInterval"]);
        assert_eq!(KEYWORDS.spellings().count(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = FilterConfig::default();
        assert!(config.keywords.is_empty());
        assert_eq!(config.reload_check_interval, DEFAULT_PROP_MONITOR_INTERVAL);
        assert!(!config.wait.enabled);
        assert_eq!(config.reload_mode, ReloadMode::Threshold);
    }
}
