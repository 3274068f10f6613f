use std::path::PathBuf;
use std::str::FromStr;

use logsieve_types::{
    CONF_PATH, DEFAULT_DYNAMIC_PROP, DEFAULT_LOG_WAIT, DEFAULT_LOG_WAIT_CACHE,
    DEFAULT_LOG_WAIT_TIME, DEFAULT_PROP_MONITOR_INTERVAL, DYNAMIC_PROP, FilterConfig, KEYWORDS,
    LOG_WAIT, LOG_WAIT_CACHE, LOG_WAIT_TIME, OptionKey, PROP_MONITOR_INTERVAL, PROP_MONITOR_MODE,
    ReloadMode, WaitPolicy, parse_keywords,
};

use crate::{ConfigError, Properties};

/// Find an option in a stack of property sets, highest priority first
pub fn lookup<'a>(layers: &[&'a Properties], key: OptionKey) -> Option<&'a str> {
    layers.iter().copied().find_map(|props| props.lookup(key))
}

/// The config file to watch, if one is configured
pub fn conf_path(layers: &[&Properties]) -> Option<PathBuf> {
    lookup(layers, CONF_PATH)
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

/// Resolve a filter config from a stack of property sets
///
/// Never fails: a missing option takes its default and an unparsable one is
/// logged and replaced by its default. A missing keyword list yields a config
/// that matches nothing.
pub fn filter_config(layers: &[&Properties]) -> FilterConfig {
    let keywords = match lookup(layers, KEYWORDS) {
        Some(list) => {
            let keywords = parse_keywords(list);
            if keywords.is_empty() {
                tracing::warn!("keyword list is empty, every record will be dropped");
            }
            keywords
        }
        None => {
            tracing::warn!("no keywords configured, every record will be dropped");
            Vec::new()
        }
    };

    FilterConfig {
        keywords,
        dynamic_reload_enabled: option_or(layers, DYNAMIC_PROP, DEFAULT_DYNAMIC_PROP, parse_bool),
        reload_check_interval: option_or(
            layers,
            PROP_MONITOR_INTERVAL,
            DEFAULT_PROP_MONITOR_INTERVAL,
            parse_number,
        ),
        reload_mode: option_or(layers, PROP_MONITOR_MODE, ReloadMode::default(), ReloadMode::parse),
        wait: WaitPolicy {
            enabled: option_or(layers, LOG_WAIT, DEFAULT_LOG_WAIT, parse_bool),
            max_age_secs: option_or(layers, LOG_WAIT_TIME, DEFAULT_LOG_WAIT_TIME, parse_number),
            max_size: option_or(layers, LOG_WAIT_CACHE, DEFAULT_LOG_WAIT_CACHE, parse_number),
        },
    }
}

impl From<&FilterConfig> for Properties {
    /// Describe a config under canonical keys, so it can serve as the base
    /// layer beneath a reloaded config file
    fn from(config: &FilterConfig) -> Self {
        Properties::new()
            .with(KEYWORDS.name, config.keywords.join(","))
            .with(DYNAMIC_PROP.name, config.dynamic_reload_enabled.to_string())
            .with(
                PROP_MONITOR_INTERVAL.name,
                config.reload_check_interval.to_string(),
            )
            .with(PROP_MONITOR_MODE.name, config.reload_mode.as_str())
            .with(LOG_WAIT.name, config.wait.enabled.to_string())
            .with(LOG_WAIT_TIME.name, config.wait.max_age_secs.to_string())
            .with(LOG_WAIT_CACHE.name, config.wait.max_size.to_string())
    }
}

fn option_or<T>(
    layers: &[&Properties],
    key: OptionKey,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    let Some(raw) = lookup(layers, key) else {
        return default;
    };

    match parse(raw.trim()) {
        Some(value) => value,
        None => {
            let err = ConfigError::InvalidOption {
                key: key.name,
                value: raw.to_string(),
            };
            tracing::warn!("{err}, using the default");
            default
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_number<T: FromStr>(raw: &str) -> Option<T> {
    raw.parse().ok()
}
