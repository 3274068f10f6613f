use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{ConfigError, Properties};

/// Source of filter properties that can change while the pipeline runs
///
/// Implementations must be cheap enough to call inline with record
/// processing: `modified` is consulted on every scheduled reload check.
pub trait ConfigProvider: Send {
    /// Location of the underlying config, for log messages
    fn path(&self) -> &Path;

    /// Last modification time of the underlying config
    fn modified(&self) -> Result<DateTime<Utc>, ConfigError>;

    /// Read the full property set together with its modification time
    fn load(&self) -> Result<(Properties, DateTime<Utc>), ConfigError>;
}

/// On-disk syntax of a config file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Properties,
    Toml,
}

impl ConfigFormat {
    /// Pick a format from the file extension; anything but `.toml` is a
    /// properties file
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Properties,
        }
    }
}

/// Config provider backed by a file on the local filesystem
#[derive(Clone, Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    format: ConfigFormat,
}

impl FileConfigProvider {
    /// Watch the file at `path`, detecting the format from its extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = ConfigFormat::detect(&path);
        Self { path, format }
    }

    pub fn with_format(mut self, format: ConfigFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }
}

impl ConfigProvider for FileConfigProvider {
    fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> Result<DateTime<Utc>, ConfigError> {
        let metadata = fs::metadata(&self.path).map_err(|e| ConfigError::from_io(&self.path, e))?;
        let modified = metadata.modified().map_err(|e| {
            ConfigError::Unexpected(format!(
                "modification time of {} unavailable: {e}",
                self.path.display()
            ))
        })?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn load(&self) -> Result<(Properties, DateTime<Utc>), ConfigError> {
        let modified = self.modified()?;
        let text =
            fs::read_to_string(&self.path).map_err(|e| ConfigError::from_io(&self.path, e))?;

        let props = match self.format {
            ConfigFormat::Properties => Properties::parse(&text),
            ConfigFormat::Toml => {
                Properties::from_toml(&text).map_err(|e| ConfigError::Malformed {
                    path: self.path.clone(),
                    message: e.to_string(),
                })?
            }
        };

        tracing::debug!(
            path = %self.path.display(),
            entries = props.len(),
            "loaded config file"
        );

        Ok((props, modified))
    }
}
