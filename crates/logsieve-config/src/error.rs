use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures while locating, reading or interpreting configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} not found", path.display())]
    NotFound { path: PathBuf },

    #[error("config file {} cannot be read: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file {} is malformed: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("invalid value {value:?} for option {key}")]
    InvalidOption { key: &'static str, value: String },

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl ConfigError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Unreadable {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }
}
