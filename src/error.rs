use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[cfg(feature = "mssql")]
use bb8_tiberius::Error as Bb8TiberiusError;

#[derive(Debug, Error)]
pub enum SearchError {
    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    PoolError(#[from] bb8::RunError<Bb8TiberiusError>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Search of table {table} exceeded its deadline of {after:?}")]
    Timeout { table: String, after: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures while loading the configuration file.
///
/// `Missing` means something required is absent; `Malformed` means it is
/// present but cannot be used as-is.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration missing: {what}")]
    Missing { what: String },

    #[error("Configuration file {path} could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration malformed ({what}): {reason}")]
    Malformed { what: String, reason: String },
}

impl ConfigError {
    pub(crate) fn missing(what: impl Into<String>) -> Self {
        ConfigError::Missing { what: what.into() }
    }

    pub(crate) fn malformed(what: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Malformed {
            what: what.into(),
            reason: reason.into(),
        }
    }
}
