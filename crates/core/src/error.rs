//! Error types for the footprint system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the footprint system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (unknown parser/output kind, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or inconsistent data).
    #[error("Data error: {0}")]
    Data(String),

    /// A record the parser could not advance past.
    #[error("Malformed record at byte {offset}: {reason}")]
    Malformed {
        /// Byte offset of the record within the input.
        offset: u64,
        /// What went wrong.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file could not be parsed.
    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a malformed-record error.
    pub fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Error::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// Whether this error is fatal for the whole batch rather than one file.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::ConfigFile(_))
    }
}
