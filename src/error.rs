//! Error types for fieldmatch

use thiserror::Error;

/// Result type alias for fieldmatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fieldmatch
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container format error (reading or writing raw video files)
    #[error("Format error: {0}")]
    Format(String),

    /// Upstream frame fetch failed
    #[error("Source error: {0}")]
    Source(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error, raised before any frame is processed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The pulldown pattern table is internally inconsistent
    #[error("Pattern table error: {0}")]
    PatternTable(String),

    /// JSON configuration error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Library initialization error
    #[error("Initialization error: {0}")]
    Init(String),

    /// End of stream
    #[error("End of stream")]
    EndOfStream,
}

impl Error {
    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create a source error
    pub fn source<S: Into<String>>(msg: S) -> Self {
        Error::Source(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a pattern table error
    pub fn pattern_table<S: Into<String>>(msg: S) -> Self {
        Error::PatternTable(msg.into())
    }

    /// True for failures that abort setup rather than a single frame request
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::PatternTable(_))
    }
}
