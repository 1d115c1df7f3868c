//! Error types for opendata-fetch
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Each kind has exactly one propagation policy:
//! - network, content-type, sink and config failures abort the run
//! - [`Error::LogReadFailure`] is soft and callers substitute "no previous run"
//! - [`Error::MalformedArtifact`] is reported by the verification pass

use thiserror::Error;

/// The main error type for opendata-fetch
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Upstream Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        status: Option<u16>,
        message: String,
    },

    #[error("Unexpected content type: expected {expected}, server returned '{actual}'")]
    UnexpectedContentType { expected: String, actual: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // Sink / Log / Artifact Errors
    // ============================================================================
    #[error("Failed to write '{path}': {message}")]
    SinkWriteFailure { path: String, message: String },

    #[error("Failed to read run log '{path}': {message}")]
    LogReadFailure { path: String, message: String },

    #[error("Malformed artifact '{path}': {message}")]
    MalformedArtifact { path: String, message: String },

    // ============================================================================
    // Arrow/Parquet Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an upstream error for a non-success HTTP status
    pub fn upstream_status(status: u16, body: impl AsRef<str>) -> Self {
        let body = body.as_ref().trim();
        let message = if body.is_empty() {
            format!("server returned {status}")
        } else {
            format!("server returned {status}: {body}")
        };
        Self::UpstreamUnavailable {
            status: Some(status),
            message,
        }
    }

    /// Create an upstream error for an unreachable host
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            status: None,
            message: message.into(),
        }
    }

    /// Create a content type mismatch error
    pub fn content_type(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedContentType {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a sink write error
    pub fn sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWriteFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a run log read error
    pub fn log_read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LogReadFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a malformed artifact error
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedArtifact {
            path: path.into(),
            message: message.into(),
        }
    }

    /// HTTP status carried by an upstream error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UpstreamUnavailable { status, .. } => *status,
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the caller may substitute a default and keep going
    pub fn is_soft(&self) -> bool {
        matches!(self, Error::LogReadFailure { .. })
    }
}

/// Result type alias for opendata-fetch
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
