//! Centralized error handling for md-annotate
//!
//! One error type covers storage I/O, configuration, and the structural
//! failures the annotation engine reports to its own log.

use log::warn;
use std::fmt;
use std::io;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Custom Result Type Alias
// ─────────────────────────────────────────────────────────────────────────────

/// A specialized `Result` type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The centralized error type for the crate.
#[derive(Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic I/O error wrapper
    Io(io::Error),

    /// Failed to read a persisted highlight set or color table
    StoreLoad {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write a persisted highlight set or color table
    StoreSave {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse persisted data or configuration (invalid JSON/format)
    Parse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Platform data or config directory not found or inaccessible
    DataDirNotFound,

    // ─────────────────────────────────────────────────────────────────────────
    // Engine Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// A document offset fell outside the flattened text
    OffsetOutOfRange { offset: usize, len: usize },

    /// The tree does not have the shape a mutation expected
    TreeShape(String),

    /// A color string could not be understood
    InvalidColor(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Application Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic application error with a message
    Application(String),
}

impl Error {
    /// Shorthand for a tree shape error.
    pub fn shape(message: impl Into<String>) -> Self {
        Error::TreeShape(message.into())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Display trait implementation
// ─────────────────────────────────────────────────────────────────────────────
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::StoreLoad { path, source } => {
                write!(f, "Failed to load '{}': {}", path.display(), source)
            }
            Error::StoreSave { path, source } => {
                write!(f, "Failed to save '{}': {}", path.display(), source)
            }
            Error::Parse { message, .. } => write!(f, "Invalid data format: {}", message),
            Error::DataDirNotFound => write!(f, "Data directory not found"),
            Error::OffsetOutOfRange { offset, len } => {
                write!(f, "Offset {} is outside the text (length {})", offset, len)
            }
            Error::TreeShape(msg) => write!(f, "Unexpected tree shape: {}", msg),
            Error::InvalidColor(value) => write!(f, "Invalid color '{}'", value),
            Error::Application(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::StoreLoad { source, .. } => Some(source.as_ref()),
            Error::StoreSave { source, .. } => Some(source.as_ref()),
            Error::Parse { source, .. } => source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::DataDirNotFound
            | Error::OffsetOutOfRange { .. }
            | Error::TreeShape(_)
            | Error::InvalidColor(_)
            | Error::Application(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful Degradation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for Result to support graceful degradation.
pub trait ResultExt<T> {
    /// If the result is an error, log it at warning level and return the provided default.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("{}: {}. Using default.", context, err);
                default
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
