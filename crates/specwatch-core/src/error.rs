//! Error types for specwatch-core

use std::fmt;

/// Result type alias for specwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for specwatch operations
#[derive(Debug)]
pub enum Error {
    /// Specification retrieval failed after all attempts
    Fetch(String),

    /// Generation service failed for a reason other than input size
    Generation(String),

    /// Generation service rejected the prompt as too large
    InputTooLarge(String),

    /// Invalid configuration
    Config(String),

    /// Malformed `METHOD /path` route token or unit id
    InvalidRoute(String),

    /// I/O error
    Io(std::io::Error),

    /// JSON parsing or serialization error
    Json(String),

    /// YAML parsing or serialization error
    Yaml(String),

    /// Runtime error (Tokio, task joins, etc.)
    Runtime(String),

    /// Other errors
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Fetch(msg) => write!(f, "Fetch error: {}", msg),
            Error::Generation(msg) => write!(f, "Generation error: {}", msg),
            Error::InputTooLarge(msg) => write!(f, "Generation input too large: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidRoute(route) => write!(f, "Invalid route: {}", route),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Json(msg) => write!(f, "JSON error: {}", msg),
            Error::Yaml(msg) => write!(f, "YAML error: {}", msg),
            Error::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Fetch(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml(err.to_string())
    }
}

/// Fieldless error category for zero-cost pattern matching.
///
/// Single byte representation (`#[repr(u8)]`), `Copy`, no allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    /// Specification retrieval error
    Fetch,
    /// Generation service error
    Generation,
    /// Generation input exceeded the service limit
    InputTooLarge,
    /// Configuration error
    Config,
    /// Malformed route token
    InvalidRoute,
    /// I/O operation error
    Io,
    /// JSON error
    Json,
    /// YAML error
    Yaml,
    /// Runtime error
    Runtime,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind — zero allocation, returns a Copy enum.
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::Fetch(_) => ErrorKind::Fetch,
            Error::Generation(_) => ErrorKind::Generation,
            Error::InputTooLarge(_) => ErrorKind::InputTooLarge,
            Error::Config(_) => ErrorKind::Config,
            Error::InvalidRoute(_) => ErrorKind::InvalidRoute,
            Error::Io(_) => ErrorKind::Io,
            Error::Json(_) => ErrorKind::Json,
            Error::Yaml(_) => ErrorKind::Yaml,
            Error::Runtime(_) => ErrorKind::Runtime,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether a smaller payload might succeed where this one failed.
    #[inline]
    pub const fn is_input_too_large(&self) -> bool {
        matches!(self, Error::InputTooLarge(_))
    }

    /// Borrow the error message — zero allocation.
    #[inline]
    pub fn message(&self) -> &str {
        match self {
            Error::Fetch(msg)
            | Error::Generation(msg)
            | Error::InputTooLarge(msg)
            | Error::Config(msg)
            | Error::InvalidRoute(msg)
            | Error::Json(msg)
            | Error::Yaml(msg)
            | Error::Runtime(msg)
            | Error::Other(msg) => msg,
            Error::Io(_) => "I/O error",
        }
    }
}
