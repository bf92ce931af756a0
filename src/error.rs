//! Global error handling for codepack
//!
//! This module provides a centralized error type that can represent errors
//! from all modules in the project.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::tokenizer::TokenizerError;

/// Global error type for codepack operations
#[derive(Error, Debug)]
pub enum PackError {
    /// Tokenizer-related errors
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A single project file could not be read as text
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// XML processing errors
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON processing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings store errors
    #[error("Settings error at '{path}': {message}")]
    Settings { path: PathBuf, message: String },

    /// Imported preset document was rejected
    #[error("Invalid preset file: {0}")]
    PresetImport(String),

    /// Formatter errors
    #[error("Formatter error: {0}")]
    Formatter(String),

    /// Worker thread errors
    #[error("Worker error: {0}")]
    Worker(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unexpected error
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Specialized Result type for codepack operations
pub type Result<T> = std::result::Result<T, PackError>;

/// Creates a PackError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::PackError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}

/// Extension trait for adding context to errors
pub trait ResultExt<T, E> {
    /// Add additional context to an error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E: std::error::Error + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        self.map_err(|e| {
            let context = f();
            PackError::Unexpected(format!("{}: {}", context, e))
        })
    }
}

// The binary returns io::Result from main
impl From<PackError> for io::Error {
    fn from(err: PackError) -> Self {
        match err {
            PackError::Io(e) => e,
            PackError::PathNotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(value: u8) -> Result<u8> {
        crate::ensure!(value <= 5, InvalidArgument, "priority {} out of range", value);
        Ok(value)
    }

    #[test]
    fn test_ensure_macro() {
        assert_eq!(checked(3).unwrap(), 3);
        let err = checked(9).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: priority 9 out of range");
    }

    #[test]
    fn test_with_context() {
        let raw: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::Other, "boom"));
        let err = raw.with_context(|| "loading settings").unwrap_err();
        assert_eq!(err.to_string(), "Unexpected error: loading settings: boom");
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let err: io::Error = PackError::PathNotFound("missing".into()).into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
