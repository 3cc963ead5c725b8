//! Error types for Beluga
//!
//! This module defines all error types used throughout the crate,
//! carrying enough context (paths, line numbers, intervals) to point
//! the user at the offending input.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Beluga operations
#[derive(Error, Debug)]
pub enum BelugaError {
    /// I/O error while reading or writing a file
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File or directory not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Malformed record in an input file
    #[error("Parse error in '{path}' line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Input rejected by validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Chromosome or region not present in the loaded genome
    #[error("Unknown chromosome or region: {0}")]
    UnknownChromosome(String),

    /// Dataset index out of range
    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Cache read/write failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Thread pool error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl BelugaError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error pointing at a file line (1-based)
    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if the error was caused by the user's input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Parse { .. }
                | Self::InvalidInput(_)
                | Self::UnknownChromosome(_)
                | Self::IndexOutOfRange { .. }
                | Self::Config(_)
        )
    }
}

/// Result type alias for Beluga operations
pub type Result<T> = std::result::Result<T, BelugaError>;

impl From<std::io::Error> for BelugaError {
    fn from(err: std::io::Error) -> Self {
        BelugaError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for BelugaError {
    fn from(err: serde_json::Error) -> Self {
        BelugaError::Cache(err.to_string())
    }
}

impl From<bincode::Error> for BelugaError {
    fn from(err: bincode::Error) -> Self {
        BelugaError::Cache(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            let path = path.into();
            if e.kind() == std::io::ErrorKind::NotFound {
                BelugaError::NotFound(path)
            } else {
                BelugaError::io(path, e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = BelugaError::io("/test/path", io_err);
        assert!(matches!(&err, BelugaError::Io { path, .. } if path == &PathBuf::from("/test/path")));
        assert!(err.to_string().contains("/test/path"));
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let res: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = res.with_path("/genome.fa").unwrap_err();
        assert!(matches!(err, BelugaError::NotFound(_)));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_parse_error_message() {
        let err = BelugaError::parse("roi.bed", 3, "end before start");
        assert_eq!(err.to_string(), "Parse error in 'roi.bed' line 3: end before start");
    }
}
