//! Error types for formledger.
//!
//! Request-scoped failures (`PasswordMismatch`, `WriteFailed`, `WriterClosed`,
//! `ReadFailed`, `DirectoryCreate`) are turned into responses by the server
//! and never abort the process. Configuration and bind errors surface at
//! startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for formledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Registration Errors ===
    /// The password and its confirmation differ.
    #[error("password and repeated password do not match")]
    PasswordMismatch,

    // === Record Store Errors ===
    /// Appending to the registrations file failed.
    #[error("failed to write registrations file {path}: {source}")]
    WriteFailed {
        /// Path to the registrations file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// The single writer task is no longer accepting records.
    #[error("registration writer is not running")]
    WriterClosed,

    // === Dataset Errors ===
    /// Reading the dataset file failed.
    #[error("failed to read dataset {path}: {source}")]
    ReadFailed {
        /// Path to the dataset file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Server Errors ===
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested listen address.
        addr: SocketAddr,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("server error: {0}")]
    Serve(String),

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for formledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a write failure for the given registrations file.
    #[must_use]
    pub fn write_failed(path: impl Into<PathBuf>, source: impl Into<csv::Error>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Create a read failure for the given dataset file.
    #[must_use]
    pub fn read_failed(path: impl Into<PathBuf>, source: impl Into<csv::Error>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Stable label for the class of failure, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PasswordMismatch => "validation-mismatch",
            Self::WriteFailed { .. } | Self::WriterClosed => "write-failed",
            Self::ReadFailed { .. } => "read-failed",
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => "config",
            Self::Bind { .. } | Self::Serve(_) => "server",
            Self::DirectoryCreate { .. } => "io",
            Self::Internal(_) => "internal",
        }
    }

    /// Check if this error means a registration could not be stored.
    #[must_use]
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::WriteFailed { .. } | Self::WriterClosed)
    }
}
