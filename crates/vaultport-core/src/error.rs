//! Error types for the export pipeline.
//!
//! All fatal errors are represented by the [`Error`] enum. Recoverable,
//! per-document problems are not errors at all: they travel as
//! [`Warning`](crate::Warning) values attached to each document.

use std::io;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// The core error type for all vaultport operations.
#[derive(ThisError, Debug)]
pub enum Error {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Directory exists but carries no `.obsidian` marker
    #[error("Not an Obsidian vault (missing .obsidian directory): {path}")]
    NotAVault { path: PathBuf },

    /// Vault has no markdown documents to export
    #[error("Vault contains no markdown documents: {path}")]
    EmptyVault { path: PathBuf },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Parse error
    #[error("Parse error: {reason}")]
    ParseError { reason: String },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    /// JSON/YAML serialization failure
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    /// The package container could not be written
    #[error("Package error: {reason}")]
    Package { reason: String },

    /// Generic unclassified error
    #[error("Error: {0}")]
    Other(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error
    pub fn io(err: io::Error) -> Self {
        Error::Io(err)
    }

    /// Create a missing vault marker error
    pub fn not_a_vault(path: impl Into<PathBuf>) -> Self {
        Error::NotAVault { path: path.into() }
    }

    /// Create an empty vault error
    pub fn empty_vault(path: impl Into<PathBuf>) -> Self {
        Error::EmptyVault { path: path.into() }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Create a parse error
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Error::ParseError {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(reason: impl Into<String>) -> Self {
        Error::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(reason: impl Into<String>) -> Self {
        Error::Serialization {
            reason: reason.into(),
        }
    }

    /// Create a package writing error
    pub fn package(reason: impl Into<String>) -> Self {
        Error::Package {
            reason: reason.into(),
        }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether this error stops the run before any document is transformed.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::NotAVault { .. } | Error::EmptyVault { .. })
    }
}
