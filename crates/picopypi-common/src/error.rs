//! Unified error types for the picopypi workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum PicopypiError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration or definition value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid value.
        message: String,
    },

    /// An image reference is not pinned to a content digest.
    #[error("invalid image reference {reference:?}: {reason}")]
    InvalidReference {
        /// The offending reference.
        reference: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// An external command exited with a non-zero status.
    #[error("{program} exited with code {code}")]
    CommandFailed {
        /// Program that failed.
        program: String,
        /// Exit code, `-1` when terminated by a signal.
        code: i32,
    },

    /// No usable container engine was found.
    #[error("container engine {engine:?} is not available")]
    EngineUnavailable {
        /// Name of the engine binary.
        engine: String,
    },

    /// The user interrupted a running command.
    #[error("interrupted by user")]
    Interrupted,

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML rendering failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl PicopypiError {
    /// Builds an [`PicopypiError::Io`] from a path and an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a [`PicopypiError::Config`] from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PicopypiError>;
