//! Error types for Taller
//!
//! Every variant names the offending key, path, identifier or stage so the CLI
//! can report it without knowing anything about the user's model code.

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::StageError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Taller error types
#[derive(Error, Debug)]
pub enum Error {
    /// Container has neither a singleton nor a factory for the key
    #[error("Service '{0}' not found in container")]
    ServiceNotFound(String),

    /// Container entry exists but holds a different concrete type
    #[error("Service '{key}' is not a {expected}")]
    ServiceTypeMismatch {
        /// Container key
        key: String,
        /// Requested type name
        expected: &'static str,
    },

    /// Dotted type path could not be located or constructed
    #[error("Could not resolve '{path}': {cause}")]
    Resolution {
        /// Full dotted path as given
        path: String,
        /// Underlying reason
        cause: String,
    },

    /// No trainable type for the identifier
    #[error("Model {identifier} not found\nExpected file: {}\nExpected type: {identifier}\nDetails: {reason}", .expected_path.display())]
    ModelNotFound {
        /// Identifier as supplied on the command line
        identifier: String,
        /// Where the model source was expected
        expected_path: PathBuf,
        /// What was missing
        reason: String,
    },

    /// `app/Models` is absent (not inside a project)
    #[error("{} directory not found. Are you in a project?", .0.display())]
    ModelsDirMissing(PathBuf),

    /// Trainable constructor rejected its run config
    #[error("Failed to instantiate {identifier}: {cause}")]
    Instantiation {
        /// Model identifier
        identifier: String,
        /// Underlying reason
        cause: String,
    },

    /// One of the four pipeline stages failed
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Configuration file could not be parsed
    #[error("Config error in {}: {message}", .path.display())]
    Config {
        /// Offending file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Scaffolding refused to touch the filesystem
    #[error("Scaffold error: {0}")]
    Scaffold(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Resolution`] from anything displayable.
    pub fn resolution(path: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Resolution {
            path: path.into(),
            cause: cause.to_string(),
        }
    }
}
