//! Errors for project-directory loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a project directory.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a file's JSON content.
    #[error("failed to parse '{path}': {source}")]
    JsonParse {
        /// Path of the file whose content failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A `bind.json` entry referenced a bind that would create a cycle.
    #[error("bind map in '{path}' contains a cycle")]
    BindCycle {
        /// Path of the offending bind file.
        path: PathBuf,
    },

    /// A `bind.json` entry had a malformed predicate or target expression.
    #[error("bad expression in '{path}': {reason}")]
    BadBindExpr {
        /// Path of the offending bind file.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a read-file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a JSON-parse error.
    pub fn json_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ConfigError::JsonParse {
            path: path.into(),
            source,
        }
    }
}
