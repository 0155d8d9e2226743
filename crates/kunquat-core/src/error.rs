//! The shared error type returned from fallible constructors and loader
//! entry points across the workspace.
//!
//! The audio-thread dispatch path never constructs this type — invalid
//! events or devices there are logged and skipped, not surfaced as
//! `Result`s (see `kunquat_player::handler`).

use alloc::string::String;

/// A construction-time or loader-boundary failure.
///
/// Grounded in the `#[error(...)]`/`#[from]` shape of a config-loader error
/// enum: one variant per failure category, carrying enough context
/// (position, message) to report without re-deriving it downstream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KunquatError {
    /// A parsed value (project JSON, event expression, pattern data)
    /// failed a format check at a known byte/field position.
    #[error("format error at position {position}: {message}")]
    Format {
        /// Byte or field offset the failure was detected at.
        position: usize,
        /// Human-readable description of the failure.
        message: String,
    },
    /// A referenced resource (sample, processor, pattern, column) does not
    /// exist.
    #[error("resource error: {0}")]
    Resource(String),
    /// A caller-supplied argument was out of range or otherwise invalid.
    #[error("argument error: {0}")]
    Argument(String),
    /// An operation was attempted in a state that does not permit it (e.g.
    /// mixing before the graph has been compiled).
    #[error("state error: {0}")]
    State(String),
}

impl KunquatError {
    /// Constructs a [`KunquatError::Format`] variant.
    pub fn format(position: usize, message: impl Into<String>) -> Self {
        KunquatError::Format {
            position,
            message: message.into(),
        }
    }

    /// Constructs a [`KunquatError::Resource`] variant.
    pub fn resource(message: impl Into<String>) -> Self {
        KunquatError::Resource(message.into())
    }

    /// Constructs a [`KunquatError::Argument`] variant.
    pub fn argument(message: impl Into<String>) -> Self {
        KunquatError::Argument(message.into())
    }

    /// Constructs a [`KunquatError::State`] variant.
    pub fn state(message: impl Into<String>) -> Self {
        KunquatError::State(message.into())
    }
}

/// Convenience alias for a `Result` defaulting its error type to
/// [`KunquatError`].
pub type Result<T> = core::result::Result<T, KunquatError>;
