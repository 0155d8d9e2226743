//! The CLI/runtime-facade error type, grounded in `sonido-config::error::ConfigError`'s
//! `#[error(...)]` style (§7's four error kinds, narrowed to the two this
//! crate can itself raise; format/resource errors are `kunquat_config::ConfigError`
//! values surfaced through `From`).

/// Errors an [`crate::Engine`] call or the `kunquat-player` binary can raise.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// An invalid API call: a bad channel index, an out-of-range CLI flag,
    /// a section index past the end of the loaded sequence.
    #[error("argument error: {0}")]
    Argument(String),
    /// An action was attempted on a handle already past its useful
    /// lifetime (reserved for a future persistent-handle API; `Engine`'s
    /// current owned-value lifetime makes this unreachable today).
    #[error("state error: {0}")]
    State(String),
}
