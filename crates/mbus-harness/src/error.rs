//! Harness-level error taxonomy: config loading plus the underlying
//! [`mbus_core::BusError`] from whichever binding is in play.

use thiserror::Error;

/// Errors surfaced by the harness CLI and its library surface.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The config file couldn't be read from disk.
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        /// Path that was opened.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file's contents weren't valid JSON for a [`crate::config::BindingConfig`].
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        /// Path that was parsed.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A payload given as a hex string on the CLI wasn't valid hex.
    #[error("invalid hex payload {payload:?}: {reason}")]
    InvalidPayload {
        /// The offending string.
        payload: String,
        /// Description of why it failed to parse.
        reason: String,
    },

    /// The bus itself (open, send, wait, AT handshake, ...) failed.
    #[error(transparent)]
    Bus(#[from] mbus_core::BusError),
}

/// Convenience alias for fallible harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Map a [`HarnessError`] to a process exit code. Bus-originated errors
/// reuse [`mbus_core::exit_code`]'s per-kind mapping; harness-local
/// failures (bad config, bad CLI input) get their own low-numbered codes
/// so scripts can tell "never got as far as touching the link" apart from
/// a link-layer failure.
#[must_use]
pub fn exit_code(err: &HarnessError) -> i32 {
    match err {
        HarnessError::ConfigRead { .. } => 1,
        HarnessError::ConfigParse { .. } => 2,
        HarnessError::InvalidPayload { .. } => 3,
        HarnessError::Bus(inner) => mbus_core::exit_code(inner),
    }
}
