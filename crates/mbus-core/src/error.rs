//! Error taxonomy for the transport/dispatch engine.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a [`crate::instance::Bus`] and its bindings.
///
/// The receiver worker never propagates these — it logs via `tracing` and
/// continues (see [`crate::receiver`]). Only the open path and the
/// send/wait path return `BusError` to the caller.
#[derive(Error, Debug)]
pub enum BusError {
    /// Underlying device failed to open.
    #[error("open failed: {reason}")]
    OpenFailed {
        /// Description of the failure.
        reason: String,
    },

    /// CAN socket bind to its interface failed.
    #[error("bind failed on interface {interface}: {reason}")]
    BindFailed {
        /// Interface name that was being bound.
        interface: String,
        /// Description of the failure.
        reason: String,
    },

    /// A write to the link failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of the failure.
        reason: String,
    },

    /// A read from the link failed.
    #[error("read failed: {reason}")]
    ReadFailed {
        /// Description of the failure.
        reason: String,
    },

    /// `start` was called while the receiver was already running.
    #[error("receiver already listening")]
    AlreadyListening,

    /// A send-with-wait elapsed without a matching response.
    #[error("timed out after {elapsed:?} waiting for message id {message_id}")]
    Timeout {
        /// How long the caller waited.
        elapsed: Duration,
        /// Message id that never received a response.
        message_id: u8,
    },

    /// A waiter observed the receiver stop before its response arrived.
    #[error("wait cancelled: receiver stopped while awaiting message id {message_id}")]
    Cancelled {
        /// Message id whose wait was cancelled.
        message_id: u8,
    },

    /// One step of the XBee AT handshake failed.
    #[error("AT handshake step `{step}` failed: {reason}")]
    ATHandshake {
        /// Name of the parameter/step being configured (e.g. `"ATBD"`).
        step: &'static str,
        /// Description of the failure.
        reason: String,
    },

    /// A frame failed to encode or decode.
    #[error(transparent)]
    Protocol(#[from] mbus_proto::ProtocolError),
}

/// Convenience alias for fallible bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Map a [`BusError`] to a stable process exit code, one per error kind, so
/// scripts driving `mbus-harness` can branch on failure class.
#[must_use]
pub fn exit_code(err: &BusError) -> i32 {
    match err {
        BusError::OpenFailed { .. } => 10,
        BusError::BindFailed { .. } => 11,
        BusError::WriteFailed { .. } => 12,
        BusError::ReadFailed { .. } => 13,
        BusError::AlreadyListening => 14,
        BusError::Timeout { .. } => 15,
        BusError::Cancelled { .. } => 16,
        BusError::ATHandshake { .. } => 17,
        BusError::Protocol(_) => 18,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_kind() {
        let errors = vec![
            BusError::OpenFailed { reason: "x".into() },
            BusError::BindFailed { interface: "can0".into(), reason: "x".into() },
            BusError::WriteFailed { reason: "x".into() },
            BusError::ReadFailed { reason: "x".into() },
            BusError::AlreadyListening,
            BusError::Timeout { elapsed: Duration::from_millis(5), message_id: 1 },
            BusError::Cancelled { message_id: 1 },
            BusError::ATHandshake { step: "ATBD", reason: "x".into() },
        ];

        let codes: std::collections::HashSet<i32> = errors.iter().map(exit_code).collect();
        assert_eq!(codes.len(), errors.len());
    }
}
