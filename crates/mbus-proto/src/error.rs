//! Wire-level error taxonomy shared by the CAN and XBee codecs.

use thiserror::Error;

/// Errors produced while encoding or decoding a frame.
///
/// These are purely structural: they describe a malformed frame or an
/// out-of-range field. They carry no notion of which transport binding
/// produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload longer than the link-specific maximum.
    #[error("payload length {actual} exceeds maximum {max}")]
    PayloadTooLong {
        /// Length that was rejected.
        actual: usize,
        /// Link-specific maximum (8 for CAN, 243 for XBee).
        max: usize,
    },

    /// A field value does not fit in its bit width.
    #[error("field `{field}` value {value:#x} exceeds its {width}-bit width")]
    FieldOverflow {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was rejected.
        value: u32,
        /// Width, in bits, the field is allotted.
        width: u8,
    },

    /// Decoded receiver address matches neither this peer nor broadcast.
    ///
    /// Per the dispatch contract this is a silent drop, not a surfaced
    /// failure — callers that want to log it may, but the receiver loop
    /// does not treat it as noteworthy.
    #[error("receiver {receiver:#x} matches neither this peer ({own:#x}) nor broadcast")]
    AddressMismatch {
        /// Receiver address found in the frame.
        receiver: u32,
        /// This peer's own address.
        own: u32,
    },

    /// Buffer (or declared frame length) shorter than the minimum frame.
    #[error("frame too short: need at least {min} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum valid frame length.
        min: usize,
        /// Length actually available.
        actual: usize,
    },

    /// Structural corruption: bad delimiter or length/complement mismatch.
    #[error("frame corrupted: {reason}")]
    FrameCorrupted {
        /// Human-readable description of which structural check failed.
        reason: &'static str,
    },

    /// XBee header checksum did not match.
    #[error("xbee header checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    HeaderChecksumBad {
        /// Checksum computed from the received header bytes.
        expected: u16,
        /// Checksum bytes found on the wire.
        actual: u16,
    },

    /// XBee payload checksum did not match.
    #[error("xbee payload checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    PayloadChecksumBad {
        /// Checksum computed from the received payload bytes.
        expected: u16,
        /// Checksum bytes found on the wire.
        actual: u16,
    },
}

/// Convenience alias for fallible codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
