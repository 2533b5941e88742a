//! The decoded, named-field view of a frame used above the codec.

/// Reserved address value accepted by every peer's receive filter, for
/// 8-bit address fields (CAN layout A, XBee).
pub const BROADCAST_8BIT: u16 = 0xFF;

/// Reserved broadcast address for 4-bit address fields (CAN layout B).
pub const BROADCAST_4BIT: u16 = 0xF;

/// Arbitration priority class. Opaque to the dispatcher; used only to bias
/// wire arbitration on links that carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Priority {
    /// Lowest arbitration priority.
    Background = 0,
    /// Default priority.
    Normal = 1,
    /// Elevated priority.
    High = 2,
    /// Highest arbitration priority.
    Critical = 3,
}

impl Priority {
    /// Reconstruct a priority from its 2-bit wire representation.
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Background,
            1 => Self::Normal,
            2 => Self::High,
            _ => Self::Critical,
        }
    }

    /// The 2-bit wire representation of this priority.
    #[must_use]
    pub fn to_bits(self) -> u8 {
        self as u8
    }
}

/// The decoded unit exchanged across the transport boundary.
///
/// Produced by [`crate::can`] or [`crate::xbee`] decode, and consumed by
/// the dispatcher/correlator in `mbus-core`. Nothing in this type is
/// specific to either wire binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalMessage {
    /// Address of the intended receiver (or broadcast).
    pub receiver: u16,
    /// Address of the sender.
    pub sender: u16,
    /// Application-level operation identifier. The core never interprets
    /// this value, only routes on it.
    pub function_code: u16,
    /// Per-instance counter used to correlate request and response.
    pub message_id: u8,
    /// Distinguishes a request from its response.
    pub is_response: bool,
    /// Arbitration priority class. `None` on bindings/layouts that don't
    /// carry one on the wire.
    pub priority: Option<Priority>,
    /// Function mode (CAN layout B only).
    pub function_mode: Option<u8>,
    /// Ordered payload octets.
    pub payload: Vec<u8>,
}

impl LogicalMessage {
    /// Start building a request (`is_response = false`) with no payload.
    #[must_use]
    pub fn request(receiver: u16, sender: u16, function_code: u16, message_id: u8) -> Self {
        Self {
            receiver,
            sender,
            function_code,
            message_id,
            is_response: false,
            priority: None,
            function_mode: None,
            payload: Vec::new(),
        }
    }

    /// Build the response counterpart to this message: same peers (swapped),
    /// same function code and message id, `is_response = true`.
    #[must_use]
    pub fn respond_to(&self, payload: Vec<u8>) -> Self {
        Self {
            receiver: self.sender,
            sender: self.receiver,
            function_code: self.function_code,
            message_id: self.message_id,
            is_response: true,
            priority: self.priority,
            function_mode: self.function_mode,
            payload,
        }
    }

    /// Attach a payload, consuming `self`.
    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
}
