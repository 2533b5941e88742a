//! Address and function-code constants observed on real boards.
//!
//! These are not interpreted anywhere in this crate: [`crate::can`] and
//! [`crate::xbee`] only move `receiver`/`sender`/`function_code` bytes
//! around. They're collected here so callers building on top of the
//! codec share one vocabulary instead of re-deriving magic numbers from
//! board firmware.

/// Board addresses used on the CAN bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CanAddress {
    /// Motion controller.
    Motor = 0x01,
    /// Navigation/odometry board.
    Navigation = 0x02,
    /// Arm controller.
    Arm = 0x03,
    /// Reserved broadcast address.
    Broadcast = 0xFF,
}

/// Board addresses used on the XBee radio link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum XbeeAddress {
    /// Base station / coordinator.
    Base = 0x01,
    /// Field unit.
    Rover = 0x03,
    /// Reserved broadcast address.
    Broadcast = 0xFF,
}

/// Function codes exchanged over the XBee link.
///
/// The top bit (0x80) marking a response is carried separately as
/// [`crate::message::LogicalMessage::is_response`]; these values are the
/// bare 7-bit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum XbeeFunctionCode {
    /// Request the current position/heading.
    GetPosition = 0x07,
    /// Command a forward move.
    Advance = 0x08,
    /// Command a stop.
    Stop = 0x09,
}
