//! Shared configuration for both bindings.

use mbus_proto::can::CanLayout as ProtoCanLayout;
use serde::{Deserialize, Serialize};

/// Which CAN bit layout a binding speaks. Re-exported so config and
/// harness code don't need a direct `mbus-proto` dependency just to name
/// a layout.
pub type CanLayout = ProtoCanLayout;

/// Serial parameters fixed at 9600/none/8/1, kept as explicit config
/// fields rather than hardcoded constants so a config file can still
/// state them (and so a loader can reject a file that asks for anything
/// else).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialParams {
    /// Baud rate. Fixed to 9600.
    pub baud: u32,
    /// Parity bits. Fixed to 0 (none).
    pub parity: u8,
    /// Data bits per frame. Fixed to 8.
    pub data_bits: u8,
    /// Stop bits. Fixed to 1.
    pub stop_bits: u8,
}

impl Default for SerialParams {
    fn default() -> Self {
        Self { baud: 9600, parity: 0, data_bits: 8, stop_bits: 1 }
    }
}

/// Configuration for a CAN-bound bus instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanConfig {
    /// CAN interface name, e.g. `can0`.
    pub interface_name: String,
    /// This peer's own address.
    pub own_address: u16,
    /// Which bit layout to speak.
    pub layout: CanLayout,
}

/// Configuration for an XBee-bound bus instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XbeeConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0`.
    pub serial_port: String,
    /// This peer's own address.
    pub own_address: u16,
    /// Serial line parameters (fixed to 9600/none/8/1; validated at load).
    pub serial: SerialParams,
    /// Pre-shared AES key for the radio's link-layer encryption, as a hex
    /// string.
    pub aes_key: String,
    /// XBee PAN id.
    pub pan_id: u16,
    /// XBee RF channel.
    pub channel: u8,
    /// Low byte of the configured destination address.
    pub destination_low: u16,
    /// High byte of the configured destination address.
    pub destination_high: u16,
}

impl XbeeConfig {
    /// Whether this peer acts as the radio's coordinator: role is
    /// coordinator iff `own_address == 1`.
    #[must_use]
    pub fn is_coordinator(&self) -> bool {
        self.own_address == 1
    }
}
