//! CAN frame codec: bit-packed 29-bit extended identifiers.
//!
//! Two layouts are supported, selected at construction time via
//! [`CanLayout`]:
//!
//! - [`CanLayout::A`]: 8-bit addresses, 8-bit function code, no priority.
//! - [`CanLayout::B`]: 2-bit priority, 4-bit addresses, 4-bit function
//!   mode, 10-bit function code.
//!
//! Both pack into the 29 low bits of an extended CAN identifier; the core
//! never reads or writes the identifier directly, only through
//! [`encode`]/[`decode`].

use serde::{Deserialize, Serialize};

use crate::{
    error::{ProtocolError, Result},
    message::{LogicalMessage, Priority},
};

/// Maximum CAN data payload, in bytes (one classic CAN data frame).
pub const MAX_PAYLOAD: usize = 8;

/// A raw extended CAN data frame, as handed to/from the socket binding.
///
/// This is the minimal shape a raw CAN socket hands back: a 29-bit
/// identifier, a DLC, and up to 8 data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    /// 29-bit extended identifier (only the low 29 bits are meaningful).
    pub id: u32,
    /// Data length code: number of valid bytes in `data`.
    pub dlc: u8,
    /// Data bytes; only `data[..dlc]` is meaningful.
    pub data: [u8; MAX_PAYLOAD],
}

impl CanFrame {
    /// The payload, truncated to `dlc` bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }
}

/// Which bit layout a CAN binding speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanLayout {
    /// 8-bit addresses, 8-bit function code (older layout).
    A,
    /// 2-bit priority, 4-bit addresses, 4-bit function mode, 10-bit
    /// function code (newer layout).
    B,
}

fn check_width(field: &'static str, value: u32, width: u8) -> Result<()> {
    if value >= (1u32 << width) {
        return Err(ProtocolError::FieldOverflow { field, value, width });
    }
    Ok(())
}

/// Encode a logical message into a CAN extended frame under `layout`.
///
/// Fails with [`ProtocolError::PayloadTooLong`] if the payload exceeds 8
/// bytes, or [`ProtocolError::FieldOverflow`] if any identifier field
/// exceeds the width `layout` allots it.
pub fn encode(layout: CanLayout, msg: &LogicalMessage) -> Result<CanFrame> {
    if msg.payload.len() > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLong { actual: msg.payload.len(), max: MAX_PAYLOAD });
    }

    let id = match layout {
        CanLayout::A => {
            check_width("sender", u32::from(msg.sender), 8)?;
            check_width("receiver", u32::from(msg.receiver), 8)?;
            check_width("function_code", u32::from(msg.function_code), 8)?;
            check_width("message_id", u32::from(msg.message_id), 4)?;

            (u32::from(msg.sender) << 21)
                | (u32::from(msg.receiver) << 13)
                | (u32::from(msg.function_code) << 5)
                | (u32::from(msg.message_id) << 1)
                | u32::from(msg.is_response)
        },
        CanLayout::B => {
            let priority = msg.priority.unwrap_or(Priority::Normal);
            let mode = u32::from(msg.function_mode.unwrap_or(0));

            check_width("sender", u32::from(msg.sender), 4)?;
            check_width("receiver", u32::from(msg.receiver), 4)?;
            check_width("function_mode", mode, 4)?;
            check_width("function_code", u32::from(msg.function_code), 10)?;
            check_width("message_id", u32::from(msg.message_id), 4)?;

            (u32::from(priority.to_bits()) << 27)
                | (u32::from(msg.sender) << 23)
                | (u32::from(msg.receiver) << 19)
                | (mode << 15)
                | (u32::from(msg.function_code) << 5)
                | (u32::from(msg.message_id) << 1)
                | u32::from(msg.is_response)
        },
    };

    let mut data = [0u8; MAX_PAYLOAD];
    data[..msg.payload.len()].copy_from_slice(&msg.payload);

    Ok(CanFrame { id, dlc: msg.payload.len() as u8, data })
}

/// Decode a received CAN extended frame into a logical message.
///
/// Fails with [`ProtocolError::PayloadTooLong`] if `dlc > 8`, or
/// [`ProtocolError::AddressMismatch`] if the decoded receiver is neither
/// `own` nor `broadcast`.
pub fn decode(layout: CanLayout, frame: &CanFrame, own: u16, broadcast: u16) -> Result<LogicalMessage> {
    if frame.dlc as usize > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLong { actual: frame.dlc as usize, max: MAX_PAYLOAD });
    }

    let id = frame.id;
    let (sender, receiver, function_code, message_id, is_response, priority, function_mode) = match layout {
        CanLayout::A => {
            let sender = ((id >> 21) & 0xFF) as u16;
            let receiver = ((id >> 13) & 0xFF) as u16;
            let function_code = ((id >> 5) & 0xFF) as u16;
            let message_id = ((id >> 1) & 0xF) as u8;
            let is_response = (id & 1) != 0;
            (sender, receiver, function_code, message_id, is_response, None, None)
        },
        CanLayout::B => {
            let priority = Priority::from_bits(((id >> 27) & 0b11) as u8);
            let sender = ((id >> 23) & 0xF) as u16;
            let receiver = ((id >> 19) & 0xF) as u16;
            let function_mode = ((id >> 15) & 0xF) as u8;
            let function_code = ((id >> 5) & 0x3FF) as u16;
            let message_id = ((id >> 1) & 0xF) as u8;
            let is_response = (id & 1) != 0;
            (sender, receiver, function_code, message_id, is_response, Some(priority), Some(function_mode))
        },
    };

    if receiver != own && receiver != broadcast {
        return Err(ProtocolError::AddressMismatch {
            receiver: u32::from(receiver),
            own: u32::from(own),
        });
    }

    Ok(LogicalMessage {
        receiver,
        sender,
        function_code,
        message_id,
        is_response,
        priority,
        function_mode,
        payload: frame.payload().to_vec(),
    })
}
