//! XBee frame codec: bit-exact byte layout over the RF serial link.
//!
//! ```text
//! offset  bytes  field
//!  0      1      SOH (0x01)
//!  1      1      total length L (1..255)
//!  2      1      ~L  (one's complement of L)
//!  3      1      receiver address
//!  4      1      sender address
//!  5      1      function code (bit 7 = response flag, bits 0-6 = code)
//!  6      1      message id
//!  7      2      header checksum (big-endian)
//!  9      N      payload (N = L - 12)
//!  9+N    2      payload checksum (little-endian)
//! 11+N    1      EOT (0x04)
//! ```
//!
//! The response flag has no dedicated field in the byte layout; it is
//! carried as the top bit of the function code byte, the same trick the
//! original CAN variant used for its "reply" function codes
//! (`FCT_REP_X = FCT_X | 0x80`). Priority is not representable on this
//! wire: decoded XBee messages always have `priority: None`.

use crate::{
    error::{ProtocolError, Result},
    message::LogicalMessage,
};

/// Start-of-header delimiter.
pub const SOH: u8 = 0x01;
/// End-of-transmission delimiter.
pub const EOT: u8 = 0x04;
/// Minimum valid frame length (empty payload).
pub const MIN_FRAME_LEN: usize = 12;
/// Maximum total frame length (`L` is a single byte, 1..=255).
pub const MAX_FRAME_LEN: usize = 255;
/// Maximum XBee payload, in bytes.
pub const MAX_PAYLOAD: usize = MAX_FRAME_LEN - MIN_FRAME_LEN;

const RESPONSE_BIT: u8 = 0x80;
const FUNCTION_CODE_MASK: u8 = 0x7F;

/// XOR-then-nibble-split checksum used for both header and payload.
///
/// `lsb = (xor & 0x0F) | 0x50`, `msb = ((xor & 0xF0) >> 4) | 0x50`. The
/// fixed `0x50` bias keeps every checksum byte in a printable ASCII band,
/// so it can never collide with [`SOH`]/[`EOT`].
#[must_use]
pub fn checksum(bytes: &[u8]) -> u16 {
    let xor = bytes.iter().fold(0u8, |acc, &b| acc ^ b);
    let lsb = (xor & 0x0F) | 0x50;
    let msb = ((xor & 0xF0) >> 4) | 0x50;
    (u16::from(msb) << 8) | u16::from(lsb)
}

/// Encode a logical message as an XBee frame.
///
/// Fails with [`ProtocolError::PayloadTooLong`] if the payload exceeds
/// [`MAX_PAYLOAD`] bytes, or [`ProtocolError::FieldOverflow`] if
/// `function_code` does not fit in the 7 bits left after the response
/// flag, or the receiver/sender/message_id don't fit in a byte.
pub fn encode(msg: &LogicalMessage) -> Result<Vec<u8>> {
    if msg.payload.len() > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLong { actual: msg.payload.len(), max: MAX_PAYLOAD });
    }
    if msg.function_code > u16::from(FUNCTION_CODE_MASK) {
        return Err(ProtocolError::FieldOverflow {
            field: "function_code",
            value: u32::from(msg.function_code),
            width: 7,
        });
    }
    check_byte("receiver", msg.receiver)?;
    check_byte("sender", msg.sender)?;

    let n = msg.payload.len();
    let l = MIN_FRAME_LEN + n;
    let mut buf = vec![0u8; l];

    buf[0] = SOH;
    buf[1] = l as u8;
    buf[2] = !(l as u8);
    buf[3] = msg.receiver as u8;
    buf[4] = msg.sender as u8;
    buf[5] = (u8::from(msg.is_response) << 7) | (msg.function_code as u8 & FUNCTION_CODE_MASK);
    buf[6] = msg.message_id;

    let header_checksum = checksum(&buf[1..7]);
    buf[7] = (header_checksum >> 8) as u8;
    buf[8] = (header_checksum & 0xFF) as u8;

    buf[9..9 + n].copy_from_slice(&msg.payload);

    let payload_checksum = checksum(&msg.payload);
    buf[9 + n] = (payload_checksum & 0xFF) as u8;
    buf[9 + n + 1] = (payload_checksum >> 8) as u8;

    buf[11 + n] = EOT;

    Ok(buf)
}

fn check_byte(field: &'static str, value: u16) -> Result<()> {
    if value > 0xFF {
        return Err(ProtocolError::FieldOverflow { field, value: u32::from(value), width: 8 });
    }
    Ok(())
}

/// Result of attempting to decode one frame from the front of a buffer.
#[derive(Debug)]
pub enum DecodeOutcome {
    /// A complete, valid frame was decoded. `usize` is the number of bytes
    /// consumed from the front of the buffer.
    Frame(LogicalMessage, usize),
    /// Not enough bytes are available yet to tell; retain the buffer and
    /// wait for more data.
    Incomplete,
}

/// Decode a single frame from the front of `buf`.
///
/// Validates, in order: length, `SOH`, length/complement consistency,
/// `EOT`, header checksum, payload checksum, and receiver address.
pub fn decode_one(buf: &[u8], own: u16, broadcast: u16) -> Result<DecodeOutcome> {
    if buf.len() < 2 {
        return Ok(DecodeOutcome::Incomplete);
    }
    if buf[0] != SOH {
        return Err(ProtocolError::FrameCorrupted { reason: "missing SOH delimiter" });
    }

    let l = buf[1] as usize;
    if buf.len() < 3 {
        return Ok(DecodeOutcome::Incomplete);
    }
    if buf[2] != !buf[1] {
        return Err(ProtocolError::FrameCorrupted { reason: "length/complement mismatch" });
    }
    if l < MIN_FRAME_LEN {
        return Err(ProtocolError::FrameTooShort { min: MIN_FRAME_LEN, actual: l });
    }
    if buf.len() < l {
        return Ok(DecodeOutcome::Incomplete);
    }
    if buf[l - 1] != EOT {
        return Err(ProtocolError::FrameCorrupted { reason: "missing EOT delimiter" });
    }

    let header_expected = checksum(&buf[1..7]);
    let header_actual = (u16::from(buf[7]) << 8) | u16::from(buf[8]);
    if header_actual != header_expected {
        return Err(ProtocolError::HeaderChecksumBad { expected: header_expected, actual: header_actual });
    }

    let n = l - MIN_FRAME_LEN;
    let payload = &buf[9..9 + n];
    let payload_expected = checksum(payload);
    let payload_actual = u16::from(buf[9 + n]) | (u16::from(buf[9 + n + 1]) << 8);
    if payload_actual != payload_expected {
        return Err(ProtocolError::PayloadChecksumBad { expected: payload_expected, actual: payload_actual });
    }

    let receiver = u16::from(buf[3]);
    let sender = u16::from(buf[4]);
    if receiver != own && receiver != broadcast {
        return Err(ProtocolError::AddressMismatch { receiver: u32::from(receiver), own: u32::from(own) });
    }

    let function_byte = buf[5];
    let message = LogicalMessage {
        receiver,
        sender,
        function_code: u16::from(function_byte & FUNCTION_CODE_MASK),
        message_id: buf[6],
        is_response: function_byte & RESPONSE_BIT != 0,
        priority: None,
        function_mode: None,
        payload: payload.to_vec(),
    };

    Ok(DecodeOutcome::Frame(message, l))
}

/// Drain every complete frame from the front of `buf`.
///
/// Tolerant of concatenation: if `buf` holds more than one complete frame,
/// each is decoded independently. Returns the decoded frames (or the
/// decode error for each malformed one found while resyncing) and the
/// number of bytes consumed; callers should retain `buf[consumed..]` for
/// the next read.
#[must_use]
pub fn decode_many(buf: &[u8], own: u16, broadcast: u16) -> (Vec<Result<LogicalMessage>>, usize) {
    let mut offset = 0;
    let mut out = Vec::new();

    while offset < buf.len() {
        match decode_one(&buf[offset..], own, broadcast) {
            Ok(DecodeOutcome::Frame(msg, consumed)) => {
                out.push(Ok(msg));
                offset += consumed;
            },
            Ok(DecodeOutcome::Incomplete) => break,
            Err(e) => {
                out.push(Err(e));
                offset += resync_skip(&buf[offset..]);
            },
        }
    }

    (out, offset)
}

/// How many bytes to skip past a frame that failed to decode, so the next
/// call can resynchronize. Uses the declared length when it looks sane,
/// otherwise skips a single byte.
fn resync_skip(buf: &[u8]) -> usize {
    if buf.len() >= 2 {
        let l = buf[1] as usize;
        if (MIN_FRAME_LEN..=buf.len()).contains(&l) {
            return l;
        }
    }
    1
}
