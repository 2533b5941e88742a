//! Fixed-size byte framing for a [`CanFrame`], so the CAN binding can drive
//! the same byte-oriented [`mbus_core::Link`]/receiver-loop machinery the
//! XBee binding uses natively.
//!
//! A raw CAN socket hands back discrete frames, not a delimited byte
//! stream — there's no need for SOH/EOT or a checksum, since the kernel
//! already guarantees frame boundaries and data integrity. The record
//! format below exists purely to give `mbus-core::receiver::FrameDecoder`
//! something to chew on: 13 bytes in, one [`CanFrame`] out.
//!
//! Layout: `id: u32 LE | dlc: u8 | data: [u8; 8]`.

use mbus_proto::can::{CanFrame, MAX_PAYLOAD};

/// Size in bytes of one encoded record.
pub const RECORD_LEN: usize = 4 + 1 + MAX_PAYLOAD;

/// Encode a [`CanFrame`] to its fixed 13-byte record.
#[must_use]
pub fn encode(frame: &CanFrame) -> [u8; RECORD_LEN] {
    let mut record = [0u8; RECORD_LEN];
    record[0..4].copy_from_slice(&frame.id.to_le_bytes());
    record[4] = frame.dlc;
    record[5..13].copy_from_slice(&frame.data);
    record
}

/// Decode one fixed-size record back into a [`CanFrame`].
///
/// `bytes` must be exactly [`RECORD_LEN`] long.
#[must_use]
pub fn decode_one(bytes: &[u8]) -> CanFrame {
    let id = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let dlc = bytes[4];
    let mut data = [0u8; MAX_PAYLOAD];
    data.copy_from_slice(&bytes[5..13]);
    CanFrame { id, dlc, data }
}

/// Drain as many complete 13-byte records as `buf` holds.
///
/// Returns the decoded frames and the number of bytes consumed. A
/// trailing partial record is left in the buffer for the next read, same
/// as the XBee binding's partial-frame handling.
pub fn decode_many(buf: &[u8]) -> (Vec<CanFrame>, usize) {
    let complete = buf.len() / RECORD_LEN;
    let consumed = complete * RECORD_LEN;
    let frames = (0..complete).map(|i| decode_one(&buf[i * RECORD_LEN..(i + 1) * RECORD_LEN])).collect();
    (frames, consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips() {
        let frame = CanFrame { id: 0x1234_5678, dlc: 3, data: [1, 2, 3, 0, 0, 0, 0, 0] };
        let record = encode(&frame);
        assert_eq!(record.len(), RECORD_LEN);
        let (decoded, consumed) = decode_many(&record);
        assert_eq!(consumed, RECORD_LEN);
        assert_eq!(decoded, vec![frame]);
    }

    #[test]
    fn trailing_partial_record_is_retained() {
        let frame = CanFrame { id: 1, dlc: 0, data: [0; 8] };
        let mut buf = encode(&frame).to_vec();
        buf.extend_from_slice(&[0xAA, 0xBB]);

        let (decoded, consumed) = decode_many(&buf);
        assert_eq!(decoded, vec![frame]);
        assert_eq!(consumed, RECORD_LEN);
        assert_eq!(&buf[consumed..], &[0xAA, 0xBB]);
    }

    #[test]
    fn concatenated_records_decode_in_order() {
        let a = CanFrame { id: 1, dlc: 1, data: [0xAA, 0, 0, 0, 0, 0, 0, 0] };
        let b = CanFrame { id: 2, dlc: 1, data: [0xBB, 0, 0, 0, 0, 0, 0, 0] };
        let mut buf = encode(&a).to_vec();
        buf.extend_from_slice(&encode(&b));

        let (decoded, consumed) = decode_many(&buf);
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, vec![a, b]);
    }
}
