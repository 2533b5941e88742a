//! Bridges [`mbus_proto::can`]'s bit-packed codec to `mbus-core`'s
//! byte-oriented [`FrameEncoder`]/[`FrameDecoder`] traits via the fixed
//! record framing in [`crate::record`].

use mbus_core::{FrameDecoder, FrameEncoder};
use mbus_proto::{
    can::{self, CanLayout},
    LogicalMessage, ProtocolError,
};

use crate::record;

/// The CAN binding's encoder/decoder, fixed to one [`CanLayout`] for the
/// lifetime of a [`mbus_core::Bus`] instance.
#[derive(Debug, Clone, Copy)]
pub struct CanCodec {
    layout: CanLayout,
}

impl CanCodec {
    /// A codec speaking `layout`.
    #[must_use]
    pub fn new(layout: CanLayout) -> Self {
        Self { layout }
    }
}

impl FrameEncoder for CanCodec {
    fn encode(&self, msg: &LogicalMessage) -> Result<Vec<u8>, ProtocolError> {
        let frame = can::encode(self.layout, msg)?;
        Ok(record::encode(&frame).to_vec())
    }
}

impl FrameDecoder for CanCodec {
    fn decode_many(&self, buf: &[u8], own: u16, broadcast: u16) -> (Vec<Result<LogicalMessage, ProtocolError>>, usize) {
        let (frames, consumed) = record::decode_many(buf);
        let results = frames.iter().map(|frame| can::decode(self.layout, frame, own, broadcast)).collect();
        (results, consumed)
    }
}

#[cfg(test)]
mod tests {
    use mbus_proto::message::BROADCAST_8BIT;

    use super::*;

    #[test]
    fn encode_then_decode_round_trips_through_the_record_framing() {
        let codec = CanCodec::new(CanLayout::A);
        let msg = LogicalMessage::request(0x02, 0x01, 0x21, 1).with_payload(vec![0xFF]);

        let bytes = codec.encode(&msg).expect("encodes");
        assert_eq!(bytes.len(), record::RECORD_LEN);

        let (results, consumed) = codec.decode_many(&bytes, 0x02, BROADCAST_8BIT);
        assert_eq!(consumed, bytes.len());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().expect("decodes"), &msg);
    }
}
