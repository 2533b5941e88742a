//! Adapts [`mbus_proto::xbee`]'s byte-exact framing directly to
//! `mbus-core`'s [`FrameEncoder`]/[`FrameDecoder`] traits — no extra
//! framing needed, since XBee is already a delimited byte stream.

use mbus_core::{FrameDecoder, FrameEncoder};
use mbus_proto::{xbee, LogicalMessage, ProtocolError};

/// The XBee binding's (stateless) encoder/decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct XbeeCodec;

impl FrameEncoder for XbeeCodec {
    fn encode(&self, msg: &LogicalMessage) -> Result<Vec<u8>, ProtocolError> {
        xbee::encode(msg)
    }
}

impl FrameDecoder for XbeeCodec {
    fn decode_many(&self, buf: &[u8], own: u16, broadcast: u16) -> (Vec<Result<LogicalMessage, ProtocolError>>, usize) {
        xbee::decode_many(buf, own, broadcast)
    }
}
