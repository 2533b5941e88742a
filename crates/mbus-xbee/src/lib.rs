//! XBee transport binding: the AT configuration handshake, a
//! [`mbus_core::Link`] over a serial port, and the codec plumbing that
//! wires `mbus-proto`'s XBee frame format into `mbus-core`'s receiver
//! loop.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod at;
pub mod codec;
pub mod serial;

pub use codec::XbeeCodec;
pub use serial::XbeeLink;
