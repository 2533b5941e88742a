//! CAN transport binding: a [`mbus_core::Link`] over a SocketCAN
//! interface, plus the codec plumbing that bridges the bit-packed
//! [`mbus_proto::can`] wire format through `mbus-core`'s byte-oriented
//! receiver loop via a fixed-size record framing.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod record;
pub mod socket;

pub use codec::CanCodec;
pub use socket::CanLink;
