//! Wire framing for the inter-board robotics message bus.
//!
//! This crate owns the part of the transport that is pure data: turning a
//! [`message::LogicalMessage`] into the bytes a CAN or XBee link actually
//! carries, and back. It knows nothing about sockets, serial ports,
//! threads, or how responses get correlated to requests — that lives in
//! the `mbus-core` crate, which this one is a dependency of.
//!
//! - [`can`]: bit-packed 29-bit CAN extended identifiers, two layouts.
//! - [`xbee`]: bit-exact serial frame with SOH/EOT delimiters and dual
//!   checksums.
//! - [`message`]: the binding-agnostic [`message::LogicalMessage`] both
//!   codecs produce and consume.
//! - [`samples`]: address/function-code constants observed on real
//!   boards, provided for convenience and never interpreted here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod can;
pub mod error;
pub mod message;
pub mod samples;
pub mod xbee;

pub use error::{ProtocolError, Result};
pub use message::{LogicalMessage, Priority};
