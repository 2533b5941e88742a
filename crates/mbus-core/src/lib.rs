//! Receiver loop, dispatcher, and request/response correlator shared by
//! the CAN and XBee transport bindings.
//!
//! This crate is the part of the bus that doesn't know or care which wire
//! it's running over: given something that implements [`link::Link`] and
//! something that can turn a [`mbus_proto::LogicalMessage`] into bytes and
//! back ([`instance::FrameEncoder`] / [`receiver::FrameDecoder`]), it
//! drives the background receiver worker, routes decoded frames to the
//! handler table or the pending-response map, and lets callers `send`
//! with an optional bounded wait for a correlated response.
//!
//! `mbus-can` and `mbus-xbee` plug their sockets/serial ports in as
//! [`link::Link`] implementations and their codecs in as the encoder/
//! decoder traits; `mbus-harness` wires the CLI around a [`instance::Bus`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod instance;
pub mod link;
pub mod receiver;

pub use dispatch::{Handler, HandlerTable, PendingResponses, SendHandle};
pub use error::{exit_code, BusError, Result};
pub use instance::{Bus, FrameEncoder};
pub use link::{Link, LoopbackLink, LoopbackPeer};
pub use receiver::{FrameDecoder, ReceiverHandle, POLL_INTERVAL};
