//! Runtime dispatch over whichever binding a harness session is driving.
//!
//! The CLI only learns which binding it's speaking (CAN or XBee) once it
//! has read the config file, so it needs one concrete type that can hold
//! either a `Bus<CanLink>` or a `Bus<XbeeLink>` and forward the handful of
//! operations ([`crate::cli`]'s `init`/`start`/`send`/`wait-for`/`stop`)
//! both share.

use std::{sync::Arc, time::Duration};

use mbus_can::{CanCodec, CanLink};
use mbus_core::{config::CanLayout, Bus};
use mbus_proto::{
    message::{BROADCAST_4BIT, BROADCAST_8BIT},
    LogicalMessage,
};
use mbus_xbee::{XbeeCodec, XbeeLink};

use crate::{config::BindingConfig, error::Result};

/// A running bus instance, over whichever binding [`BindingConfig`] named.
pub enum AnyBus {
    /// A CAN-bound instance.
    Can(Arc<Bus<CanLink>>),
    /// An XBee-bound instance.
    Xbee(Arc<Bus<XbeeLink>>),
}

fn can_broadcast(layout: CanLayout) -> u16 {
    match layout {
        CanLayout::A => BROADCAST_8BIT,
        CanLayout::B => BROADCAST_4BIT,
    }
}

impl AnyBus {
    /// Open the binding `config` names. For XBee this runs the AT
    /// configuration handshake before returning; failure there
    /// aborts the open and leaves nothing running.
    pub fn open(config: &BindingConfig) -> Result<Self> {
        match config {
            BindingConfig::Can(can) => {
                let link = CanLink::open(&can.interface_name)?;
                let codec = Arc::new(CanCodec::new(can.layout));
                let bus = Bus::new(link, can.own_address, can_broadcast(can.layout), 0x0F, codec.clone(), codec);
                Ok(Self::Can(bus))
            },
            BindingConfig::Xbee(xbee) => {
                let link = XbeeLink::open(xbee)?;
                let codec = Arc::new(XbeeCodec);
                let bus = Bus::new(link, xbee.own_address, BROADCAST_8BIT, 0xFF, codec.clone(), codec);
                Ok(Self::Xbee(bus))
            },
        }
    }

    /// Start the receiver worker (the CLI's `start` operation).
    pub fn start(&self) -> Result<()> {
        match self {
            Self::Can(bus) => bus.start().map_err(Into::into),
            Self::Xbee(bus) => bus.start().map_err(Into::into),
        }
    }

    /// Stop and join the receiver worker (the CLI's `stop` operation).
    pub fn stop(&self) {
        match self {
            Self::Can(bus) => bus.stop(),
            Self::Xbee(bus) => bus.stop(),
        }
    }

    /// Whether the receiver worker is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        match self {
            Self::Can(bus) => bus.is_running(),
            Self::Xbee(bus) => bus.is_running(),
        }
    }

    /// Encode and write a message, optionally waiting for its correlated
    /// response (the CLI's `send` operation).
    pub fn send(
        &self,
        receiver: u16,
        function_code: u16,
        payload: Vec<u8>,
        message_id: Option<u8>,
        is_response: bool,
        timeout: Duration,
    ) -> Result<Option<LogicalMessage>> {
        match self {
            Self::Can(bus) => bus.send(receiver, function_code, payload, message_id, is_response, timeout).map_err(Into::into),
            Self::Xbee(bus) => bus.send(receiver, function_code, payload, message_id, is_response, timeout).map_err(Into::into),
        }
    }

    /// Wait for a response already correlated to `message_id`, without
    /// sending anything (the CLI's `wait-for` operation).
    pub fn wait_for(&self, message_id: u8, timeout: Duration) -> Result<LogicalMessage> {
        match self {
            Self::Can(bus) => bus.wait_for(message_id, timeout).map_err(Into::into),
            Self::Xbee(bus) => bus.wait_for(message_id, timeout).map_err(Into::into),
        }
    }
}
