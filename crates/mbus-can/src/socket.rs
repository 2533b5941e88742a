//! [`Link`] implementation over a raw, non-blocking SocketCAN interface.

use std::{collections::VecDeque, io};

use mbus_core::{error::BusError, Link};
use mbus_proto::can::{CanFrame, MAX_PAYLOAD};
use socketcan::{CanDataFrame, CanFrame as SocketCanFrame, CanSocket, EmbeddedFrame, ExtendedId, Id, Socket};
use tracing::warn;

use crate::record;

/// A [`Link`] over a SocketCAN interface (e.g. `can0`).
///
/// Frames read off the socket are immediately record-framed (see `record`)
/// into the internal byte inbox the receiver loop drains; frames handed
/// to [`Link::write`] are the reverse: exactly one (or more, concatenated)
/// 13-byte records, decoded back into a [`CanFrame`] and written to the
/// socket directly, with no retry — per-send reliability is the caller's
/// problem.
#[derive(Debug)]
pub struct CanLink {
    socket: CanSocket,
    inbox: VecDeque<u8>,
}

impl CanLink {
    /// Open and bind `interface` (e.g. `"can0"`), set to non-blocking mode.
    pub fn open(interface: &str) -> Result<Self, BusError> {
        let socket = CanSocket::open(interface)
            .map_err(|err| BusError::BindFailed { interface: interface.to_string(), reason: err.to_string() })?;
        socket.set_nonblocking(true).map_err(|err| BusError::OpenFailed { reason: err.to_string() })?;
        Ok(Self { socket, inbox: VecDeque::new() })
    }

    fn drain_socket(&mut self) -> io::Result<()> {
        loop {
            match self.socket.read_frame() {
                Ok(SocketCanFrame::Data(frame)) => self.inbox.extend(record::encode(&to_can_frame(&frame))),
                Ok(_) => {}, // remote/error frames carry nothing the bus interprets
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }
}

fn to_can_frame(frame: &CanDataFrame) -> CanFrame {
    let id = match frame.id() {
        Id::Extended(id) => id.as_raw(),
        Id::Standard(id) => u32::from(id.as_raw()),
    };
    let payload = frame.data();
    let mut data = [0u8; MAX_PAYLOAD];
    data[..payload.len()].copy_from_slice(payload);
    CanFrame { id, dlc: payload.len() as u8, data }
}

impl Link for CanLink {
    fn available(&mut self) -> io::Result<usize> {
        self.drain_socket()?;
        Ok(self.inbox.len())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.drain_socket()?;
        let n = self.inbox.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.inbox.pop_front().unwrap_or(0);
        }
        Ok(n)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        for chunk in bytes.chunks(record::RECORD_LEN) {
            if chunk.len() != record::RECORD_LEN {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "short CAN record"));
            }
            let frame = record::decode_one(chunk);
            let id = ExtendedId::new(frame.id).ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "identifier exceeds 29 bits"))?;
            let data_frame = CanDataFrame::new(id, frame.payload())
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "payload too long for a data frame"))?;
            self.socket.write_frame(&SocketCanFrame::Data(data_frame))?;
        }
        Ok(bytes.len())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for CanLink {
    fn drop(&mut self) {
        if let Err(err) = self.drain_socket() {
            warn!(error = %err, "final drain before close failed");
        }
    }
}
