//! [`Link`] implementation over a serial port carrying an XBee radio.

use std::{
    io::{self, Read, Write},
    time::Duration,
};

use mbus_core::{config::XbeeConfig, error::BusError, Link};
use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::at;

/// A [`Link`] over a serial-attached XBee radio, already past the AT
/// configuration handshake by the time [`XbeeLink::open`] returns.
pub struct XbeeLink {
    port: Box<dyn SerialPort>,
}

impl XbeeLink {
    /// Open `config.serial_port` at the configured line settings and run
    /// the AT handshake. Fails the whole open on any handshake step
    /// failing.
    pub fn open(config: &XbeeConfig) -> Result<Self, BusError> {
        let mut port = serialport::new(&config.serial_port, config.serial.baud)
            .data_bits(data_bits(config.serial.data_bits))
            .parity(if config.serial.parity == 0 { Parity::None } else { Parity::Even })
            .stop_bits(if config.serial.stop_bits == 2 { StopBits::Two } else { StopBits::One })
            .timeout(Duration::from_millis(50))
            .open()
            .map_err(|err| BusError::OpenFailed { reason: err.to_string() })?;

        at::run_handshake(port.as_mut(), config)?;

        Ok(Self { port })
    }
}

fn data_bits(bits: u8) -> DataBits {
    match bits {
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

impl Link for XbeeLink {
    fn available(&mut self) -> io::Result<usize> {
        self.port.bytes_to_read().map(|n| n as usize).map_err(|err| io::Error::other(err.to_string()))
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.port.write(bytes)
    }

    fn close(&mut self) -> io::Result<()> {
        self.port.clear(serialport::ClearBuffer::All).map_err(|err| io::Error::other(err.to_string()))
    }
}
