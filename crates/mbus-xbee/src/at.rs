//! The one-time AT configuration handshake run at XBee link open.
//!
//! Runs directly against the serial port rather than through [`mbus_core::Link`]:
//! the handshake needs line-oriented reads with per-step timeouts (100ms for
//! most replies, 3000ms for the initial `+++`), which is a different shape
//! than the receiver loop's non-blocking poll.

use std::{
    io::{Read, Write},
    thread,
    time::{Duration, Instant},
};

use mbus_core::{config::XbeeConfig, error::BusError};
use serialport::{ClearBuffer, SerialPort};

const GUARD_TIME: Duration = Duration::from_millis(1100);
const SHORT_TIMEOUT: Duration = Duration::from_millis(100);
const ENTER_TIMEOUT: Duration = Duration::from_millis(3000);

struct Param {
    name: &'static str,
    command: &'static str,
    value: String,
}

/// The parameters set in order.
fn parameters(config: &XbeeConfig) -> Vec<Param> {
    vec![
        Param { name: "baudrate", command: "ATBD", value: "3".into() },
        Param { name: "parity", command: "ATNB", value: "0".into() },
        Param { name: "api_mode", command: "ATAP", value: "0".into() },
        Param { name: "aes_enable", command: "ATEE", value: "1".into() },
        Param { name: "aes_key", command: "ATKY", value: config.aes_key.clone() },
        Param { name: "channel", command: "ATCH", value: format!("{:X}", config.channel) },
        Param { name: "pan_id", command: "ATID", value: format!("{:X}", config.pan_id) },
        Param { name: "role", command: "ATCE", value: u8::from(config.is_coordinator()).to_string() },
        Param { name: "source_address", command: "ATMY", value: format!("{:X}", config.own_address) },
        Param { name: "destination_low", command: "ATDL", value: format!("{:X}", config.destination_low) },
        Param { name: "destination_high", command: "ATDH", value: format!("{:X}", config.destination_high) },
    ]
}

fn read_line(port: &mut dyn SerialPort, timeout: Duration, step: &'static str) -> Result<String, BusError> {
    let deadline = Instant::now() + timeout;
    let mut bytes = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        match port.read(&mut byte) {
            Ok(1) => {
                bytes.push(byte[0]);
                if byte[0] == b'\r' {
                    return Ok(String::from_utf8_lossy(&bytes).into_owned());
                }
            },
            Ok(_) => {},
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {},
            Err(err) => return Err(BusError::ATHandshake { step, reason: err.to_string() }),
        }
        if Instant::now() >= deadline {
            return Err(BusError::ATHandshake { step, reason: "timed out waiting for a reply".into() });
        }
    }
}

fn write_command(port: &mut dyn SerialPort, step: &'static str, command: &str) -> Result<(), BusError> {
    port.write_all(command.as_bytes()).map_err(|err| BusError::ATHandshake { step, reason: err.to_string() })
}

fn expect_ok(port: &mut dyn SerialPort, step: &'static str, command: &str) -> Result<(), BusError> {
    write_command(port, step, command)?;
    let reply = read_line(port, SHORT_TIMEOUT, step)?;
    if reply != "OK\r" {
        return Err(BusError::ATHandshake { step, reason: format!("unexpected reply {reply:?}") });
    }
    Ok(())
}

/// Run the full handshake: enter command mode, get-then-set each
/// parameter, persist, exit command mode, flush.
pub fn run_handshake(port: &mut dyn SerialPort, config: &XbeeConfig) -> Result<(), BusError> {
    thread::sleep(GUARD_TIME);
    write_command(port, "enter_command_mode", "+++")?;
    let reply = read_line(port, ENTER_TIMEOUT, "enter_command_mode")?;
    if reply != "OK\r" {
        return Err(BusError::ATHandshake { step: "enter_command_mode", reason: format!("unexpected reply {reply:?}") });
    }

    for param in parameters(config) {
        write_command(port, param.name, &format!("{}\r", param.command))?;
        let current = read_line(port, SHORT_TIMEOUT, param.name)?;
        let desired = format!("{}\r", param.value);
        if current == desired {
            continue;
        }
        expect_ok(port, param.name, &format!("{}{desired}", param.command))?;
    }

    expect_ok(port, "persist", "ATWR\r")?;
    expect_ok(port, "exit_command_mode", "ATCN\r")?;

    port.clear(ClearBuffer::Input).map_err(|err| BusError::ATHandshake { step: "flush", reason: err.to_string() })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mbus_core::config::SerialParams;

    use super::*;

    fn sample_config() -> XbeeConfig {
        XbeeConfig {
            serial_port: "/dev/ttyUSB0".into(),
            own_address: 0x02,
            serial: SerialParams::default(),
            aes_key: "00112233445566778899AABBCCDDEEFF".into(),
            pan_id: 0x1234,
            channel: 0x0C,
            destination_low: 0x01,
            destination_high: 0x00,
        }
    }

    #[test]
    fn parameters_are_in_the_spec_order() {
        let names: Vec<&str> = parameters(&sample_config()).iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "baudrate",
                "parity",
                "api_mode",
                "aes_enable",
                "aes_key",
                "channel",
                "pan_id",
                "role",
                "source_address",
                "destination_low",
                "destination_high",
            ]
        );
    }

    #[test]
    fn role_follows_coordinator_address() {
        let mut config = sample_config();
        config.own_address = 1;
        let role = parameters(&config).into_iter().find(|p| p.name == "role").expect("role present");
        assert_eq!(role.value, "1");

        config.own_address = 2;
        let role = parameters(&config).into_iter().find(|p| p.name == "role").expect("role present");
        assert_eq!(role.value, "0");
    }
}
