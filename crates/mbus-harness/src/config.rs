//! The harness's on-disk configuration file: one JSON document naming
//! which binding to speak and its parameters.

use std::{fs, path::Path};

use mbus_core::config::{CanConfig, XbeeConfig};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Which wire binding a harness session speaks, and that binding's
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "binding", rename_all = "snake_case")]
pub enum BindingConfig {
    /// Speak CAN, over the [`mbus_can`] SocketCAN binding.
    Can(CanConfig),
    /// Speak XBee, over the [`mbus_xbee`] serial binding (runs the AT
    /// handshake at open).
    Xbee(XbeeConfig),
}

/// Load a [`BindingConfig`] from a JSON file on disk.
pub fn load(path: &Path) -> Result<BindingConfig, HarnessError> {
    let text = fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead { path: path.display().to_string(), source })?;
    serde_json::from_str(&text).map_err(|source| HarnessError::ConfigParse { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_config_round_trips_through_json() {
        let config = BindingConfig::Can(CanConfig {
            interface_name: "can0".into(),
            own_address: 0x01,
            layout: mbus_core::config::CanLayout::A,
        });
        let json = serde_json::to_string_pretty(&config).expect("serializes");
        let parsed: BindingConfig = serde_json::from_str(&json).expect("parses");
        assert!(matches!(parsed, BindingConfig::Can(c) if c.interface_name == "can0"));
    }

    #[test]
    fn xbee_config_round_trips_through_json() {
        let config = BindingConfig::Xbee(XbeeConfig {
            serial_port: "/dev/ttyUSB0".into(),
            own_address: 0x02,
            serial: mbus_core::config::SerialParams::default(),
            aes_key: "00112233445566778899AABBCCDDEEFF".into(),
            pan_id: 0x1234,
            channel: 0x0C,
            destination_low: 0x01,
            destination_high: 0x00,
        });
        let json = serde_json::to_string_pretty(&config).expect("serializes");
        let parsed: BindingConfig = serde_json::from_str(&json).expect("parses");
        assert!(matches!(parsed, BindingConfig::Xbee(c) if c.serial_port == "/dev/ttyUSB0"));
    }

    #[test]
    fn unreadable_path_is_a_config_read_error() {
        let err = load(Path::new("/nonexistent/mbus-harness-config.json")).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigRead { .. }));
    }

    #[test]
    fn malformed_json_is_a_config_parse_error() {
        let dir = std::env::temp_dir().join("mbus-harness-test-malformed.json");
        fs::write(&dir, "{ not json").expect("writes temp file");
        let err = load(&dir).unwrap_err();
        fs::remove_file(&dir).ok();
        assert!(matches!(err, HarnessError::ConfigParse { .. }));
    }
}
