//! CLI surface and deterministic test harness for the inter-board
//! robotics message bus, exposing `init`, `start`, `send`, `wait_for`,
//! and `stop` as both CLI subcommands and library entry points.
//!
//! This crate is the ambient layer the core deliberately excludes: a
//! config file format, a `clap` binary wiring those five operations to
//! whichever binding (`mbus-can` or `mbus-xbee`) the config names, and an
//! in-process `LoopbackLink`-backed test double used by this crate's own
//! integration tests and available to downstream test suites.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod any_bus;
pub mod config;
pub mod error;

pub use any_bus::AnyBus;
pub use config::BindingConfig;
pub use error::{exit_code, HarnessError, Result};

/// Parse a payload given on the command line as a hex string (e.g.
/// `"0a1b"` or the empty string for no payload) into raw bytes.
pub fn parse_hex_payload(text: &str) -> Result<Vec<u8>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    if text.len() % 2 != 0 {
        return Err(HarnessError::InvalidPayload { payload: text.to_string(), reason: "odd number of hex digits".into() });
    }

    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .map_err(|_| HarnessError::InvalidPayload { payload: text.to_string(), reason: format!("invalid hex byte at offset {i}") })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_empty_payload() {
        assert_eq!(parse_hex_payload("").expect("parses"), Vec::<u8>::new());
    }

    #[test]
    fn valid_hex_decodes_bytes_in_order() {
        assert_eq!(parse_hex_payload("0a1bff").expect("parses"), vec![0x0A, 0x1B, 0xFF]);
    }

    #[test]
    fn odd_length_is_rejected() {
        let err = parse_hex_payload("0a1").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidPayload { .. }));
    }

    #[test]
    fn non_hex_characters_are_rejected() {
        let err = parse_hex_payload("zz").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidPayload { .. }));
    }
}
