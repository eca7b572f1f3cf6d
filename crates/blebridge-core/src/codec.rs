//! ValueChannel encode/decode and the write input grammar
//!
//! The characteristic carries exactly one unsigned 32-bit integer, little-endian.
//! Reads and notifications share [`decode_value`]; writes go through
//! [`parse_input`] and [`encode_value`].

use std::num::IntErrorKind;

use crate::errors::{DecodeError, ParseError};
use crate::protocol::VALUE_PAYLOAD_LEN;

/// Parse user input into a value to write
///
/// Surrounding whitespace is ignored. A `0x`/`0X` prefix selects base 16,
/// anything else is base 10. Nothing is ever clamped.
pub fn parse_input(text: &str) -> Result<u32, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };

    parsed.map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => ParseError::OutOfRange {
            input: trimmed.to_string(),
        },
        _ => ParseError::Malformed {
            input: trimmed.to_string(),
        },
    })
}

/// Encode a value into its 4-byte wire form
pub fn encode_value(value: u32) -> [u8; VALUE_PAYLOAD_LEN] {
    value.to_le_bytes()
}

/// Decode a read or notification payload
///
/// Bytes past the first four are ignored.
pub fn decode_value(payload: &[u8]) -> Result<u32, DecodeError> {
    match payload.first_chunk::<VALUE_PAYLOAD_LEN>() {
        Some(bytes) => Ok(u32::from_le_bytes(*bytes)),
        None => Err(short_payload(payload)),
    }
}

fn short_payload(payload: &[u8]) -> DecodeError {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.is_empty() && !text.chars().any(char::is_control) => {
            DecodeError::ShortText {
                text: text.to_string(),
            }
        }
        _ => DecodeError::TooShort {
            len: payload.len(),
        },
    }
}
