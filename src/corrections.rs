//! Shared field corrections for the SAV export defects.
//!
//! Both front ends funnel raw mapping and element payloads through this
//! module so they cannot diverge. The export has two known rendering
//! defects: the IPv4 prefix carries its octets in reversed order, and the
//! interface value is rendered as a 32-bit big-endian integer of which only
//! the most-significant byte is real.

use crate::error::{DecodeError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Reverse the dot-separated octets of an exported IPv4 prefix.
///
/// The export renders `192.0.2.100` as `100.2.0.192`. Reversal is its own
/// inverse, so it must be applied exactly once per mapping entry.
pub(crate) fn reverse_prefix_octets(raw: &str) -> String {
    let mut parts: Vec<&str> = raw.split('.').collect();
    parts.reverse();
    parts.join(".")
}

/// Extract the real interface identifier from its 32-bit display value.
///
/// Only bits 31-24 carry the identifier; the lower bits are a rendering
/// artifact and are discarded.
pub(crate) fn interface_from_display(raw: u32) -> u32 {
    (raw >> 24) & 0xff
}

/// Decode an enterprise element payload that must be exactly one byte.
pub(crate) fn decode_element_byte(data: &[u8]) -> Result<u8> {
    match data {
        [value] => Ok(*value),
        _ => Err(DecodeError::UnsupportedPayloadLength { len: data.len() }),
    }
}

/// Decode the textual `0xNN` element form used by the dump output.
pub(crate) fn decode_element_hex(token: &str) -> Result<u8> {
    let digits = token.strip_prefix("0x").unwrap_or(token);
    if digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DecodeError::UnsupportedPayloadLength {
            len: digits.len().div_ceil(2),
        });
    }
    let bytes: Vec<u8> = (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0))
        .collect();
    decode_element_byte(&bytes)
}

/// Decode the base64 element form used by the line-oriented object export.
/// Payloads that do not decode to exactly one byte are rejected, never
/// guessed at.
pub(crate) fn decode_element_base64(payload: &str) -> Result<u8> {
    let data = BASE64
        .decode(payload)
        .map_err(|_| DecodeError::UnsupportedPayloadLength { len: payload.len() })?;
    decode_element_byte(&data)
}
