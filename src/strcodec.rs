//! OSC string codec: null-terminated, 4-byte padded strings.

use crate::argument::round_up_4;
use crate::error::{Error, Result};

/// Scans `buf` for a null-terminated, zero-padded OSC string and returns its
/// total padded wire size (including the terminator and padding).
pub fn validate(buf: &[u8]) -> Result<usize> {
    let term = buf.iter().position(|&b| b == 0).ok_or(Error::Term)?;
    let padded = 4 * (term / 4 + 1);
    if padded > buf.len() {
        return Err(Error::Size);
    }
    for &b in &buf[term..padded] {
        if b != 0 {
            return Err(Error::Pad);
        }
    }
    Ok(padded)
}

/// Decodes a string previously validated by [`validate`].
pub fn decode(buf: &[u8]) -> Result<String> {
    let term = buf.iter().position(|&b| b == 0).ok_or(Error::Term)?;
    String::from_utf8(buf[..term].to_vec()).map_err(|_| Error::InvalidArg)
}

/// Padded wire size of `s` as a null-terminated OSC string.
pub fn wire_size(s: &str) -> usize {
    4 * (s.len() / 4 + 1)
}

/// Encodes `s` (null-terminated, zero-padded to a 4-byte boundary) into `out`.
pub fn encode(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(s.as_bytes());
    let padded = round_up_4(s.len() + 1);
    out.extend(std::iter::repeat(0u8).take(padded - s.len()));
}
