//! OSC blob: a 32-bit length-prefixed, 4-byte padded byte string.

use crate::argument::round_up_4;
use crate::error::{Error, Result};

/// Upper bound on a single blob's padded wire size, and a guard against
/// length-prefix integer overflow when validating untrusted input.
pub const MAX_MSG_SIZE: usize = 32_768;

/// An owned, opaque byte payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Blob(pub Vec<u8>);

impl Blob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Blob(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Total wire size including the 4-byte length prefix and padding.
    pub fn wire_size(&self) -> usize {
        4 + round_up_4(self.0.len())
    }

    /// Validates a blob at the start of `buf`, returning its total wire size
    /// (prefix + payload + padding) on success. `max_size` bounds the
    /// length prefix, rejecting it the same way an oversized packet would be
    /// rejected further up (a caller with no tighter bound can pass
    /// [`MAX_MSG_SIZE`]).
    pub fn validate(buf: &[u8], max_size: usize) -> Result<usize> {
        if buf.len() < 4 {
            return Err(Error::Size);
        }
        let n = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if n > max_size {
            return Err(Error::Size);
        }
        let total = 4 + round_up_4(n);
        if total > buf.len() {
            return Err(Error::Size);
        }
        for &b in &buf[4 + n..total] {
            if b != 0 {
                return Err(Error::Pad);
            }
        }
        Ok(total)
    }

    /// Decodes a blob previously validated by [`Blob::validate`].
    pub fn decode(buf: &[u8]) -> Self {
        let n = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        Blob(buf[4..4 + n].to_vec())
    }

    /// Encodes this blob (length prefix + payload + zero padding) into `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.0.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.0);
        let pad = round_up_4(self.0.len()) - self.0.len();
        out.extend(std::iter::repeat(0u8).take(pad));
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Blob(bytes)
    }
}
