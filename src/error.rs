//! Stable error taxonomy for the codec and dispatcher.
//!
//! Mirrors the error codes an OSC implementation conventionally exposes as
//! integer constants (`lop_err` in liblo); here each one is a variant of a
//! single `thiserror`-derived enum so callers can match on it directly.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No path string present where one was required.
    #[error("missing path")]
    NoPath,
    /// No typespec string present where one was required.
    #[error("missing type")]
    NoType,
    /// The transport protocol named by a caller is not recognised.
    #[error("unknown protocol")]
    UnknownProto,
    /// No destination port could be determined.
    #[error("no port")]
    NoPort,
    /// Reserved for a transport that rejects a packet outright because it
    /// cannot be sent over the wire at all (path MTU, platform datagram
    /// limit); the codec guards against oversized length prefixes with
    /// `Size` instead, since that's what the original's `lop_validate_blob`
    /// raises for this condition.
    #[error("message too big")]
    TooBig,
    /// A post-condition that should be impossible in well-formed code was violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
    /// A caller-declared size budget was exceeded while building a value.
    #[error("allocation limit exceeded")]
    Alloc,
    /// A path string failed validation (missing terminator handled by `Term`; this
    /// is for a path that is otherwise structurally invalid, e.g. empty).
    #[error("invalid path")]
    InvalidPath,
    /// An argument's type code is outside the closed OSC type set.
    #[error("invalid type code {0:?}")]
    InvalidType(char),
    /// A typespec string does not begin with `,`.
    #[error("typespec must begin with ','")]
    BadType,
    /// A length field or remaining-buffer computation didn't line up.
    #[error("size mismatch")]
    Size,
    /// An argument's payload failed type-specific validation.
    #[error("invalid argument")]
    InvalidArg,
    /// A null-terminated string never hit a zero byte within the buffer.
    #[error("unterminated string")]
    Term,
    /// Non-zero bytes found in a string or blob's padding region.
    #[error("non-zero padding")]
    Pad,
    /// A bundle failed structural validation (bad literal, bad element length).
    #[error("invalid bundle")]
    InvalidBundle,
    /// A timetag was structurally invalid (reserved for future use; timetags are
    /// two raw u32s and cannot currently fail to parse on their own).
    #[error("invalid time")]
    InvalidTime,
}
