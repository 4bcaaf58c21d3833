//! Argument type codes and the tagged-union in-memory argument form.

use crate::blob::Blob;
use crate::error::{Error, Result};
use crate::timetag::Timetag;

/// One of the closed set of OSC argument type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int32,
    Float32,
    String,
    Blob,
    Int64,
    Time,
    Float64,
    Symbol,
    Char,
    Midi,
    True,
    False,
    Nil,
    Infinitum,
}

impl TypeTag {
    /// The ASCII character this type is written as in a typespec string.
    pub fn code(self) -> char {
        match self {
            TypeTag::Int32 => 'i',
            TypeTag::Float32 => 'f',
            TypeTag::String => 's',
            TypeTag::Blob => 'b',
            TypeTag::Int64 => 'h',
            TypeTag::Time => 't',
            TypeTag::Float64 => 'd',
            TypeTag::Symbol => 'S',
            TypeTag::Char => 'c',
            TypeTag::Midi => 'm',
            TypeTag::True => 'T',
            TypeTag::False => 'F',
            TypeTag::Nil => 'N',
            TypeTag::Infinitum => 'I',
        }
    }

    /// Parses a single typespec character. `INVALIDTYPE` for anything outside
    /// the closed set.
    pub fn from_code(c: char) -> Result<Self> {
        Ok(match c {
            'i' => TypeTag::Int32,
            'f' => TypeTag::Float32,
            's' => TypeTag::String,
            'b' => TypeTag::Blob,
            'h' => TypeTag::Int64,
            't' => TypeTag::Time,
            'd' => TypeTag::Float64,
            'S' => TypeTag::Symbol,
            'c' => TypeTag::Char,
            'm' => TypeTag::Midi,
            'T' => TypeTag::True,
            'F' => TypeTag::False,
            'N' => TypeTag::Nil,
            'I' => TypeTag::Infinitum,
            other => return Err(Error::InvalidType(other)),
        })
    }

    /// `true` for the four no-payload types.
    pub fn is_no_payload(self) -> bool {
        matches!(
            self,
            TypeTag::True | TypeTag::False | TypeTag::Nil | TypeTag::Infinitum
        )
    }

    /// `true` for the numeric coercion set `{i, f, h, d}`.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeTag::Int32 | TypeTag::Float32 | TypeTag::Int64 | TypeTag::Float64
        )
    }

    /// `true` for the string coercion set `{s, S}`.
    pub fn is_stringy(self) -> bool {
        matches!(self, TypeTag::String | TypeTag::Symbol)
    }
}

/// A 4-byte MIDI message, carried as raw bytes (port id, status, data1, data2).
pub type Midi = [u8; 4];

/// The in-memory form of one OSC argument.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Argument {
    Int32(i32),
    Float32(f32),
    String(String),
    Blob(Blob),
    Int64(i64),
    Time(Timetag),
    Float64(f64),
    Symbol(String),
    Char(char),
    Midi(Midi),
    True,
    False,
    Nil,
    Infinitum,
}

impl Argument {
    /// The type tag this argument was (or will be) encoded with.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Argument::Int32(_) => TypeTag::Int32,
            Argument::Float32(_) => TypeTag::Float32,
            Argument::String(_) => TypeTag::String,
            Argument::Blob(_) => TypeTag::Blob,
            Argument::Int64(_) => TypeTag::Int64,
            Argument::Time(_) => TypeTag::Time,
            Argument::Float64(_) => TypeTag::Float64,
            Argument::Symbol(_) => TypeTag::Symbol,
            Argument::Char(_) => TypeTag::Char,
            Argument::Midi(_) => TypeTag::Midi,
            Argument::True => TypeTag::True,
            Argument::False => TypeTag::False,
            Argument::Nil => TypeTag::Nil,
            Argument::Infinitum => TypeTag::Infinitum,
        }
    }
}

pub(crate) fn round_up_4(n: usize) -> usize {
    (n + 3) & !3
}

impl Argument {
    /// Wire size of this argument's payload (not counting its type char,
    /// which lives in the typespec string).
    pub fn wire_size(&self) -> usize {
        match self {
            Argument::Int32(_) | Argument::Float32(_) | Argument::Char(_) | Argument::Midi(_) => 4,
            Argument::Int64(_) | Argument::Time(_) | Argument::Float64(_) => 8,
            Argument::String(s) | Argument::Symbol(s) => crate::strcodec::wire_size(s),
            Argument::Blob(b) => b.wire_size(),
            Argument::True | Argument::False | Argument::Nil | Argument::Infinitum => 0,
        }
    }

    /// Appends this argument's big-endian, padded wire payload to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Argument::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Argument::Float32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Argument::Int64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Argument::Float64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Argument::Time(t) => {
                out.extend_from_slice(&t.sec.to_be_bytes());
                out.extend_from_slice(&t.frac.to_be_bytes());
            }
            Argument::String(s) | Argument::Symbol(s) => crate::strcodec::encode(s, out),
            Argument::Blob(b) => b.encode(out),
            // Wire representation is a single byte widened into the 4-byte
            // slot; masked to match the low byte `decode` reads back, so a
            // `char` outside Latin-1 round-trips to whatever `decode` would
            // produce rather than silently diverging from it.
            Argument::Char(c) => out.extend_from_slice(&((*c as u32) & 0xFF).to_be_bytes()),
            Argument::Midi(m) => out.extend_from_slice(m),
            Argument::True | Argument::False | Argument::Nil | Argument::Infinitum => {}
        }
    }

    /// Validates and decodes one argument of type `tag` at the start of
    /// `buf`, returning the argument and the number of bytes consumed.
    /// `max_size` bounds a blob's length prefix (irrelevant to every other
    /// variant, but threaded through uniformly rather than special-cased).
    pub fn decode(tag: TypeTag, buf: &[u8], max_size: usize) -> Result<(Argument, usize)> {
        Ok(match tag {
            TypeTag::Int32 => {
                require(buf, 4)?;
                (Argument::Int32(i32::from_be_bytes(buf[0..4].try_into().unwrap())), 4)
            }
            TypeTag::Float32 => {
                require(buf, 4)?;
                (Argument::Float32(f32::from_be_bytes(buf[0..4].try_into().unwrap())), 4)
            }
            TypeTag::Char => {
                require(buf, 4)?;
                let code = u32::from_be_bytes(buf[0..4].try_into().unwrap());
                let c = char::from_u32(code & 0xFF).ok_or(Error::InvalidArg)?;
                (Argument::Char(c), 4)
            }
            TypeTag::Midi => {
                require(buf, 4)?;
                let mut m = [0u8; 4];
                m.copy_from_slice(&buf[0..4]);
                (Argument::Midi(m), 4)
            }
            TypeTag::Int64 => {
                require(buf, 8)?;
                (Argument::Int64(i64::from_be_bytes(buf[0..8].try_into().unwrap())), 8)
            }
            TypeTag::Float64 => {
                require(buf, 8)?;
                (Argument::Float64(f64::from_be_bytes(buf[0..8].try_into().unwrap())), 8)
            }
            TypeTag::Time => {
                require(buf, 8)?;
                let sec = u32::from_be_bytes(buf[0..4].try_into().unwrap());
                let frac = u32::from_be_bytes(buf[4..8].try_into().unwrap());
                (Argument::Time(Timetag::new(sec, frac)), 8)
            }
            TypeTag::String => {
                let n = crate::strcodec::validate(buf)?;
                (Argument::String(crate::strcodec::decode(buf)?), n)
            }
            TypeTag::Symbol => {
                let n = crate::strcodec::validate(buf)?;
                (Argument::Symbol(crate::strcodec::decode(buf)?), n)
            }
            TypeTag::Blob => {
                let n = Blob::validate(buf, max_size)?;
                (Argument::Blob(Blob::decode(buf)), n)
            }
            TypeTag::True => (Argument::True, 0),
            TypeTag::False => (Argument::False, 0),
            TypeTag::Nil => (Argument::Nil, 0),
            TypeTag::Infinitum => (Argument::Infinitum, 0),
        })
    }

    /// Validates (without decoding) one argument of type `tag` at the start
    /// of `buf`, returning the number of bytes it occupies.
    pub fn validate(tag: TypeTag, buf: &[u8], max_size: usize) -> Result<usize> {
        Ok(match tag {
            TypeTag::Int32 | TypeTag::Float32 | TypeTag::Char | TypeTag::Midi => {
                require(buf, 4)?;
                4
            }
            TypeTag::Int64 | TypeTag::Float64 | TypeTag::Time => {
                require(buf, 8)?;
                8
            }
            TypeTag::String | TypeTag::Symbol => crate::strcodec::validate(buf)?,
            TypeTag::Blob => Blob::validate(buf, max_size)?,
            TypeTag::True | TypeTag::False | TypeTag::Nil | TypeTag::Infinitum => 0,
        })
    }
}

fn require(buf: &[u8], n: usize) -> Result<()> {
    if buf.len() < n {
        Err(Error::Size)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_code() {
        for c in ['i', 'f', 's', 'b', 'h', 't', 'd', 'S', 'c', 'm', 'T', 'F', 'N', 'I'] {
            let tag = TypeTag::from_code(c).unwrap();
            assert_eq!(tag.code(), c);
        }
    }

    #[test]
    fn unknown_code_is_invalid_type() {
        assert_eq!(TypeTag::from_code('z'), Err(Error::InvalidType('z')));
    }

    #[test]
    fn numeric_and_stringy_sets_are_correctly_classified() {
        assert!(TypeTag::Int32.is_numeric() && TypeTag::Float64.is_numeric());
        assert!(!TypeTag::String.is_numeric());
        assert!(TypeTag::String.is_stringy() && TypeTag::Symbol.is_stringy());
        assert!(!TypeTag::Int32.is_stringy());
    }

    #[test]
    fn no_payload_set_is_exactly_t_f_n_i() {
        for tag in [TypeTag::True, TypeTag::False, TypeTag::Nil, TypeTag::Infinitum] {
            assert!(tag.is_no_payload());
        }
        assert!(!TypeTag::Int32.is_no_payload());
    }

    #[test]
    fn encode_decode_round_trips_for_every_variant() {
        let samples = vec![
            Argument::Int32(-42),
            Argument::Float32(0.5),
            Argument::String("hi".into()),
            Argument::Blob(Blob::new(vec![1, 2, 3])),
            Argument::Int64(i64::MIN),
            Argument::Time(Timetag::new(1, 2)),
            Argument::Float64(1.25),
            Argument::Symbol("sym".into()),
            Argument::Char('x'),
            Argument::Midi([1, 2, 3, 4]),
            Argument::True,
            Argument::False,
            Argument::Nil,
            Argument::Infinitum,
        ];
        for arg in samples {
            let mut buf = Vec::new();
            arg.encode(&mut buf);
            assert_eq!(buf.len(), arg.wire_size());
            let (decoded, consumed) = Argument::decode(arg.type_tag(), &buf, crate::blob::MAX_MSG_SIZE).unwrap();
            assert_eq!(consumed, buf.len());
            assert_eq!(decoded, arg);
        }
    }

    #[test]
    fn char_round_trips_outside_latin1() {
        let mut buf = Vec::new();
        Argument::Char('\u{263A}').encode(&mut buf);
        let (decoded, consumed) = Argument::decode(TypeTag::Char, &buf, crate::blob::MAX_MSG_SIZE).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(decoded, Argument::Char('\u{3A}'));
    }

    #[test]
    fn int32_payload_is_big_endian() {
        let mut buf = Vec::new();
        Argument::Int32(0x0102_0304).encode(&mut buf);
        assert_eq!(buf, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn validate_rejects_truncated_fixed_width_payload() {
        assert_eq!(
            Argument::validate(TypeTag::Int64, &[0; 4], crate::blob::MAX_MSG_SIZE),
            Err(Error::Size)
        );
    }
}
