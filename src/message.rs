//! OSC message: a typespec string plus a packed argument list, and the
//! builder/serialiser/deserialiser pair.

use crate::argument::{Argument, TypeTag};
use crate::blob::Blob;
use crate::error::{Error, Result};
use crate::strcodec;
use crate::timetag::{Timetag, IMMEDIATE};

/// Opaque identifier for whoever sent a packet in to the dispatcher. Actual
/// address resolution (UDP/TCP/Unix socket address) is out of scope for this
/// crate; callers hand in whatever descriptor their transport uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Source(pub String);

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source(s)
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source(s.to_string())
    }
}

/// A single OSC message: an ordered argument list plus the metadata a
/// dispatcher attaches but that never appears on the wire (the bundle
/// timetag it arrived under, and where it came from).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    args: Vec<Argument>,
    /// The timetag of the bundle this message was dispatched from, or
    /// `IMMEDIATE` for a message that arrived on its own.
    pub timetag: Timetag,
    /// Where this message came from, if the caller supplied one.
    pub source: Option<Source>,
}

impl Default for Message {
    fn default() -> Self {
        Message {
            args: Vec::new(),
            timetag: IMMEDIATE,
            source: None,
        }
    }
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// The arguments of this message, in declaration order.
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// The typespec string this message would serialise with: `,` followed
    /// by one character per argument.
    pub fn typespec(&self) -> String {
        std::iter::once(',')
            .chain(self.args.iter().map(|a| a.type_tag().code()))
            .collect()
    }

    /// Appends one argument. The canonical, type-safe replacement for the
    /// variadic C `add(typestring, ...)` entry point: there is no
    /// sentinel to get wrong because `Argument` already carries its own tag.
    pub fn add(&mut self, arg: Argument) -> &mut Self {
        self.args.push(arg);
        self
    }

    /// Appends every argument in `args`, in order.
    pub fn add_from_iter(&mut self, args: impl IntoIterator<Item = Argument>) -> &mut Self {
        self.args.extend(args);
        self
    }

    pub fn add_int32(&mut self, v: i32) -> &mut Self {
        self.add(Argument::Int32(v))
    }
    pub fn add_float32(&mut self, v: f32) -> &mut Self {
        self.add(Argument::Float32(v))
    }
    pub fn add_string(&mut self, v: impl Into<String>) -> &mut Self {
        self.add(Argument::String(v.into()))
    }
    pub fn add_blob(&mut self, v: impl Into<Blob>) -> &mut Self {
        self.add(Argument::Blob(v.into()))
    }
    pub fn add_int64(&mut self, v: i64) -> &mut Self {
        self.add(Argument::Int64(v))
    }
    pub fn add_time(&mut self, v: Timetag) -> &mut Self {
        self.add(Argument::Time(v))
    }
    pub fn add_float64(&mut self, v: f64) -> &mut Self {
        self.add(Argument::Float64(v))
    }
    pub fn add_symbol(&mut self, v: impl Into<String>) -> &mut Self {
        self.add(Argument::Symbol(v.into()))
    }
    pub fn add_char(&mut self, v: char) -> &mut Self {
        self.add(Argument::Char(v))
    }
    pub fn add_midi(&mut self, v: [u8; 4]) -> &mut Self {
        self.add(Argument::Midi(v))
    }
    pub fn add_true(&mut self) -> &mut Self {
        self.add(Argument::True)
    }
    pub fn add_false(&mut self) -> &mut Self {
        self.add(Argument::False)
    }
    pub fn add_nil(&mut self) -> &mut Self {
        self.add(Argument::Nil)
    }
    pub fn add_infinitum(&mut self) -> &mut Self {
        self.add(Argument::Infinitum)
    }

    /// Attaches a bundle timetag, mirroring `OSCMessage::at_date` in the
    /// app this crate's dispatch model is adapted from.
    pub fn at_time(mut self, timetag: Timetag) -> Self {
        self.timetag = timetag;
        self
    }

    /// The wire size this message would serialise to at `path`: padded path
    /// + padded typespec + packed argument data.
    pub fn wire_size(&self, path: &str) -> usize {
        strcodec::wire_size(path)
            + strcodec::wire_size(&self.typespec())
            + self.args.iter().map(Argument::wire_size).sum::<usize>()
    }

    /// Serialises `(path, self)` into the bit-exact OSC wire format.
    /// `max_size` bounds the serialised length (a caller with no tighter
    /// bound can pass [`crate::blob::MAX_MSG_SIZE`]).
    pub fn serialize(&self, path: &str, max_size: usize) -> Result<Vec<u8>> {
        if path.is_empty() {
            return Err(Error::NoPath);
        }
        let typespec = self.typespec();
        let size = self.wire_size(path);
        if size > max_size {
            return Err(Error::Size);
        }
        let mut out = Vec::with_capacity(size);
        strcodec::encode(path, &mut out);
        strcodec::encode(&typespec, &mut out);
        for arg in &self.args {
            arg.encode(&mut out);
        }
        debug_assert_eq!(out.len(), size);
        Ok(out)
    }

    /// Deserialises a single OSC message packet, returning its path and the
    /// decoded `Message`. `buf` must contain exactly one packet with no
    /// trailing bytes ("remaining bytes after the last argument must
    /// equal zero"). `max_size` bounds any blob argument's length prefix.
    pub fn deserialize(buf: &[u8], max_size: usize) -> Result<(String, Message)> {
        if buf.is_empty() {
            return Err(Error::NoPath);
        }
        let path_len = strcodec::validate(buf)?;
        let path = strcodec::decode(&buf[..path_len])?;

        let rest = &buf[path_len..];
        if rest.is_empty() {
            return Err(Error::NoType);
        }
        let type_len = strcodec::validate(rest)?;
        let typespec = strcodec::decode(&rest[..type_len])?;
        if !typespec.starts_with(',') {
            return Err(Error::BadType);
        }

        let mut data = &rest[type_len..];
        let mut msg = Message::new();
        for c in typespec.chars().skip(1) {
            let tag = TypeTag::from_code(c)?;
            let (arg, consumed) = Argument::decode(tag, data, max_size)?;
            msg.add(arg);
            data = &data[consumed..];
        }
        if !data.is_empty() {
            return Err(Error::Size);
        }
        Ok((path, msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typespec_begins_with_comma_and_tracks_args() {
        let mut m = Message::new();
        m.add_int32(1).add_string("x");
        assert_eq!(m.typespec(), ",is");
    }

    #[test]
    fn serialize_produces_exact_message_layout() {
        let mut m = Message::new();
        m.add_int32(23).add_float32(0.5);
        let buf = m.serialize("/foo", crate::blob::MAX_MSG_SIZE).unwrap();
        assert_eq!(buf.len(), 20);
        assert_eq!(&buf[0..4], b"/foo");
        assert_eq!(buf[4], 0);
        assert_eq!(&buf[8..11], b",if");
        assert_eq!(&buf[12..16], &23i32.to_be_bytes());
        assert_eq!(&buf[16..20], &0x3f00_0000u32.to_be_bytes());
    }

    #[test]
    fn round_trip_preserves_path_and_args() {
        let mut m = Message::new();
        m.add_int32(-7)
            .add_string("hello")
            .add_blob(vec![9, 9, 9])
            .add_true()
            .add_time(Timetag::new(5, 6));
        let buf = m.serialize("/a/b/c", crate::blob::MAX_MSG_SIZE).unwrap();
        assert_eq!(buf.len() % 4, 0);
        let (path, decoded) = Message::deserialize(&buf, crate::blob::MAX_MSG_SIZE).unwrap();
        assert_eq!(path, "/a/b/c");
        assert_eq!(decoded.args(), m.args());
    }

    #[test]
    fn deserialize_rejects_typespec_missing_leading_comma() {
        let mut buf = Vec::new();
        strcodec::encode("/x", &mut buf);
        strcodec::encode("if", &mut buf); // missing leading comma
        assert_eq!(Message::deserialize(&buf, crate::blob::MAX_MSG_SIZE), Err(Error::BadType));
    }

    #[test]
    fn deserialize_rejects_trailing_garbage() {
        let mut m = Message::new();
        m.add_int32(1);
        let mut buf = m.serialize("/x", crate::blob::MAX_MSG_SIZE).unwrap();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(Message::deserialize(&buf, crate::blob::MAX_MSG_SIZE), Err(Error::Size));
    }

    #[test]
    fn empty_path_is_rejected_on_serialize() {
        let m = Message::new();
        assert_eq!(m.serialize("", crate::blob::MAX_MSG_SIZE), Err(Error::NoPath));
    }

    #[test]
    fn serialize_rejects_when_over_a_caller_supplied_limit() {
        let mut m = Message::new();
        m.add_string("this message is longer than the tiny limit below");
        assert_eq!(m.serialize("/x", 8), Err(Error::Size));
    }
}
