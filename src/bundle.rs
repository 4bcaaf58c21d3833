//! OSC bundle: `#bundle`, a timetag, and a list of length-prefixed elements
//! that are themselves messages or (recursively) bundles.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::timetag::Timetag;

const BUNDLE_TAG: &str = "#bundle";
/// `"#bundle\0"`, exactly 8 bytes, never padded further.
const BUNDLE_HEADER: &[u8; 8] = b"#bundle\0";

/// One packet nested inside a bundle: either a message at a path, or a
/// nested bundle. Messages are held by `Rc` so that the same message can
/// legally appear under more than one path within a bundle (sharing via
/// `Rc` makes an explicit dedup-then-free pass unnecessary).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    Message(String, Rc<Message>),
    Bundle(Box<Bundle>),
}

/// A time-stamped collection of messages and/or nested bundles.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bundle {
    pub timetag: Timetag,
    pub elements: Vec<Element>,
}

impl Bundle {
    pub fn new(timetag: Timetag) -> Self {
        Bundle {
            timetag,
            elements: Vec::new(),
        }
    }

    pub fn add_message(&mut self, path: impl Into<String>, message: impl Into<Rc<Message>>) -> &mut Self {
        self.elements.push(Element::Message(path.into(), message.into()));
        self
    }

    pub fn add_bundle(&mut self, bundle: Bundle) -> &mut Self {
        self.elements.push(Element::Bundle(Box::new(bundle)));
        self
    }

    /// Total serialised length: `16 + sum(4 + element_length)`.
    pub fn wire_size(&self) -> usize {
        16 + self
            .elements
            .iter()
            .map(|e| 4 + element_wire_size(e))
            .sum::<usize>()
    }

    /// Serialises this bundle to the bit-exact wire format. `max_size`
    /// bounds the total serialised length (a caller with no tighter bound
    /// can pass [`crate::blob::MAX_MSG_SIZE`]).
    pub fn serialize(&self, max_size: usize) -> Result<Vec<u8>> {
        let size = self.wire_size();
        if size > max_size {
            return Err(Error::Size);
        }
        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(BUNDLE_HEADER);
        out.extend_from_slice(&self.timetag.sec.to_be_bytes());
        out.extend_from_slice(&self.timetag.frac.to_be_bytes());
        for element in &self.elements {
            let bytes = encode_element(element, max_size)?;
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(&bytes);
        }
        if out.len() != size {
            return Err(Error::Internal("bundle serialise length mismatch"));
        }
        Ok(out)
    }

    /// Deserialises a bundle packet (the `#bundle\0` literal must already be
    /// known to be present; this validates and decodes the whole thing,
    /// recursing into nested bundles). `max_size` bounds each element's
    /// length prefix.
    pub fn deserialize(buf: &[u8], max_size: usize) -> Result<Bundle> {
        if buf.len() < 16 || &buf[0..8] != BUNDLE_HEADER {
            return Err(Error::InvalidBundle);
        }
        let sec = u32::from_be_bytes(buf[8..12].try_into().unwrap());
        let frac = u32::from_be_bytes(buf[12..16].try_into().unwrap());
        let timetag = Timetag::new(sec, frac);

        let mut bundle = Bundle::new(timetag);
        let mut cursor = &buf[16..];
        while !cursor.is_empty() {
            if cursor.len() < 4 {
                return Err(Error::InvalidBundle);
            }
            let len = u32::from_be_bytes(cursor[0..4].try_into().unwrap()) as usize;
            if len > max_size || 4 + len > cursor.len() {
                return Err(Error::InvalidBundle);
            }
            let element_buf = &cursor[4..4 + len];
            bundle.elements.push(decode_element(element_buf, max_size)?);
            cursor = &cursor[4 + len..];
        }
        Ok(bundle)
    }

    /// Flattens this bundle into `(path, message)` pairs with the bundle's
    /// timetag attached to each message, recursing into nested bundles in
    /// declaration order.
    pub fn flatten(&self) -> Vec<(String, Rc<Message>)> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<(String, Rc<Message>)>) {
        for element in &self.elements {
            match element {
                Element::Message(path, msg) => {
                    let mut tagged = (**msg).clone();
                    tagged.timetag = self.timetag;
                    out.push((path.clone(), Rc::new(tagged)));
                }
                Element::Bundle(inner) => inner.flatten_into(out),
            }
        }
    }
}

fn element_wire_size(element: &Element) -> usize {
    match element {
        Element::Message(path, msg) => msg.wire_size(path),
        Element::Bundle(b) => b.wire_size(),
    }
}

fn encode_element(element: &Element, max_size: usize) -> Result<Vec<u8>> {
    match element {
        Element::Message(path, msg) => msg.serialize(path, max_size),
        Element::Bundle(b) => b.serialize(max_size),
    }
}

fn decode_element(buf: &[u8], max_size: usize) -> Result<Element> {
    if buf.len() >= 8 && &buf[0..8] == BUNDLE_HEADER {
        Ok(Element::Bundle(Box::new(Bundle::deserialize(buf, max_size)?)))
    } else {
        let (path, msg) = Message::deserialize(buf, max_size)?;
        Ok(Element::Message(path, Rc::new(msg)))
    }
}

/// `true` if the leading string of a raw packet is the bundle literal.
pub fn is_bundle_literal(s: &str) -> bool {
    s == BUNDLE_TAG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_produces_exact_bundle_layout() {
        let mut bundle = Bundle::new(Timetag::new(1, 0));
        let mut msg = Message::new();
        msg.add_int32(42);
        bundle.add_message("/x", Rc::new(msg));

        let buf = bundle.serialize(crate::blob::MAX_MSG_SIZE).unwrap();
        assert_eq!(buf.len(), 36);
        assert_eq!(&buf[0..8], b"#bundle\0");
        assert_eq!(&buf[8..12], &1u32.to_be_bytes());
        assert_eq!(&buf[16..20], &16u32.to_be_bytes());
        assert_eq!(&buf[20..24], b"/x\0\0");
        assert_eq!(&buf[24..28], b",i\0\0");
        assert_eq!(&buf[28..32], &42i32.to_be_bytes());
    }

    #[test]
    fn round_trips_with_nested_bundle() {
        let mut inner = Bundle::new(Timetag::new(2, 0));
        let mut m1 = Message::new();
        m1.add_string("hi");
        inner.add_message("/inner", Rc::new(m1));

        let mut outer = Bundle::new(Timetag::new(1, 0));
        let mut m2 = Message::new();
        m2.add_int32(7);
        outer.add_message("/outer", Rc::new(m2));
        outer.add_bundle(inner);

        let buf = outer.serialize(crate::blob::MAX_MSG_SIZE).unwrap();
        let decoded = Bundle::deserialize(&buf, crate::blob::MAX_MSG_SIZE).unwrap();
        assert_eq!(decoded, outer);

        let flat = decoded.flatten();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].0, "/outer");
        assert_eq!(flat[1].0, "/inner");
    }

    #[test]
    fn same_message_twice_is_just_a_shared_rc() {
        let mut bundle = Bundle::new(Timetag::new(0, 1));
        let mut m = Message::new();
        m.add_int32(1);
        let shared = Rc::new(m);
        bundle.add_message("/a", shared.clone());
        bundle.add_message("/b", shared.clone());
        assert_eq!(Rc::strong_count(&shared), 3);
        let buf = bundle.serialize(crate::blob::MAX_MSG_SIZE).unwrap();
        assert!(Bundle::deserialize(&buf, crate::blob::MAX_MSG_SIZE).is_ok());
    }

    #[test]
    fn rejects_truncated_element_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(BUNDLE_HEADER);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&100u32.to_be_bytes()); // claims 100 bytes, none follow
        assert_eq!(
            Bundle::deserialize(&buf, crate::blob::MAX_MSG_SIZE),
            Err(Error::InvalidBundle)
        );
    }

    #[test]
    fn rejects_bad_literal() {
        let buf = vec![0u8; 16];
        assert_eq!(
            Bundle::deserialize(&buf, crate::blob::MAX_MSG_SIZE),
            Err(Error::InvalidBundle)
        );
    }

    #[test]
    fn serialize_rejects_when_over_a_caller_supplied_limit() {
        let mut bundle = Bundle::new(Timetag::new(1, 0));
        let mut msg = Message::new();
        msg.add_string("more bytes than the tiny limit below allows");
        bundle.add_message("/x", Rc::new(msg));
        assert_eq!(bundle.serialize(8), Err(Error::Size));
    }
}
