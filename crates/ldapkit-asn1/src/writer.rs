//! Buffer-oriented BER encoding.
//!
//! A [`Writer`] accumulates the encoding of a single outbound message.
//! Constructed elements are opened with [`Writer::begin_sequence`] and closed
//! with [`Writer::end_sequence`]; the length is filled in when the scope
//! closes, so members can be written directly without building intermediate
//! [`Element`] values.

use bytes::{BufMut, Bytes, BytesMut};

use crate::element::encode_integer;
use crate::length::encode_length;
use crate::{Element, tag};

/// Default initial capacity for a writer.
const DEFAULT_CAPACITY: usize = 256;

/// Growable buffer that BER elements are written into.
#[derive(Debug, Default)]
pub struct Writer {
    buf: BytesMut,
    open: Vec<usize>,
}

/// An open constructed element. Close it with [`Writer::end_sequence`].
#[derive(Debug)]
#[must_use = "an open sequence must be closed with Writer::end_sequence"]
pub struct SequenceScope {
    content_start: usize,
}

impl Writer {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            open: Vec::new(),
        }
    }

    /// Returns the number of bytes written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Discards everything written so far, including open scopes.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.open.clear();
    }

    /// Consumes the writer and returns the encoded bytes.
    #[must_use]
    pub fn freeze(self) -> Bytes {
        debug_assert!(self.open.is_empty(), "writer frozen with open sequences");
        self.buf.freeze()
    }

    /// Writes a pre-built element.
    pub fn add_element(&mut self, element: &Element) {
        element.encode_to(&mut self.buf);
    }

    /// Writes a primitive element from a tag and raw content.
    pub fn add_raw(&mut self, tag: u8, value: &[u8]) {
        self.buf.put_u8(tag);
        encode_length(value.len(), &mut self.buf);
        self.buf.put_slice(value);
    }

    /// Writes a NULL with the given tag.
    pub fn add_null_tagged(&mut self, tag: u8) {
        self.add_raw(tag, &[]);
    }

    /// Writes a BOOLEAN.
    pub fn add_boolean(&mut self, value: bool) {
        self.add_boolean_tagged(tag::BOOLEAN, value);
    }

    /// Writes a BOOLEAN with a custom tag.
    pub fn add_boolean_tagged(&mut self, tag: u8, value: bool) {
        self.add_raw(tag, &[if value { 0xFF } else { 0x00 }]);
    }

    /// Writes an INTEGER.
    pub fn add_integer(&mut self, value: i64) {
        self.add_integer_tagged(tag::INTEGER, value);
    }

    /// Writes an INTEGER with a custom tag.
    pub fn add_integer_tagged(&mut self, tag: u8, value: i64) {
        self.add_raw(tag, &encode_integer(value));
    }

    /// Writes an ENUMERATED value.
    pub fn add_enumerated(&mut self, value: i64) {
        self.add_integer_tagged(tag::ENUMERATED, value);
    }

    /// Writes an OCTET STRING.
    pub fn add_octet_string(&mut self, value: impl AsRef<[u8]>) {
        self.add_raw(tag::OCTET_STRING, value.as_ref());
    }

    /// Writes an OCTET STRING with a custom tag.
    pub fn add_octet_string_tagged(&mut self, tag: u8, value: impl AsRef<[u8]>) {
        self.add_raw(tag, value.as_ref());
    }

    /// Opens a universal SEQUENCE.
    pub fn begin_sequence(&mut self) -> SequenceScope {
        self.begin_sequence_tagged(tag::SEQUENCE)
    }

    /// Opens a constructed element with a custom tag.
    pub fn begin_sequence_tagged(&mut self, tag: u8) -> SequenceScope {
        self.buf.put_u8(tag);
        let content_start = self.buf.len();
        self.open.push(content_start);
        SequenceScope { content_start }
    }

    /// Closes a scope and writes its length.
    ///
    /// Scopes must be closed innermost first.
    pub fn end_sequence(&mut self, scope: SequenceScope) {
        let innermost = self.open.pop();
        debug_assert_eq!(
            innermost,
            Some(scope.content_start),
            "sequences closed out of order"
        );
        let content = self.buf.split_off(scope.content_start);
        encode_length(content.len(), &mut self.buf);
        self.buf.unsplit(content);
    }

    /// Writes a constructed element whose members are produced by `f`.
    pub fn sequence(&mut self, tag: u8, f: impl FnOnce(&mut Self)) {
        let scope = self.begin_sequence_tagged(tag);
        f(self);
        self.end_sequence(scope);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_elements() {
        let mut w = Writer::new();
        w.add_integer(5);
        w.add_boolean(true);
        w.add_octet_string("ab");
        assert_eq!(
            w.as_bytes(),
            &[0x02, 0x01, 0x05, 0x01, 0x01, 0xFF, 0x04, 0x02, b'a', b'b']
        );
    }

    #[test]
    fn test_nested_sequences() {
        let mut w = Writer::new();
        let outer = w.begin_sequence();
        w.add_integer(1);
        let inner = w.begin_sequence_tagged(0x63);
        w.add_octet_string("x");
        w.end_sequence(inner);
        w.end_sequence(outer);
        let expected = Element::sequence([
            Element::integer(1),
            Element::sequence_tagged(0x63, [Element::octet_string("x")]),
        ]);
        assert_eq!(w.freeze(), expected.encode());
    }

    #[test]
    fn test_long_sequence_length_is_patched() {
        let mut w = Writer::new();
        w.sequence(tag::SEQUENCE, |w| {
            w.add_octet_string(vec![0x11; 300]);
        });
        let bytes = w.freeze();
        assert_eq!(&bytes[..4], &[0x30, 0x82, 0x01, 0x30]);
        assert_eq!(&bytes[4..8], &[0x04, 0x82, 0x01, 0x2C]);
        let decoded = Element::decode(&bytes).unwrap();
        assert_eq!(decoded.decode_as_sequence().unwrap()[0].len(), 300);
    }

    #[test]
    fn test_matches_element_encoding() {
        let mut w = Writer::new();
        w.add_integer_tagged(0x80, -300);
        w.add_null_tagged(0x42);
        w.add_enumerated(2);
        let mut expected = BytesMut::new();
        Element::integer_tagged(0x80, -300).encode_to(&mut expected);
        Element::null_tagged(0x42).encode_to(&mut expected);
        Element::enumerated(2).encode_to(&mut expected);
        assert_eq!(w.as_bytes(), expected.as_ref());
    }

    #[test]
    fn test_clear() {
        let mut w = Writer::new();
        let _scope = w.begin_sequence();
        w.clear();
        assert!(w.is_empty());
        w.add_boolean(false);
        assert_eq!(w.len(), 3);
    }
}
