//! The BER element type and its typed views.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::length::{decode_length, encode_length, encoded_size};
use crate::{Error, Result, tag};

/// An immutable BER tag-length-value element.
///
/// The length is always `value.len()`; it is computed on encode and never
/// stored separately.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Element {
    tag: u8,
    value: Bytes,
}

impl Element {
    /// Creates an element from a tag and raw content bytes.
    #[must_use]
    pub fn new(tag: u8, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Creates a NULL element.
    #[must_use]
    pub const fn null() -> Self {
        Self::null_tagged(tag::NULL)
    }

    /// Creates a NULL element with a custom tag.
    #[must_use]
    pub const fn null_tagged(tag: u8) -> Self {
        Self {
            tag,
            value: Bytes::new(),
        }
    }

    /// Creates a BOOLEAN element.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::boolean_tagged(tag::BOOLEAN, value)
    }

    /// Creates a BOOLEAN element with a custom tag.
    #[must_use]
    pub fn boolean_tagged(tag: u8, value: bool) -> Self {
        Self::new(tag, Bytes::from_static(if value { &[0xFF] } else { &[0x00] }))
    }

    /// Creates an INTEGER element using the minimal two's-complement form.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::integer_tagged(tag::INTEGER, value)
    }

    /// Creates an INTEGER element with a custom tag.
    #[must_use]
    pub fn integer_tagged(tag: u8, value: i64) -> Self {
        Self::new(tag, encode_integer(value))
    }

    /// Creates an ENUMERATED element.
    #[must_use]
    pub fn enumerated(value: i64) -> Self {
        Self::integer_tagged(tag::ENUMERATED, value)
    }

    /// Creates an OCTET STRING element.
    #[must_use]
    pub fn octet_string(value: impl AsRef<[u8]>) -> Self {
        Self::octet_string_tagged(tag::OCTET_STRING, value)
    }

    /// Creates an OCTET STRING element with a custom tag.
    #[must_use]
    pub fn octet_string_tagged(tag: u8, value: impl AsRef<[u8]>) -> Self {
        Self::new(tag, Bytes::copy_from_slice(value.as_ref()))
    }

    /// Creates a SEQUENCE element from its members.
    #[must_use]
    pub fn sequence(elements: impl IntoIterator<Item = Self>) -> Self {
        Self::sequence_tagged(tag::SEQUENCE, elements)
    }

    /// Creates a constructed element with a custom tag from its members.
    #[must_use]
    pub fn sequence_tagged(tag: u8, elements: impl IntoIterator<Item = Self>) -> Self {
        let mut buf = BytesMut::new();
        for element in elements {
            element.encode_to(&mut buf);
        }
        Self::new(tag, buf.freeze())
    }

    /// Creates a SET element from its members.
    #[must_use]
    pub fn set(elements: impl IntoIterator<Item = Self>) -> Self {
        Self::sequence_tagged(tag::SET, elements)
    }

    /// Returns the tag byte.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        self.tag
    }

    /// Returns the content bytes.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the content as shared bytes.
    #[must_use]
    pub fn value_bytes(&self) -> Bytes {
        self.value.clone()
    }

    /// Returns the content length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Returns true if the content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Returns true if the tag marks a constructed encoding.
    #[must_use]
    pub const fn is_constructed(&self) -> bool {
        tag::is_constructed(self.tag)
    }

    /// Returns the number of bytes [`Element::encode`] produces.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + encoded_size(self.value.len()) + self.value.len()
    }

    /// Appends the encoded element to `buf`.
    pub fn encode_to(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.tag);
        encode_length(self.value.len(), buf);
        buf.put_slice(&self.value);
    }

    /// Encodes the element.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf.freeze()
    }

    /// Decodes a buffer that holds exactly one element.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is truncated, uses a forbidden length
    /// form, or has bytes left over after the element.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (element, consumed) = Self::decode_prefix(bytes)?;
        if consumed != bytes.len() {
            return Err(Error::TrailingData {
                count: bytes.len() - consumed,
            });
        }
        Ok(element)
    }

    /// Decodes one element from the start of `bytes`.
    ///
    /// Returns the element and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is truncated or uses a forbidden
    /// length form.
    pub fn decode_prefix(bytes: &[u8]) -> Result<(Self, usize)> {
        let Some(&tag) = bytes.first() else {
            return Err(Error::Truncated {
                needed: 2,
                available: 0,
            });
        };
        let (length, length_size) = decode_length(&bytes[1..]).map_err(|e| match e {
            Error::Truncated { needed, .. } => Error::Truncated {
                needed: needed + 1,
                available: bytes.len(),
            },
            other => other,
        })?;
        let start = 1 + length_size;
        let Some(end) = start.checked_add(length) else {
            return Err(Error::ElementTooLarge {
                length,
                max: usize::MAX - start,
            });
        };
        let Some(content) = bytes.get(start..end) else {
            return Err(Error::Truncated {
                needed: end,
                available: bytes.len(),
            });
        };
        Ok((Self::new(tag, Bytes::copy_from_slice(content)), end))
    }

    /// Fails with [`Error::TypeMismatch`] unless the tag equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch.
    pub const fn expect_tag(&self, expected: u8, kind: &'static str) -> Result<&Self> {
        if self.tag == expected {
            Ok(self)
        } else {
            Err(Error::TypeMismatch {
                expected,
                actual: self.tag,
                kind,
            })
        }
    }

    /// Interprets the element as a universal SEQUENCE.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or malformed members.
    pub fn decode_as_sequence(&self) -> Result<Vec<Self>> {
        self.decode_as_sequence_tagged(tag::SEQUENCE)
    }

    /// Interprets the element as a sequence carrying `expected` as its tag.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or malformed members.
    pub fn decode_as_sequence_tagged(&self, expected: u8) -> Result<Vec<Self>> {
        self.expect_tag(expected, "sequence")?;
        self.members()
    }

    /// Interprets the element as a universal SET.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or malformed members.
    pub fn decode_as_set(&self) -> Result<Vec<Self>> {
        self.expect_tag(tag::SET, "set")?;
        self.members()
    }

    /// Splits the content into member elements without checking the tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not a run of complete elements.
    pub fn members(&self) -> Result<Vec<Self>> {
        let mut members = Vec::new();
        let mut rest: &[u8] = &self.value;
        while !rest.is_empty() {
            let (element, consumed) = Self::decode_prefix(rest)?;
            members.push(element);
            rest = &rest[consumed..];
        }
        Ok(members)
    }

    /// Interprets the element as an OCTET STRING.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch.
    pub fn decode_as_octet_string(&self) -> Result<&[u8]> {
        self.decode_as_octet_string_tagged(tag::OCTET_STRING)
    }

    /// Interprets the element as an OCTET STRING with a custom tag.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch.
    pub fn decode_as_octet_string_tagged(&self, expected: u8) -> Result<&[u8]> {
        self.expect_tag(expected, "octet string")?;
        Ok(&self.value)
    }

    /// Interprets the element as a UTF-8 OCTET STRING.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or invalid UTF-8.
    pub fn decode_as_string(&self) -> Result<String> {
        self.decode_as_string_tagged(tag::OCTET_STRING)
    }

    /// Interprets the element as a UTF-8 OCTET STRING with a custom tag.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or invalid UTF-8.
    pub fn decode_as_string_tagged(&self, expected: u8) -> Result<String> {
        let bytes = self.decode_as_octet_string_tagged(expected)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::invalid("string", e.to_string()))
    }

    /// Interprets the element as an INTEGER.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or a value that does not fit in
    /// an `i64`.
    pub fn decode_as_integer(&self) -> Result<i64> {
        self.decode_as_integer_tagged(tag::INTEGER)
    }

    /// Interprets the element as an INTEGER with a custom tag.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or a value that does not fit in
    /// an `i64`.
    pub fn decode_as_integer_tagged(&self, expected: u8) -> Result<i64> {
        self.expect_tag(expected, "integer")?;
        decode_integer(&self.value, "integer")
    }

    /// Interprets the element as an INTEGER that fits in an `i32`.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or an out-of-range value.
    pub fn decode_as_i32(&self) -> Result<i32> {
        self.decode_as_i32_tagged(tag::INTEGER)
    }

    /// Interprets the element as an `i32` INTEGER with a custom tag.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or an out-of-range value.
    pub fn decode_as_i32_tagged(&self, expected: u8) -> Result<i32> {
        let value = self.decode_as_integer_tagged(expected)?;
        i32::try_from(value)
            .map_err(|_| Error::invalid("integer", format!("{value} does not fit in 32 bits")))
    }

    /// Interprets the element as an ENUMERATED value.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or an out-of-range value.
    pub fn decode_as_enumerated(&self) -> Result<i32> {
        self.decode_as_enumerated_tagged(tag::ENUMERATED)
    }

    /// Interprets the element as an ENUMERATED value with a custom tag.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or an out-of-range value.
    pub fn decode_as_enumerated_tagged(&self, expected: u8) -> Result<i32> {
        self.expect_tag(expected, "enumerated")?;
        let value = decode_integer(&self.value, "enumerated")?;
        i32::try_from(value)
            .map_err(|_| Error::invalid("enumerated", format!("{value} does not fit in 32 bits")))
    }

    /// Interprets the element as a BOOLEAN.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or content that is not one byte.
    pub fn decode_as_boolean(&self) -> Result<bool> {
        self.decode_as_boolean_tagged(tag::BOOLEAN)
    }

    /// Interprets the element as a BOOLEAN with a custom tag.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or content that is not one byte.
    pub fn decode_as_boolean_tagged(&self, expected: u8) -> Result<bool> {
        self.expect_tag(expected, "boolean")?;
        match self.value.as_ref() {
            [b] => Ok(*b != 0),
            _ => Err(Error::invalid(
                "boolean",
                format!("expected 1 content byte, got {}", self.value.len()),
            )),
        }
    }

    /// Interprets the element as a NULL.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or non-empty content.
    pub fn decode_as_null(&self) -> Result<()> {
        self.decode_as_null_tagged(tag::NULL)
    }

    /// Interprets the element as a NULL with a custom tag.
    ///
    /// # Errors
    ///
    /// Returns an error on a tag mismatch or non-empty content.
    pub fn decode_as_null_tagged(&self, expected: u8) -> Result<()> {
        self.expect_tag(expected, "null")?;
        if self.value.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid(
                "null",
                format!("expected no content, got {} bytes", self.value.len()),
            ))
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element(0x{:02X}, [", self.tag)?;
        for (i, b) in self.value.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        f.write_str("])")
    }
}

/// Encodes an integer in minimal two's-complement form.
pub(crate) fn encode_integer(value: i64) -> Bytes {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    // Drop leading bytes that only repeat the sign.
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    Bytes::copy_from_slice(&bytes[start..])
}

pub(crate) fn decode_integer(bytes: &[u8], kind: &'static str) -> Result<i64> {
    if bytes.is_empty() {
        return Err(Error::invalid(kind, "no content bytes"));
    }
    if bytes.len() > 8 {
        return Err(Error::invalid(
            kind,
            format!("{} content bytes exceed 64 bits", bytes.len()),
        ));
    }
    let negative = bytes[0] & 0x80 != 0;
    let init: i64 = if negative { -1 } else { 0 };
    Ok(bytes
        .iter()
        .fold(init, |acc, &b| (acc << 8) | i64::from(b)))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::unreadable_literal,
    clippy::redundant_clone
)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding_is_minimal() {
        assert_eq!(Element::integer(0).value(), &[0x00]);
        assert_eq!(Element::integer(127).value(), &[0x7F]);
        assert_eq!(Element::integer(128).value(), &[0x00, 0x80]);
        assert_eq!(Element::integer(256).value(), &[0x01, 0x00]);
        assert_eq!(Element::integer(-1).value(), &[0xFF]);
        assert_eq!(Element::integer(-128).value(), &[0x80]);
        assert_eq!(Element::integer(-129).value(), &[0xFF, 0x7F]);
        assert_eq!(Element::integer(i64::MIN).len(), 8);
    }

    #[test]
    fn test_integer_decode() {
        for v in [0, 1, -1, 127, 128, -128, -129, 65535, i64::from(i32::MAX), i64::MIN, i64::MAX] {
            assert_eq!(Element::integer(v).decode_as_integer().unwrap(), v);
        }
    }

    #[test]
    fn test_integer_rejects_empty_and_oversized() {
        assert!(Element::new(tag::INTEGER, vec![]).decode_as_integer().is_err());
        assert!(Element::new(tag::INTEGER, vec![1; 9]).decode_as_integer().is_err());
    }

    #[test]
    fn test_i32_range() {
        let big = Element::integer(i64::from(i32::MAX) + 1);
        assert!(big.decode_as_i32().is_err());
        assert_eq!(Element::integer(-5).decode_as_i32().unwrap(), -5);
    }

    #[test]
    fn test_encode_short() {
        let element = Element::octet_string("hi");
        assert_eq!(element.encode().as_ref(), &[0x04, 0x02, b'h', b'i']);
        assert_eq!(element.encoded_len(), 4);
    }

    #[test]
    fn test_encode_long_length() {
        let element = Element::octet_string(vec![0xAB; 200]);
        let encoded = element.encode();
        assert_eq!(&encoded[..3], &[0x04, 0x81, 200]);
        assert_eq!(encoded.len(), 203);
        assert_eq!(Element::decode(&encoded).unwrap(), element);
    }

    #[test]
    fn test_decode_truncated() {
        let err = Element::decode(&[0x04, 0x05, b'a', b'b']).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                needed: 7,
                available: 4
            }
        ));
    }

    #[test]
    fn test_decode_trailing() {
        let err = Element::decode(&[0x05, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, Error::TrailingData { count: 1 }));
    }

    #[test]
    fn test_decode_length_of_length_limit() {
        let err = Element::decode(&[0x04, 0x85, 0, 0, 0, 0, 1, 0]).unwrap_err();
        assert!(matches!(err, Error::LengthTooLarge(5)));
    }

    #[test]
    fn test_type_mismatch() {
        let element = Element::octet_string("x");
        let err = element.decode_as_integer().unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: tag::INTEGER,
                actual: tag::OCTET_STRING,
                kind: "integer"
            }
        ));
    }

    #[test]
    fn test_tag_override() {
        let element = Element::octet_string_tagged(0x80, "name");
        assert!(element.decode_as_string().is_err());
        assert_eq!(element.decode_as_string_tagged(0x80).unwrap(), "name");

        let flag = Element::boolean_tagged(0x81, true);
        assert!(flag.decode_as_boolean_tagged(0x81).unwrap());
    }

    #[test]
    fn test_sequence_members() {
        let seq = Element::sequence([Element::integer(5), Element::octet_string("a")]);
        let encoded = seq.encode();
        assert_eq!(
            encoded.as_ref(),
            &[0x30, 0x06, 0x02, 0x01, 0x05, 0x04, 0x01, b'a']
        );
        let members = Element::decode(&encoded).unwrap().decode_as_sequence().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].decode_as_integer().unwrap(), 5);
    }

    #[test]
    fn test_sequence_with_bad_member() {
        let seq = Element::new(tag::SEQUENCE, vec![0x04, 0x05, b'a']);
        assert!(matches!(
            seq.decode_as_sequence(),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_boolean_and_null() {
        assert_eq!(Element::boolean(true).value(), &[0xFF]);
        assert!(!Element::boolean(false).decode_as_boolean().unwrap());
        assert!(Element::new(tag::BOOLEAN, vec![]).decode_as_boolean().is_err());
        assert!(Element::null().decode_as_null().is_ok());
        assert!(Element::new(tag::NULL, vec![0]).decode_as_null().is_err());
    }

    #[test]
    fn test_enumerated() {
        let element = Element::enumerated(10);
        assert_eq!(element.tag(), tag::ENUMERATED);
        assert_eq!(element.decode_as_enumerated().unwrap(), 10);
    }

    #[test]
    fn test_debug_format() {
        let element = Element::octet_string([0x01, 0xAB]);
        assert_eq!(format!("{element:?}"), "Element(0x04, [01 AB])");
    }
}
