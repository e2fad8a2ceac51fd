//! Stream-oriented BER decoding.
//!
//! [`StreamReader`] pulls elements from any [`std::io::Read`] source one at a
//! time, so a message can be walked without first buffering all of it. The
//! reader counts every byte it consumes; a [`SequenceCursor`] compares that
//! count against the end offset declared by its sequence header to decide
//! whether more members follow.

use std::io::{self, Read};

use bytes::Bytes;

use crate::length::{additional_bytes, assemble};
use crate::{Element, Error, Result};

/// Default upper bound on a single element's declared length (20 MiB).
pub const DEFAULT_MAX_ELEMENT_SIZE: usize = 20 * 1024 * 1024;

/// Incremental BER reader over a byte source.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
    peeked: Option<u8>,
    total_bytes_read: u64,
    max_element_size: usize,
}

/// Position tracker for a sequence opened by [`StreamReader::begin_sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCursor {
    tag: u8,
    length: usize,
    end: u64,
}

impl SequenceCursor {
    /// Returns the sequence tag.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        self.tag
    }

    /// Returns the declared content length.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Returns the stream offset at which the sequence ends.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Reports whether another member of the sequence remains to be read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadPastSequenceEnd`] if the reader has already
    /// consumed bytes beyond the declared end. This is a framing error:
    /// the stream position can no longer be trusted.
    pub fn has_more_elements<R: Read>(&self, reader: &StreamReader<R>) -> Result<bool> {
        let position = reader.total_bytes_read();
        if position < self.end {
            Ok(true)
        } else if position == self.end {
            Ok(false)
        } else {
            Err(Error::ReadPastSequenceEnd {
                length: self.length,
                end: self.end,
                position,
            })
        }
    }
}

impl<R: Read> StreamReader<R> {
    /// Creates a reader with the default maximum element size.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
            total_bytes_read: 0,
            max_element_size: DEFAULT_MAX_ELEMENT_SIZE,
        }
    }

    /// Sets the largest element length the reader will accept.
    #[must_use]
    pub const fn with_max_element_size(mut self, max: usize) -> Self {
        self.max_element_size = max;
        self
    }

    /// Returns the number of bytes consumed so far.
    ///
    /// A byte returned by [`StreamReader::peek`] is not counted until it is
    /// consumed.
    #[must_use]
    pub const fn total_bytes_read(&self) -> u64 {
        self.total_bytes_read
    }

    /// Returns the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Returns the next tag byte without consuming it, or `None` at the end
    /// of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        if self.peeked.is_none() {
            self.peeked = self.next_raw_byte()?;
        }
        Ok(self.peeked)
    }

    /// Returns the next tag byte without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] at the end of input.
    pub fn peek_tag(&mut self) -> Result<u8> {
        self.peek()?.ok_or(Error::UnexpectedEof)
    }

    /// Reads a complete element, or returns `None` if the input ends cleanly
    /// before the next tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the input ends inside the element, the length
    /// form is not allowed, or the element exceeds the size limit.
    pub fn read_element(&mut self) -> Result<Option<Element>> {
        let Some((tag, length)) = self.read_header()? else {
            return Ok(None);
        };
        let content = self.read_content(length)?;
        Ok(Some(Element::new(tag, content)))
    }

    /// Skips over the next element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is malformed or truncated.
    pub fn skip_element(&mut self) -> Result<()> {
        self.required()?;
        Ok(())
    }

    /// Reads a BOOLEAN, whatever its tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is missing or not a valid boolean.
    pub fn read_boolean(&mut self) -> Result<bool> {
        let element = self.required()?;
        element.decode_as_boolean_tagged(element.tag())
    }

    /// Reads an INTEGER, whatever its tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is missing or not a valid integer.
    pub fn read_integer(&mut self) -> Result<i64> {
        let element = self.required()?;
        element.decode_as_integer_tagged(element.tag())
    }

    /// Reads an INTEGER that fits in an `i32`, whatever its tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is missing or out of range.
    pub fn read_i32(&mut self) -> Result<i32> {
        let element = self.required()?;
        element.decode_as_i32_tagged(element.tag())
    }

    /// Reads an ENUMERATED value, whatever its tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is missing or out of range.
    pub fn read_enumerated(&mut self) -> Result<i32> {
        let element = self.required()?;
        element.decode_as_enumerated_tagged(element.tag())
    }

    /// Reads the content of an OCTET STRING, whatever its tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is missing.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        Ok(self.required()?.value_bytes())
    }

    /// Reads a UTF-8 OCTET STRING, whatever its tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is missing or not valid UTF-8.
    pub fn read_string(&mut self) -> Result<String> {
        let element = self.required()?;
        element.decode_as_string_tagged(element.tag())
    }

    /// Reads a NULL, whatever its tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is missing or has content.
    pub fn read_null(&mut self) -> Result<()> {
        let element = self.required()?;
        element.decode_as_null_tagged(element.tag())
    }

    /// Reads a sequence header and returns a cursor for its members.
    ///
    /// The members themselves are left in the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the input ends or the length is invalid.
    pub fn begin_sequence(&mut self) -> Result<SequenceCursor> {
        let (tag, length) = self.read_header()?.ok_or(Error::UnexpectedEof)?;
        Ok(SequenceCursor {
            tag,
            length,
            end: self.total_bytes_read + length as u64,
        })
    }

    fn required(&mut self) -> Result<Element> {
        self.read_element()?.ok_or(Error::UnexpectedEof)
    }

    fn read_header(&mut self) -> Result<Option<(u8, usize)>> {
        let Some(tag) = self.next_byte()? else {
            return Ok(None);
        };
        let first = self.next_byte()?.ok_or(Error::UnexpectedEof)?;
        let extra = additional_bytes(first)?;
        let mut continuation = [0u8; 4];
        self.fill(&mut continuation[..extra])?;
        let length = assemble(first, &continuation[..extra]);
        if length > self.max_element_size {
            tracing::debug!(tag, length, max = self.max_element_size, "element too large");
            return Err(Error::ElementTooLarge {
                length,
                max: self.max_element_size,
            });
        }
        Ok(Some((tag, length)))
    }

    fn read_content(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut content = vec![0u8; length];
        self.fill(&mut content)?;
        Ok(content)
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        if !buf.is_empty()
            && let Some(b) = self.peeked.take()
        {
            buf[0] = b;
            offset = 1;
            self.total_bytes_read += 1;
        }
        let rest = &mut buf[offset..];
        self.inner.read_exact(rest).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::UnexpectedEof
            } else {
                Error::Io(e)
            }
        })?;
        self.total_bytes_read += rest.len() as u64;
        Ok(())
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.peeked.take() {
            self.total_bytes_read += 1;
            return Ok(Some(b));
        }
        let b = self.next_raw_byte()?;
        if b.is_some() {
            self.total_bytes_read += 1;
        }
        Ok(b)
    }

    fn next_raw_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::tag;

    fn reader(bytes: &[u8]) -> StreamReader<Cursor<Vec<u8>>> {
        StreamReader::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn test_read_elements_and_count() {
        let mut r = reader(&[0x02, 0x01, 0x07, 0x04, 0x02, b'o', b'k']);
        assert_eq!(r.read_integer().unwrap(), 7);
        assert_eq!(r.total_bytes_read(), 3);
        assert_eq!(r.read_string().unwrap(), "ok");
        assert_eq!(r.total_bytes_read(), 7);
        assert!(r.read_element().unwrap().is_none());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut r = reader(&[0x01, 0x01, 0xFF]);
        assert_eq!(r.peek().unwrap(), Some(tag::BOOLEAN));
        assert_eq!(r.total_bytes_read(), 0);
        assert_eq!(r.peek_tag().unwrap(), tag::BOOLEAN);
        assert!(r.read_boolean().unwrap());
        assert_eq!(r.total_bytes_read(), 3);
        assert_eq!(r.peek().unwrap(), None);
    }

    #[test]
    fn test_sequence_cursor() {
        let mut r = reader(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x05, 0x00]);
        let seq = r.begin_sequence().unwrap();
        assert_eq!(seq.tag(), tag::SEQUENCE);
        assert_eq!(seq.end(), 8);
        let mut values = Vec::new();
        while seq.has_more_elements(&r).unwrap() {
            values.push(r.read_integer().unwrap());
        }
        assert_eq!(values, vec![1, 2]);
        r.read_null().unwrap();
    }

    #[test]
    fn test_empty_sequence() {
        let mut r = reader(&[0x30, 0x00]);
        let seq = r.begin_sequence().unwrap();
        assert!(!seq.has_more_elements(&r).unwrap());
    }

    #[test]
    fn test_overrun_is_framing_error() {
        // The sequence claims 3 bytes but its member is 5 bytes long.
        let mut r = reader(&[0x30, 0x03, 0x04, 0x03, b'a', b'b', b'c']);
        let seq = r.begin_sequence().unwrap();
        assert!(seq.has_more_elements(&r).unwrap());
        r.read_octet_string().unwrap();
        let err = seq.has_more_elements(&r).unwrap_err();
        assert!(err.is_framing());
        assert!(matches!(
            err,
            Error::ReadPastSequenceEnd {
                length: 3,
                end: 5,
                position: 7
            }
        ));
    }

    #[test]
    fn test_truncated_content() {
        let mut r = reader(&[0x04, 0x05, b'a']);
        assert!(matches!(r.read_element(), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn test_truncated_header() {
        let mut r = reader(&[0x04]);
        assert!(matches!(r.read_element(), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn test_max_element_size() {
        let mut r = reader(&[0x04, 0x82, 0x01, 0x00]).with_max_element_size(100);
        assert!(matches!(
            r.read_element(),
            Err(Error::ElementTooLarge {
                length: 256,
                max: 100
            })
        ));
    }

    #[test]
    fn test_long_length() {
        let mut bytes = vec![0x04, 0x81, 0x90];
        bytes.extend(std::iter::repeat_n(b'x', 0x90));
        let mut r = reader(&bytes);
        assert_eq!(r.read_octet_string().unwrap().len(), 0x90);
        assert_eq!(r.total_bytes_read(), 0x93);
    }

    #[test]
    fn test_skip_element() {
        let mut r = reader(&[0x04, 0x01, b'a', 0x0A, 0x01, 0x03]);
        r.skip_element().unwrap();
        assert_eq!(r.read_enumerated().unwrap(), 3);
    }

    #[test]
    fn test_indefinite_length_rejected() {
        let mut r = reader(&[0x30, 0x80, 0x00, 0x00]);
        assert!(matches!(r.begin_sequence(), Err(Error::IndefiniteLength)));
    }
}
