//! Framed reading of LDAP messages.
//!
//! Every LDAP message is a single BER element with a definite length, so a
//! frame is just a tag, a length, and that many content bytes. Frames are
//! pulled off the stream whole, then decoded with the synchronous
//! [`StreamReader`], so a message that fails to decode never leaves the
//! stream out of step.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use ldapkit_asn1::{StreamReader, length};
use ldapkit_protocol::LdapMessage;

use crate::Result;

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Reads one BER envelope at a time from an async byte stream.
#[derive(Debug)]
pub struct FramedReader<R> {
    reader: BufReader<R>,
    max_message_size: usize,
}

impl<R> FramedReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a reader that rejects frames longer than `max_message_size`.
    pub fn new(inner: R, max_message_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, inner),
            max_message_size,
        }
    }

    /// Returns the largest frame accepted.
    #[must_use]
    pub const fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Reads the next complete frame, header included.
    ///
    /// Returns `None` if the stream ends cleanly between frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream fails or ends inside a frame, or the
    /// frame is too large or uses an unsupported length form. Any error
    /// leaves the stream unusable.
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>> {
        let mut tag = [0u8; 1];
        if self.reader.read(&mut tag).await? == 0 {
            return Ok(None);
        }
        let first = self.read_byte().await?;
        let extra = length::additional_bytes(first)?;
        let mut continuation = [0u8; 4];
        self.reader.read_exact(&mut continuation[..extra]).await?;
        let content_length = length::assemble(first, &continuation[..extra]);
        if content_length > self.max_message_size {
            return Err(ldapkit_asn1::Error::ElementTooLarge {
                length: content_length,
                max: self.max_message_size,
            }
            .into());
        }

        let mut frame = BytesMut::with_capacity(2 + extra + content_length);
        frame.put_u8(tag[0]);
        frame.put_u8(first);
        frame.put_slice(&continuation[..extra]);
        frame.resize(frame.len() + content_length, 0);
        let header = frame.len() - content_length;
        self.reader.read_exact(&mut frame[header..]).await?;
        tracing::debug!(tag = tag[0], length = content_length, "frame read");
        Ok(Some(frame.freeze()))
    }

    /// Reads and decodes the next message.
    ///
    /// # Errors
    ///
    /// Returns an error for framing failures (see
    /// [`FramedReader::read_frame`]) and for messages that do not decode.
    pub async fn read_message(&mut self) -> Result<Option<LdapMessage>> {
        match self.read_frame().await? {
            Some(frame) => Ok(Some(decode_frame(&frame, self.max_message_size)?)),
            None => Ok(None),
        }
    }

    async fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        if self.reader.read(&mut byte).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside a frame",
            )
            .into());
        }
        Ok(byte[0])
    }
}

/// Decodes one frame into a message.
///
/// # Errors
///
/// Returns an error if the frame is not exactly one valid message. The
/// error carries the message ID when it was readable.
pub fn decode_frame(
    frame: &[u8],
    max_message_size: usize,
) -> ldapkit_protocol::Result<LdapMessage> {
    let mut reader = StreamReader::new(frame).with_max_element_size(max_message_size);
    let message =
        LdapMessage::read_from(&mut reader)?.ok_or(ldapkit_asn1::Error::UnexpectedEof)?;
    if reader.peek()?.is_some() {
        let consumed = usize::try_from(reader.total_bytes_read()).unwrap_or(frame.len());
        return Err(ldapkit_asn1::Error::TrailingData {
            count: frame.len().saturating_sub(consumed),
        }
        .into());
    }
    Ok(message)
}
