//! The LDAPMessage envelope.

use std::fmt;
use std::io::Read;

use bytes::Bytes;
use ldapkit_asn1::{StreamReader, Writer, tag};

use crate::control::{CONTROLS_TAG, Control};
use crate::error::check_count;
use crate::op::ProtocolOp;
use crate::{Error, Result};

/// One LDAP protocol message.
///
/// ```text
/// LDAPMessage ::= SEQUENCE {
///      messageID       MessageID,
///      protocolOp      CHOICE { ... },
///      controls       [0] Controls OPTIONAL }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapMessage {
    /// Message ID. Zero marks an unsolicited notification.
    pub message_id: i32,
    /// Operation payload.
    pub op: ProtocolOp,
    /// Attached controls.
    pub controls: Vec<Control>,
}

impl LdapMessage {
    /// Creates a message without controls.
    pub fn new(message_id: i32, op: impl Into<ProtocolOp>) -> Self {
        Self {
            message_id,
            op: op.into(),
            controls: Vec::new(),
        }
    }

    /// Attaches controls.
    #[must_use]
    pub fn with_controls(mut self, controls: Vec<Control>) -> Self {
        self.controls = controls;
        self
    }

    /// Encodes the message.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut w = Writer::new();
        w.sequence(tag::SEQUENCE, |w| {
            w.add_integer(i64::from(self.message_id));
            w.add_element(&self.op.encode());
            if !self.controls.is_empty() {
                w.add_element(&Control::encode_list(&self.controls));
            }
        });
        w.freeze()
    }

    /// Decodes a complete message from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not hold exactly one valid message.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = StreamReader::new(bytes);
        let message = Self::read_from(&mut reader)?.ok_or(ldapkit_asn1::Error::UnexpectedEof)?;
        let consumed = usize::try_from(reader.total_bytes_read()).unwrap_or(bytes.len());
        if consumed < bytes.len() {
            return Err(ldapkit_asn1::Error::TrailingData {
                count: bytes.len() - consumed,
            }
            .into());
        }
        Ok(message)
    }

    /// Reads the next message from a stream.
    ///
    /// Returns `None` if the stream ends cleanly before a message starts.
    ///
    /// # Errors
    ///
    /// Framing failures (truncation, overrun of the envelope length) leave
    /// the stream unusable and are reported as such by
    /// [`Error::is_framing`]. Failures after the message ID has been read
    /// carry that ID.
    pub fn read_from<R: Read>(reader: &mut StreamReader<R>) -> Result<Option<Self>> {
        if reader.peek()?.is_none() {
            return Ok(None);
        }
        let envelope = reader.begin_sequence()?;
        if envelope.tag() != tag::SEQUENCE {
            return Err(Error::UnknownTag {
                context: "LDAP message",
                tag: envelope.tag(),
            });
        }
        let message_id = reader.read_i32()?;
        Self::read_body(reader, envelope, message_id)
            .map(Some)
            .map_err(|e| e.with_message_id(message_id))
    }

    fn read_body<R: Read>(
        reader: &mut StreamReader<R>,
        envelope: ldapkit_asn1::SequenceCursor,
        message_id: i32,
    ) -> Result<Self> {
        if message_id < 0 {
            return Err(Error::Decoding(format!("negative message ID {message_id}")));
        }
        let op_element = reader
            .read_element()?
            .ok_or(ldapkit_asn1::Error::UnexpectedEof)?;
        let mut controls = Vec::new();
        let mut extra = 0;
        while envelope.has_more_elements(reader)? {
            let element = reader
                .read_element()?
                .ok_or(ldapkit_asn1::Error::UnexpectedEof)?;
            if element.tag() != CONTROLS_TAG {
                return Err(Error::UnknownTag {
                    context: "LDAP message",
                    tag: element.tag(),
                });
            }
            extra += 1;
            check_count("LDAP message", 2 + extra, 2, 3)?;
            controls = Control::decode_list(&element)?;
        }
        let op = ProtocolOp::decode(&op_element)?;
        Ok(Self {
            message_id,
            op,
            controls,
        })
    }
}

impl fmt::Display for LdapMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LDAPMessage(msgID={}, protocolOp={}", self.message_id, self.op)?;
        if !self.controls.is_empty() {
            let oids: Vec<&str> = self.controls.iter().map(|c| c.oid.as_str()).collect();
            write!(f, ", controls={{{}}}", oids.join(", "))?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::op::{DeleteRequest, LdapResponse};
    use ldapkit_core::ResultCode;

    #[test]
    fn test_delete_request_bytes() {
        let message = LdapMessage::new(5, DeleteRequest { dn: "cn=a".into() });
        assert_eq!(
            message.encode().as_ref(),
            &[0x30, 0x09, 0x02, 0x01, 0x05, 0x4A, 0x04, b'c', b'n', b'=', b'a']
        );
        assert_eq!(LdapMessage::decode(&message.encode()).unwrap(), message);
    }

    #[test]
    fn test_controls_round_trip() {
        let message = LdapMessage::new(2, ProtocolOp::UnbindRequest)
            .with_controls(vec![Control::new("1.2.3", true, None)]);
        let bytes = message.encode();
        assert_eq!(LdapMessage::decode(&bytes).unwrap(), message);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = LdapMessage::new(1, ProtocolOp::UnbindRequest).encode().to_vec();
        bytes.push(0x00);
        assert!(LdapMessage::decode(&bytes).is_err());
    }

    #[test]
    fn test_error_carries_message_id() {
        // SEQUENCE { INTEGER 4, [APPLICATION 5] { garbage } }
        let bytes = [0x30, 0x06, 0x02, 0x01, 0x04, 0x65, 0x01, 0xFF];
        let err = LdapMessage::decode(&bytes).unwrap_err();
        assert_eq!(err.message_id(), Some(4));
        assert!(!err.is_framing());
    }

    #[test]
    fn test_envelope_overrun_is_framing() {
        // The envelope claims 5 bytes but the op runs past it.
        let bytes = [
            0x30, 0x05, 0x02, 0x01, 0x01, 0x65, 0x07, 0x0A, 0x01, 0x00, 0x04, 0x00, 0x04, 0x00,
        ];
        let mut reader = StreamReader::new(&bytes[..]);
        let err = LdapMessage::read_from(&mut reader).unwrap_err();
        assert!(err.is_framing());
        assert_eq!(err.message_id(), Some(1));
    }

    #[test]
    fn test_stream_of_messages() {
        let mut bytes = LdapMessage::new(1, ProtocolOp::SearchResultDone(LdapResponse::success()))
            .encode()
            .to_vec();
        bytes.extend_from_slice(
            &LdapMessage::new(
                2,
                ProtocolOp::ModifyResponse(LdapResponse::new(ResultCode::NO_SUCH_OBJECT)),
            )
            .encode(),
        );
        let mut reader = StreamReader::new(&bytes[..]);
        let first = LdapMessage::read_from(&mut reader).unwrap().unwrap();
        let second = LdapMessage::read_from(&mut reader).unwrap().unwrap();
        assert_eq!(first.message_id, 1);
        assert_eq!(
            second.op.response().unwrap().result_code,
            ResultCode::NO_SUCH_OBJECT
        );
        assert!(LdapMessage::read_from(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_display() {
        let message = LdapMessage::new(3, ProtocolOp::UnbindRequest);
        assert_eq!(message.to_string(), "LDAPMessage(msgID=3, protocolOp=UnbindRequest)");
    }
}
