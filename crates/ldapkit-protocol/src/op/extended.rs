//! Extended operations and intermediate responses.

use ldapkit_asn1::Element;

use super::response::{LdapResponse, REFERRALS_TAG};
use super::tags;
use crate::error::check_count;
use crate::{Error, Result};

const REQUEST_NAME: u8 = 0x80;
const REQUEST_VALUE: u8 = 0x81;
const RESPONSE_NAME: u8 = 0x8A;
const RESPONSE_VALUE: u8 = 0x8B;
const INTERMEDIATE_NAME: u8 = 0x80;
const INTERMEDIATE_VALUE: u8 = 0x81;

/// OID of the StartTLS extended operation.
pub const START_TLS_OID: &str = "1.3.6.1.4.1.1466.20037";
/// OID of the "Who am I?" extended operation.
pub const WHO_AM_I_OID: &str = "1.3.6.1.4.1.4203.1.11.3";
/// OID of the unsolicited notice of disconnection.
pub const NOTICE_OF_DISCONNECTION_OID: &str = "1.3.6.1.4.1.1466.20036";

/// An ExtendedRequest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedRequest {
    /// Operation OID.
    pub oid: String,
    /// Operation-specific payload.
    pub value: Option<Vec<u8>>,
}

impl ExtendedRequest {
    /// Creates an extended request.
    #[must_use]
    pub fn new(oid: impl Into<String>, value: Option<Vec<u8>>) -> Self {
        Self {
            oid: oid.into(),
            value,
        }
    }

    /// Encodes the request as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        let mut members = vec![Element::octet_string_tagged(REQUEST_NAME, &self.oid)];
        if let Some(value) = &self.value {
            members.push(Element::octet_string_tagged(REQUEST_VALUE, value));
        }
        Element::sequence_tagged(tags::EXTENDED_REQUEST, members)
    }

    /// Decodes an ExtendedRequest op.
    ///
    /// # Errors
    ///
    /// Returns an error if the OID is missing or a member has the wrong tag.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::EXTENDED_REQUEST)?;
        check_count("extended request", members.len(), 1, 2)?;
        Ok(Self {
            oid: members[0].decode_as_string_tagged(REQUEST_NAME)?,
            value: members
                .get(1)
                .map(|e| e.decode_as_octet_string_tagged(REQUEST_VALUE).map(<[u8]>::to_vec))
                .transpose()?,
        })
    }
}

/// An ExtendedResponse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedResponse {
    /// Result fields.
    pub response: LdapResponse,
    /// Response OID.
    pub oid: Option<String>,
    /// Response payload.
    pub value: Option<Vec<u8>>,
}

impl ExtendedResponse {
    /// Encodes the response as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        let mut members = self.response.elements();
        if let Some(oid) = &self.oid {
            members.push(Element::octet_string_tagged(RESPONSE_NAME, oid));
        }
        if let Some(value) = &self.value {
            members.push(Element::octet_string_tagged(RESPONSE_VALUE, value));
        }
        Element::sequence_tagged(tags::EXTENDED_RESPONSE, members)
    }

    /// Decodes an ExtendedResponse op.
    ///
    /// The optional referral, OID and value members are told apart by tag,
    /// so any subset of them is accepted.
    ///
    /// # Errors
    ///
    /// Returns an error for a member with any other tag.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::EXTENDED_RESPONSE)?;
        check_count("extended response", members.len(), 3, 6)?;
        let mut response = LdapResponse::decode_head(&members, "extended response")?;
        let mut oid = None;
        let mut value = None;
        for member in &members[3..] {
            match member.tag() {
                REFERRALS_TAG => response.referrals = LdapResponse::decode_referrals(member)?,
                RESPONSE_NAME => oid = Some(member.decode_as_string_tagged(RESPONSE_NAME)?),
                RESPONSE_VALUE => value = Some(member.value().to_vec()),
                other => {
                    return Err(Error::UnknownTag {
                        context: "extended response",
                        tag: other,
                    });
                }
            }
        }
        Ok(Self {
            response,
            oid,
            value,
        })
    }
}

/// An IntermediateResponse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntermediateResponse {
    /// Response OID.
    pub oid: Option<String>,
    /// Response payload.
    pub value: Option<Vec<u8>>,
}

impl IntermediateResponse {
    /// Encodes the response as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        let mut members = Vec::with_capacity(2);
        if let Some(oid) = &self.oid {
            members.push(Element::octet_string_tagged(INTERMEDIATE_NAME, oid));
        }
        if let Some(value) = &self.value {
            members.push(Element::octet_string_tagged(INTERMEDIATE_VALUE, value));
        }
        Element::sequence_tagged(tags::INTERMEDIATE_RESPONSE, members)
    }

    /// Decodes an IntermediateResponse op.
    ///
    /// # Errors
    ///
    /// Returns an error for a member with an unexpected tag.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::INTERMEDIATE_RESPONSE)?;
        check_count("intermediate response", members.len(), 0, 2)?;
        let mut oid = None;
        let mut value = None;
        for member in &members {
            match member.tag() {
                INTERMEDIATE_NAME => {
                    oid = Some(member.decode_as_string_tagged(INTERMEDIATE_NAME)?);
                }
                INTERMEDIATE_VALUE => value = Some(member.value().to_vec()),
                other => {
                    return Err(Error::UnknownTag {
                        context: "intermediate response",
                        tag: other,
                    });
                }
            }
        }
        Ok(Self { oid, value })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ldapkit_core::ResultCode;

    fn head() -> Vec<Element> {
        vec![
            Element::enumerated(0),
            Element::octet_string(""),
            Element::octet_string(""),
        ]
    }

    #[test]
    fn test_extended_response_any_order() {
        let mut members = head();
        members.push(Element::octet_string_tagged(0x8B, b"\x01\x02"));
        members.push(Element::octet_string_tagged(0x8A, WHO_AM_I_OID));
        let element = Element::sequence_tagged(0x78, members);
        let response = ExtendedResponse::decode(&element).unwrap();
        assert_eq!(response.oid.as_deref(), Some(WHO_AM_I_OID));
        assert_eq!(response.value.as_deref(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_extended_response_value_only() {
        let mut members = head();
        members.push(Element::octet_string_tagged(0x8B, "dn:cn=me"));
        let response = ExtendedResponse::decode(&Element::sequence_tagged(0x78, members)).unwrap();
        assert!(response.oid.is_none());
        assert_eq!(response.value.as_deref(), Some(&b"dn:cn=me"[..]));
    }

    #[test]
    fn test_extended_response_bad_member() {
        let mut members = head();
        members.push(Element::octet_string_tagged(0x8C, "x"));
        let err = ExtendedResponse::decode(&Element::sequence_tagged(0x78, members)).unwrap_err();
        assert!(err.to_string().contains("invalid element type"));
    }

    #[test]
    fn test_extended_round_trips() {
        let request = ExtendedRequest::new(START_TLS_OID, None);
        assert_eq!(ExtendedRequest::decode(&request.encode()).unwrap(), request);
        let response = ExtendedResponse {
            response: LdapResponse::new(ResultCode::UNAVAILABLE)
                .with_referrals(vec!["ldap://b/".into()]),
            oid: Some(NOTICE_OF_DISCONNECTION_OID.into()),
            value: Some(vec![0]),
        };
        assert_eq!(ExtendedResponse::decode(&response.encode()).unwrap(), response);
        let intermediate = IntermediateResponse {
            oid: None,
            value: Some(vec![1]),
        };
        assert_eq!(
            IntermediateResponse::decode(&intermediate.encode()).unwrap(),
            intermediate
        );
    }
}
