//! Bind request and response.

use std::fmt;

use ldapkit_asn1::Element;

use super::response::{LdapResponse, REFERRALS_TAG};
use super::tags;
use crate::error::check_count;
use crate::{Error, Result};

const SIMPLE: u8 = 0x80;
const SASL: u8 = 0xA3;
const SERVER_SASL_CREDENTIALS: u8 = 0x87;

/// How a bind request authenticates.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum BindCredentials {
    /// Simple authentication with a password. Empty means anonymous.
    Simple(Vec<u8>),
    /// SASL authentication.
    Sasl {
        /// Mechanism name, e.g. `EXTERNAL`.
        mechanism: String,
        /// Mechanism-specific credentials.
        credentials: Option<Vec<u8>>,
    },
}

impl fmt::Debug for BindCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(password) if password.is_empty() => f.write_str("Simple(<empty>)"),
            Self::Simple(_) => f.write_str("Simple(<redacted>)"),
            Self::Sasl {
                mechanism,
                credentials,
            } => f
                .debug_struct("Sasl")
                .field("mechanism", mechanism)
                .field("credentials", &credentials.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// A BindRequest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindRequest {
    /// Protocol version, always 3 in practice.
    pub version: i32,
    /// DN to bind as.
    pub name: String,
    /// Authentication choice.
    pub credentials: BindCredentials,
}

impl BindRequest {
    /// Creates a simple bind request.
    #[must_use]
    pub fn simple(name: impl Into<String>, password: impl AsRef<[u8]>) -> Self {
        Self {
            version: 3,
            name: name.into(),
            credentials: BindCredentials::Simple(password.as_ref().to_vec()),
        }
    }

    /// Creates an anonymous simple bind request.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::simple("", b"")
    }

    /// Creates a SASL bind request.
    #[must_use]
    pub fn sasl(
        name: impl Into<String>,
        mechanism: impl Into<String>,
        credentials: Option<Vec<u8>>,
    ) -> Self {
        Self {
            version: 3,
            name: name.into(),
            credentials: BindCredentials::Sasl {
                mechanism: mechanism.into(),
                credentials,
            },
        }
    }

    /// Encodes the request as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        let credentials = match &self.credentials {
            BindCredentials::Simple(password) => Element::octet_string_tagged(SIMPLE, password),
            BindCredentials::Sasl {
                mechanism,
                credentials,
            } => {
                let mut members = vec![Element::octet_string(mechanism)];
                members.extend(credentials.iter().map(Element::octet_string));
                Element::sequence_tagged(SASL, members)
            }
        };
        Element::sequence_tagged(
            tags::BIND_REQUEST,
            [
                Element::integer(i64::from(self.version)),
                Element::octet_string(&self.name),
                credentials,
            ],
        )
    }

    /// Decodes a BindRequest op.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not a well-formed bind request.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::BIND_REQUEST)?;
        check_count("bind request", members.len(), 3, 3)?;
        let credentials = match members[2].tag() {
            SIMPLE => BindCredentials::Simple(members[2].value().to_vec()),
            SASL => {
                let sasl = members[2].decode_as_sequence_tagged(SASL)?;
                check_count("SASL credentials", sasl.len(), 1, 2)?;
                BindCredentials::Sasl {
                    mechanism: sasl[0].decode_as_string()?,
                    credentials: sasl
                        .get(1)
                        .map(|c| c.decode_as_octet_string().map(<[u8]>::to_vec))
                        .transpose()?,
                }
            }
            other => {
                return Err(Error::UnknownTag {
                    context: "bind request",
                    tag: other,
                });
            }
        };
        Ok(Self {
            version: members[0].decode_as_i32()?,
            name: members[1].decode_as_string()?,
            credentials,
        })
    }
}

/// A BindResponse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindResponse {
    /// Result fields.
    pub response: LdapResponse,
    /// Data for the next step of a multi-stage SASL bind.
    pub server_sasl_credentials: Option<Vec<u8>>,
}

impl BindResponse {
    /// Encodes the response as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        let mut members = self.response.elements();
        if let Some(credentials) = &self.server_sasl_credentials {
            members.push(Element::octet_string_tagged(
                SERVER_SASL_CREDENTIALS,
                credentials,
            ));
        }
        Element::sequence_tagged(tags::BIND_RESPONSE, members)
    }

    /// Decodes a BindResponse op.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not a well-formed bind response.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::BIND_RESPONSE)?;
        check_count("bind response", members.len(), 3, 5)?;
        let mut response = LdapResponse::decode_head(&members, "bind response")?;
        let mut server_sasl_credentials = None;
        for member in &members[3..] {
            match member.tag() {
                REFERRALS_TAG => response.referrals = LdapResponse::decode_referrals(member)?,
                SERVER_SASL_CREDENTIALS => {
                    server_sasl_credentials = Some(member.value().to_vec());
                }
                other => {
                    return Err(Error::UnknownTag {
                        context: "bind response",
                        tag: other,
                    });
                }
            }
        }
        Ok(Self {
            response,
            server_sasl_credentials,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ldapkit_core::ResultCode;

    #[test]
    fn test_simple_bind_wire_form() {
        let request = BindRequest::simple("cn=admin", "secret");
        let bytes = request.encode().encode();
        assert_eq!(bytes[0], 0x60);
        assert!(bytes.ends_with(&[0x80, 0x06, b's', b'e', b'c', b'r', b'e', b't']));
        assert_eq!(BindRequest::decode(&request.encode()).unwrap(), request);
    }

    #[test]
    fn test_sasl_round_trip() {
        let request = BindRequest::sasl("", "EXTERNAL", None);
        assert_eq!(BindRequest::decode(&request.encode()).unwrap(), request);
        let request = BindRequest::sasl("", "PLAIN", Some(b"\0u\0p".to_vec()));
        assert_eq!(BindRequest::decode(&request.encode()).unwrap(), request);
    }

    #[test]
    fn test_password_redacted() {
        let request = BindRequest::simple("cn=admin", "hunter2");
        let text = format!("{request:?}");
        assert!(!text.contains("hunter2"));
        assert!(text.contains("<redacted>"));
    }

    #[test]
    fn test_response_with_sasl_credentials() {
        let response = BindResponse {
            response: LdapResponse::new(ResultCode::SASL_BIND_IN_PROGRESS),
            server_sasl_credentials: Some(b"challenge".to_vec()),
        };
        assert_eq!(BindResponse::decode(&response.encode()).unwrap(), response);
    }
}
