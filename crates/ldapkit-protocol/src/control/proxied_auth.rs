//! Proxied authorization and authorization identity controls.

use ldapkit_asn1::Element;
use ldapkit_core::Dn;

use super::{Control, DecodableControl};
use crate::{Error, Result};

/// Runs an operation as another user, named by DN (the v1 draft form).
///
/// Always critical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxiedAuthorizationV1 {
    /// User to act as.
    pub proxy_dn: Dn,
}

impl DecodableControl for ProxiedAuthorizationV1 {
    const OID: &'static str = "2.16.840.1.113730.3.4.12";
    const NAME: &'static str = "Proxied Authorization v1";

    fn decode_control(control: &Control) -> Result<Self> {
        control.expect_critical(Self::NAME)?;
        let members = control.value_sequence("proxied authorization v1 value", 1, 1)?;
        Ok(Self {
            proxy_dn: Dn::parse(&members[0].decode_as_string()?)?,
        })
    }

    fn to_control(&self) -> Control {
        Control::with_element(
            Self::OID,
            true,
            &Element::sequence([Element::octet_string(self.proxy_dn.as_str())]),
        )
    }
}

/// Runs an operation as another user, named by authzId (RFC 4370).
///
/// The value is the raw authzId, e.g. `dn:uid=bob,dc=example,dc=com` or
/// `u:bob`. Always critical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxiedAuthorizationV2 {
    /// Authorization identity to act as. Empty means anonymous.
    pub authorization_id: String,
}

impl ProxiedAuthorizationV2 {
    /// Creates a control.
    #[must_use]
    pub fn new(authorization_id: impl Into<String>) -> Self {
        Self {
            authorization_id: authorization_id.into(),
        }
    }
}

impl DecodableControl for ProxiedAuthorizationV2 {
    const OID: &'static str = "2.16.840.1.113730.3.4.18";
    const NAME: &'static str = "Proxied Authorization v2";

    fn decode_control(control: &Control) -> Result<Self> {
        control.expect_critical(Self::NAME)?;
        let value = control.value.as_deref().ok_or_else(|| Error::MissingValue {
            oid: control.oid.clone(),
        })?;
        Ok(Self {
            authorization_id: utf8(value, Self::NAME)?,
        })
    }

    fn to_control(&self) -> Control {
        Control::new(Self::OID, true, Some(self.authorization_id.as_bytes().to_vec()))
    }
}

/// The identity a bind established (RFC 3829).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorizationIdentityResponse {
    /// The authzId. Empty for an anonymous bind.
    pub authorization_id: String,
}

impl DecodableControl for AuthorizationIdentityResponse {
    const OID: &'static str = "2.16.840.1.113730.3.4.15";
    const NAME: &'static str = "Authorization Identity Response";

    fn decode_control(control: &Control) -> Result<Self> {
        Ok(Self {
            authorization_id: utf8(control.value.as_deref().unwrap_or_default(), Self::NAME)?,
        })
    }

    fn to_control(&self) -> Control {
        Control::new(Self::OID, false, Some(self.authorization_id.as_bytes().to_vec()))
    }
}

fn utf8(value: &[u8], name: &str) -> Result<String> {
    String::from_utf8(value.to_vec())
        .map_err(|_| Error::Decoding(format!("{name} value is not valid UTF-8")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_round_trip() {
        let control = ProxiedAuthorizationV1 {
            proxy_dn: Dn::parse("uid=bob,dc=example,dc=com").unwrap(),
        };
        let wire = control.to_control();
        assert!(wire.critical);
        assert_eq!(ProxiedAuthorizationV1::decode_control(&wire).unwrap(), control);
    }

    #[test]
    fn test_v2_raw_value() {
        let control = ProxiedAuthorizationV2::new("dn:uid=bob,dc=example,dc=com");
        let wire = control.to_control();
        assert_eq!(wire.value.as_deref(), Some(&b"dn:uid=bob,dc=example,dc=com"[..]));
        assert_eq!(ProxiedAuthorizationV2::decode_control(&wire).unwrap(), control);
    }

    #[test]
    fn test_v2_must_be_critical() {
        let wire = Control::new(ProxiedAuthorizationV2::OID, false, Some(b"u:bob".to_vec()));
        assert!(matches!(
            ProxiedAuthorizationV2::decode_control(&wire),
            Err(Error::Decoding(_))
        ));
    }

    #[test]
    fn test_identity_response() {
        let wire = Control::new(AuthorizationIdentityResponse::OID, false, None);
        let decoded = AuthorizationIdentityResponse::decode_control(&wire).unwrap();
        assert_eq!(decoded.authorization_id, "");
        let response = AuthorizationIdentityResponse {
            authorization_id: "u:bob".into(),
        };
        assert_eq!(
            AuthorizationIdentityResponse::decode_control(&response.to_control()).unwrap(),
            response
        );
    }
}
