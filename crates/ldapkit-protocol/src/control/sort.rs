//! Server-side sort (RFC 2891).

use ldapkit_asn1::Element;
use ldapkit_core::ResultCode;

use super::{Control, DecodableControl};
use crate::error::check_count;
use crate::{Error, Result};

const ORDERING_RULE: u8 = 0x80;
const REVERSE_ORDER: u8 = 0x81;
const ATTRIBUTE_TYPE: u8 = 0x80;

/// One key of a sort request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    /// Attribute to sort on.
    pub attribute: String,
    /// Matching rule to order with, instead of the attribute's own.
    pub ordering_rule: Option<String>,
    /// Sort descending.
    pub reverse_order: bool,
}

impl SortKey {
    /// Creates an ascending key.
    #[must_use]
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            ordering_rule: None,
            reverse_order: false,
        }
    }

    /// Creates a descending key.
    #[must_use]
    pub fn reversed(attribute: impl Into<String>) -> Self {
        Self {
            reverse_order: true,
            ..Self::new(attribute)
        }
    }

    /// Sets the ordering rule.
    #[must_use]
    pub fn with_ordering_rule(mut self, rule: impl Into<String>) -> Self {
        self.ordering_rule = Some(rule.into());
        self
    }

    fn encode(&self) -> Element {
        let mut members = vec![Element::octet_string(&self.attribute)];
        if let Some(rule) = &self.ordering_rule {
            members.push(Element::octet_string_tagged(ORDERING_RULE, rule));
        }
        if self.reverse_order {
            members.push(Element::boolean_tagged(REVERSE_ORDER, true));
        }
        Element::sequence(members)
    }

    fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence()?;
        check_count("sort key", members.len(), 1, 3)?;
        let mut key = Self::new(members[0].decode_as_string()?);
        for member in &members[1..] {
            match member.tag() {
                ORDERING_RULE => {
                    key.ordering_rule = Some(member.decode_as_string_tagged(ORDERING_RULE)?);
                }
                REVERSE_ORDER => {
                    key.reverse_order = member.decode_as_boolean_tagged(REVERSE_ORDER)?;
                }
                other => {
                    return Err(Error::UnknownTag {
                        context: "sort key",
                        tag: other,
                    });
                }
            }
        }
        Ok(key)
    }
}

/// Asks the server to sort search results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerSideSortRequest {
    /// Sort keys, most significant first.
    pub keys: Vec<SortKey>,
    /// Criticality.
    pub critical: bool,
}

impl ServerSideSortRequest {
    /// Creates a non-critical request.
    #[must_use]
    pub const fn new(keys: Vec<SortKey>) -> Self {
        Self {
            keys,
            critical: false,
        }
    }
}

impl DecodableControl for ServerSideSortRequest {
    const OID: &'static str = "1.2.840.113556.1.4.473";
    const NAME: &'static str = "Server-Side Sort Request";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("sort request value", 1, usize::MAX)?;
        Ok(Self {
            keys: members.iter().map(SortKey::decode).collect::<Result<_>>()?,
            critical: control.critical,
        })
    }

    fn to_control(&self) -> Control {
        Control::with_element(
            Self::OID,
            self.critical,
            &Element::sequence(self.keys.iter().map(SortKey::encode)),
        )
    }
}

/// The server's report on a sort request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerSideSortResponse {
    /// Outcome of the sort.
    pub result_code: ResultCode,
    /// Attribute that caused a failure.
    pub attribute_name: Option<String>,
}

impl DecodableControl for ServerSideSortResponse {
    const OID: &'static str = "1.2.840.113556.1.4.474";
    const NAME: &'static str = "Server-Side Sort Response";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("sort response value", 1, 2)?;
        Ok(Self {
            result_code: ResultCode::new(members[0].decode_as_enumerated()?),
            attribute_name: members
                .get(1)
                .map(|e| e.decode_as_string_tagged(ATTRIBUTE_TYPE))
                .transpose()?,
        })
    }

    fn to_control(&self) -> Control {
        let mut members = vec![Element::enumerated(i64::from(self.result_code.as_i32()))];
        if let Some(name) = &self.attribute_name {
            members.push(Element::octet_string_tagged(ATTRIBUTE_TYPE, name));
        }
        Control::with_element(Self::OID, false, &Element::sequence(members))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        let request = ServerSideSortRequest::new(vec![
            SortKey::new("sn"),
            SortKey::reversed("givenName").with_ordering_rule("2.5.13.3"),
        ]);
        let control = request.to_control();
        assert_eq!(control.oid, "1.2.840.113556.1.4.473");
        assert_eq!(ServerSideSortRequest::decode_control(&control).unwrap(), request);
    }

    #[test]
    fn test_request_needs_a_key() {
        let control = ServerSideSortRequest::new(vec![]).to_control();
        assert!(matches!(
            ServerSideSortRequest::decode_control(&control),
            Err(Error::ElementCount { actual: 0, .. })
        ));
    }

    #[test]
    fn test_response_element_count() {
        let value = Element::sequence([
            Element::enumerated(0),
            Element::octet_string_tagged(0x80, "cn"),
            Element::octet_string("extra"),
        ]);
        let control = Control::with_element(ServerSideSortResponse::OID, false, &value);
        let err = ServerSideSortResponse::decode_control(&control).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid number of elements in sort response value (expected 1 to 2, got 3)"
        );
    }

    #[test]
    fn test_response_round_trip() {
        let response = ServerSideSortResponse {
            result_code: ResultCode::new(16),
            attribute_name: Some("jpegPhoto".into()),
        };
        assert_eq!(
            ServerSideSortResponse::decode_control(&response.to_control()).unwrap(),
            response
        );
    }
}
