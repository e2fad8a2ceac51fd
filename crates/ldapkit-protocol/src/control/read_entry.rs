//! Pre-read and post-read controls (RFC 4527).
//!
//! The request lists attributes to read; the response carries the entry
//! as it was before or after the update. Request and response share an OID.

use ldapkit_asn1::Element;

use super::{Control, DecodableControl};
use crate::attribute::decode_strings;
use crate::op::SearchResultEntry;
use crate::Result;

fn decode_attribute_list(control: &Control, context: &'static str) -> Result<Vec<String>> {
    decode_strings(&control.value_sequence(context, 0, usize::MAX)?)
}

fn encode_attribute_list(attributes: &[String]) -> Element {
    Element::sequence(attributes.iter().map(Element::octet_string))
}

/// The value is a SearchResultEntry; its tag is not checked.
fn decode_entry(control: &Control) -> Result<SearchResultEntry> {
    SearchResultEntry::decode_members(&control.value_element()?.members()?)
}

macro_rules! read_entry_controls {
    (
        $request:ident, $response:ident, $oid:literal,
        $request_name:literal, $response_name:literal, $when:literal
    ) => {
        #[doc = concat!("Asks for the target entry ", $when, " the update.")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $request {
            /// Attributes to return; empty means all user attributes.
            pub attributes: Vec<String>,
            /// Criticality.
            pub critical: bool,
        }

        impl $request {
            /// Creates a critical request.
            #[must_use]
            pub fn new<I, S>(attributes: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                Self {
                    attributes: attributes.into_iter().map(Into::into).collect(),
                    critical: true,
                }
            }
        }

        impl DecodableControl for $request {
            const OID: &'static str = $oid;
            const NAME: &'static str = $request_name;

            fn decode_control(control: &Control) -> Result<Self> {
                Ok(Self {
                    attributes: decode_attribute_list(control, concat!($request_name, " value"))?,
                    critical: control.critical,
                })
            }

            fn to_control(&self) -> Control {
                Control::with_element(
                    Self::OID,
                    self.critical,
                    &encode_attribute_list(&self.attributes),
                )
            }
        }

        #[doc = concat!("The target entry as it was ", $when, " the update.")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $response {
            /// The entry.
            pub entry: SearchResultEntry,
        }

        impl DecodableControl for $response {
            const OID: &'static str = $oid;
            const NAME: &'static str = $response_name;

            fn decode_control(control: &Control) -> Result<Self> {
                Ok(Self {
                    entry: decode_entry(control)?,
                })
            }

            fn to_control(&self) -> Control {
                Control::with_element(Self::OID, false, &self.entry.encode())
            }
        }
    };
}

read_entry_controls!(
    PreReadRequest,
    PreReadResponse,
    "1.3.6.1.1.13.1",
    "Pre-Read Request",
    "Pre-Read Response",
    "before"
);

read_entry_controls!(
    PostReadRequest,
    PostReadResponse,
    "1.3.6.1.1.13.2",
    "Post-Read Request",
    "Post-Read Response",
    "after"
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::Error;

    #[test]
    fn test_request_round_trip() {
        let request = PreReadRequest::new(["cn", "modifyTimestamp"]);
        let control = request.to_control();
        assert_eq!(control.oid, "1.3.6.1.1.13.1");
        assert_eq!(PreReadRequest::decode_control(&control).unwrap(), request);
        let request = PostReadRequest::new(Vec::<String>::new());
        assert_eq!(PostReadRequest::decode_control(&request.to_control()).unwrap(), request);
    }

    #[test]
    fn test_response_round_trip() {
        let response = PostReadResponse {
            entry: SearchResultEntry::new(
                "cn=a,dc=x",
                vec![Attribute::from_strings("entryCSN", ["20240101"])],
            ),
        };
        assert_eq!(
            PostReadResponse::decode_control(&response.to_control()).unwrap(),
            response
        );
    }

    #[test]
    fn test_response_accepts_universal_sequence() {
        let value = Element::sequence([Element::octet_string("cn=a"), Element::sequence([])]);
        let control = Control::with_element(PreReadResponse::OID, false, &value);
        let response = PreReadResponse::decode_control(&control).unwrap();
        assert_eq!(response.entry.dn, "cn=a");
    }

    #[test]
    fn test_response_element_count() {
        let value = Element::sequence([Element::octet_string("cn=a")]);
        let control = Control::with_element(PreReadResponse::OID, false, &value);
        assert!(matches!(
            PreReadResponse::decode_control(&control),
            Err(Error::ElementCount { min: 2, max: 2, .. })
        ));
    }
}
