//! The LDAPResult fields shared by every response op.

use ldapkit_asn1::Element;
use ldapkit_core::ResultCode;

use crate::attribute::decode_strings;
use crate::error::check_count;
use crate::{Error, Result};

/// Context tag of the referral URL sequence.
pub const REFERRALS_TAG: u8 = 0xA3;

/// Result code, matched DN, diagnostic message and referrals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LdapResponse {
    /// Outcome of the operation.
    pub result_code: ResultCode,
    /// Closest existing entry, for `NO_SUCH_OBJECT` and similar.
    ///
    /// The wire form cannot tell an empty DN from an absent one, so both
    /// decode to `None`.
    pub matched_dn: Option<String>,
    /// Free-form text from the server. Empty text decodes to `None`.
    pub diagnostic_message: Option<String>,
    /// Referral URLs, for `REFERRAL` results.
    pub referrals: Vec<String>,
}

impl LdapResponse {
    /// Creates a response with only a result code.
    #[must_use]
    pub const fn new(result_code: ResultCode) -> Self {
        Self {
            result_code,
            matched_dn: None,
            diagnostic_message: None,
            referrals: Vec::new(),
        }
    }

    /// Creates a `SUCCESS` response.
    #[must_use]
    pub const fn success() -> Self {
        Self::new(ResultCode::SUCCESS)
    }

    /// Sets the matched DN. An empty DN clears it.
    #[must_use]
    pub fn with_matched_dn(mut self, dn: impl Into<String>) -> Self {
        self.matched_dn = non_empty(dn.into());
        self
    }

    /// Sets the diagnostic message. An empty message clears it.
    #[must_use]
    pub fn with_diagnostic_message(mut self, message: impl Into<String>) -> Self {
        self.diagnostic_message = non_empty(message.into());
        self
    }

    /// Sets the referral URLs.
    #[must_use]
    pub fn with_referrals(mut self, referrals: Vec<String>) -> Self {
        self.referrals = referrals;
        self
    }

    /// Decodes the three mandatory fields from the front of `members`.
    pub(crate) fn decode_head(members: &[Element], context: &'static str) -> Result<Self> {
        let [code, matched, diagnostic, ..] = members else {
            return Err(Error::ElementCount {
                context,
                min: 3,
                max: usize::MAX,
                actual: members.len(),
            });
        };
        Ok(Self {
            result_code: ResultCode::new(code.decode_as_enumerated()?),
            matched_dn: non_empty(matched.decode_as_string()?),
            diagnostic_message: non_empty(diagnostic.decode_as_string()?),
            referrals: Vec::new(),
        })
    }

    pub(crate) fn decode_referrals(element: &Element) -> Result<Vec<String>> {
        decode_strings(&element.decode_as_sequence_tagged(REFERRALS_TAG)?)
    }

    /// Decodes a plain response op that carries nothing beyond the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the element has the wrong tag or shape.
    pub fn decode(element: &Element, expected_tag: u8) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(expected_tag)?;
        check_count("response", members.len(), 3, 4)?;
        let mut response = Self::decode_head(&members, "response")?;
        if let Some(referrals) = members.get(3) {
            if referrals.tag() != REFERRALS_TAG {
                return Err(Error::UnknownTag {
                    context: "response",
                    tag: referrals.tag(),
                });
            }
            response.referrals = Self::decode_referrals(referrals)?;
        }
        Ok(response)
    }

    /// Encodes the response as an op with the given tag.
    #[must_use]
    pub fn encode(&self, op_tag: u8) -> Element {
        Element::sequence_tagged(op_tag, self.elements())
    }

    /// Element form of the fields, without an enclosing sequence.
    pub(crate) fn elements(&self) -> Vec<Element> {
        let mut elements = vec![
            Element::enumerated(i64::from(self.result_code.as_i32())),
            Element::octet_string(self.matched_dn.as_deref().unwrap_or_default()),
            Element::octet_string(self.diagnostic_message.as_deref().unwrap_or_default()),
        ];
        if !self.referrals.is_empty() {
            elements.push(Element::sequence_tagged(
                REFERRALS_TAG,
                self.referrals.iter().map(Element::octet_string),
            ));
        }
        elements
    }
}

impl Default for LdapResponse {
    fn default() -> Self {
        Self::success()
    }
}

/// Maps the empty string to `None`.
pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DONE: u8 = 0x65;

    #[test]
    fn test_empty_strings_decode_to_none() {
        let element = Element::sequence_tagged(
            DONE,
            [
                Element::enumerated(0),
                Element::octet_string(""),
                Element::octet_string(""),
            ],
        );
        let response = LdapResponse::decode(&element, DONE).unwrap();
        assert_eq!(response, LdapResponse::success());
    }

    #[test]
    fn test_empty_builder_values_survive_round_trip() {
        let response = LdapResponse::new(ResultCode::NO_SUCH_OBJECT)
            .with_matched_dn("")
            .with_diagnostic_message("");
        assert_eq!(response.matched_dn, None);
        assert_eq!(response.diagnostic_message, None);
        let element = response.encode(DONE);
        assert_eq!(LdapResponse::decode(&element, DONE).unwrap(), response);
    }

    #[test]
    fn test_round_trip_with_referrals() {
        let response = LdapResponse::new(ResultCode::REFERRAL)
            .with_matched_dn("dc=example,dc=com")
            .with_diagnostic_message("go elsewhere")
            .with_referrals(vec!["ldap://other/".into()]);
        let element = response.encode(DONE);
        assert_eq!(LdapResponse::decode(&element, DONE).unwrap(), response);
        assert_eq!(element.members().unwrap().len(), 4);
    }

    #[test]
    fn test_wrong_fourth_element() {
        let element = Element::sequence_tagged(
            DONE,
            [
                Element::enumerated(0),
                Element::octet_string(""),
                Element::octet_string(""),
                Element::octet_string_tagged(0x87, "x"),
            ],
        );
        assert!(matches!(
            LdapResponse::decode(&element, DONE),
            Err(Error::UnknownTag { tag: 0x87, .. })
        ));
    }

    #[test]
    fn test_too_few_elements() {
        let element = Element::sequence_tagged(DONE, [Element::enumerated(0)]);
        assert!(matches!(
            LdapResponse::decode(&element, DONE),
            Err(Error::ElementCount { actual: 1, .. })
        ));
    }
}
