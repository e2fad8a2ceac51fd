//! Search request and the entry and reference responses.

use std::fmt;

use ldapkit_asn1::Element;
use ldapkit_core::SearchScope;

use super::tags;
use crate::attribute::{Attribute, decode_strings};
use crate::error::check_count;
use crate::{Filter, Result};

/// When the server dereferences aliases during a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerefPolicy(i32);

impl DerefPolicy {
    /// Never dereference.
    pub const NEVER: Self = Self(0);
    /// Dereference below the base only.
    pub const SEARCHING: Self = Self(1);
    /// Dereference the base only.
    pub const FINDING: Self = Self(2);
    /// Always dereference.
    pub const ALWAYS: Self = Self(3);

    /// Creates a policy from its wire value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for DerefPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("never"),
            1 => f.write_str("searching"),
            2 => f.write_str("finding"),
            3 => f.write_str("always"),
            n => write!(f, "DEREF{n}"),
        }
    }
}

/// A SearchRequest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchRequest {
    /// Where the search starts.
    pub base_dn: String,
    /// How far below the base to look.
    pub scope: SearchScope,
    /// Alias handling.
    pub deref_policy: DerefPolicy,
    /// Maximum entries to return; 0 is no limit.
    pub size_limit: i32,
    /// Maximum seconds to spend; 0 is no limit.
    pub time_limit: i32,
    /// Return attribute names without values.
    pub types_only: bool,
    /// Which entries match.
    pub filter: Filter,
    /// Attributes to return; empty means all user attributes.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// Creates a request with no limits that returns all user attributes.
    #[must_use]
    pub fn new(base_dn: impl Into<String>, scope: SearchScope, filter: Filter) -> Self {
        Self {
            base_dn: base_dn.into(),
            scope,
            deref_policy: DerefPolicy::NEVER,
            size_limit: 0,
            time_limit: 0,
            types_only: false,
            filter,
            attributes: Vec::new(),
        }
    }

    /// Sets the attributes to return.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the size limit.
    #[must_use]
    pub const fn with_size_limit(mut self, limit: i32) -> Self {
        self.size_limit = limit;
        self
    }

    /// Sets the time limit in seconds.
    #[must_use]
    pub const fn with_time_limit(mut self, seconds: i32) -> Self {
        self.time_limit = seconds;
        self
    }

    /// Sets the alias dereferencing policy.
    #[must_use]
    pub const fn with_deref_policy(mut self, policy: DerefPolicy) -> Self {
        self.deref_policy = policy;
        self
    }

    /// Requests attribute names only.
    #[must_use]
    pub const fn with_types_only(mut self, types_only: bool) -> Self {
        self.types_only = types_only;
        self
    }

    /// Encodes the request as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        Element::sequence_tagged(
            tags::SEARCH_REQUEST,
            [
                Element::octet_string(&self.base_dn),
                Element::enumerated(i64::from(self.scope.as_i32())),
                Element::enumerated(i64::from(self.deref_policy.0)),
                Element::integer(i64::from(self.size_limit)),
                Element::integer(i64::from(self.time_limit)),
                Element::boolean(self.types_only),
                self.filter.encode(),
                Element::sequence(self.attributes.iter().map(Element::octet_string)),
            ],
        )
    }

    /// Decodes a SearchRequest op.
    ///
    /// # Errors
    ///
    /// Returns an error if the element does not have exactly eight valid
    /// members.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::SEARCH_REQUEST)?;
        check_count("search request", members.len(), 8, 8)?;
        Ok(Self {
            base_dn: members[0].decode_as_string()?,
            scope: SearchScope::new(members[1].decode_as_enumerated()?),
            deref_policy: DerefPolicy(members[2].decode_as_enumerated()?),
            size_limit: members[3].decode_as_i32()?,
            time_limit: members[4].decode_as_i32()?,
            types_only: members[5].decode_as_boolean()?,
            filter: Filter::decode(&members[6])?,
            attributes: decode_strings(&members[7].decode_as_sequence()?)?,
        })
    }
}

/// A SearchResultEntry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchResultEntry {
    /// DN of the entry.
    pub dn: String,
    /// Returned attributes.
    pub attributes: Vec<Attribute>,
}

impl SearchResultEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(dn: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }

    /// Returns the attribute with the given name, ignoring case.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.has_name(name))
    }

    /// Returns the first text value of an attribute.
    #[must_use]
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Attribute::first_string)
    }

    /// Encodes the entry as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        self.encode_tagged(tags::SEARCH_RESULT_ENTRY)
    }

    /// Encodes the entry as a sequence with any tag.
    pub(crate) fn encode_tagged(&self, entry_tag: u8) -> Element {
        Element::sequence_tagged(
            entry_tag,
            [
                Element::octet_string(&self.dn),
                Element::sequence(self.attributes.iter().map(Attribute::encode)),
            ],
        )
    }

    /// Decodes a SearchResultEntry op.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not a two-member entry.
    pub fn decode(element: &Element) -> Result<Self> {
        Self::decode_members(&element.decode_as_sequence_tagged(tags::SEARCH_RESULT_ENTRY)?)
    }

    /// Decodes the `dn` and attribute list members of an entry.
    pub(crate) fn decode_members(members: &[Element]) -> Result<Self> {
        check_count("search result entry", members.len(), 2, 2)?;
        Ok(Self {
            dn: members[0].decode_as_string()?,
            attributes: members[1]
                .decode_as_sequence()?
                .iter()
                .map(Attribute::decode)
                .collect::<Result<_>>()?,
        })
    }
}

/// A SearchResultReference: continuation URLs for part of the search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchResultReference {
    /// Referral URLs.
    pub urls: Vec<String>,
}

impl SearchResultReference {
    /// Encodes the reference as a protocol op element.
    #[must_use]
    pub fn encode(&self) -> Element {
        Element::sequence_tagged(
            tags::SEARCH_RESULT_REFERENCE,
            self.urls.iter().map(Element::octet_string),
        )
    }

    /// Decodes a SearchResultReference op.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference carries no URLs.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence_tagged(tags::SEARCH_RESULT_REFERENCE)?;
        check_count("search result reference", members.len(), 1, usize::MAX)?;
        Ok(Self {
            urls: decode_strings(&members)?,
        })
    }
}
