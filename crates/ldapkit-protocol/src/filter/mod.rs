//! Search filters (RFC 4511 §4.5.1, string form per RFC 4515).
//!
//! A [`Filter`] can be built with the constructors, parsed from text with
//! [`Filter::parse`], and converted to and from its BER form.
//!
//! ```
//! use ldapkit_protocol::Filter;
//!
//! let filter = Filter::parse("(&(objectClass=person)(cn=Bob*))").unwrap();
//! assert_eq!(filter.to_string(), "(&(objectClass=person)(cn=Bob*))");
//! ```

mod parser;

use std::fmt::{self, Write as _};

use ldapkit_asn1::Element;

use crate::error::check_count;
use crate::{Error, Result};

/// Deepest nesting accepted when parsing or decoding.
pub const MAX_DEPTH: usize = 100;

const AND: u8 = 0xA0;
const OR: u8 = 0xA1;
const NOT: u8 = 0xA2;
const EQUALITY: u8 = 0xA3;
const SUBSTRING: u8 = 0xA4;
const GREATER_OR_EQUAL: u8 = 0xA5;
const LESS_OR_EQUAL: u8 = 0xA6;
const PRESENT: u8 = 0x87;
const APPROXIMATE: u8 = 0xA8;
const EXTENSIBLE: u8 = 0xA9;

const SUB_INITIAL: u8 = 0x80;
const SUB_ANY: u8 = 0x81;
const SUB_FINAL: u8 = 0x82;

const MATCHING_RULE: u8 = 0x81;
const MATCH_TYPE: u8 = 0x82;
const MATCH_VALUE: u8 = 0x83;
const DN_ATTRIBUTES: u8 = 0x84;

/// An LDAP search filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Matches when every component matches. Empty means absolute true.
    And(Vec<Filter>),
    /// Matches when any component matches. Empty means absolute false.
    Or(Vec<Filter>),
    /// Inverts a filter.
    Not(Box<Filter>),
    /// `(attr=value)`
    Equality {
        /// Attribute description.
        attribute: String,
        /// Assertion value.
        value: Vec<u8>,
    },
    /// `(attr=initial*any*final)`
    Substring {
        /// Attribute description.
        attribute: String,
        /// Leading component.
        subinitial: Option<Vec<u8>>,
        /// Middle components in order.
        subany: Vec<Vec<u8>>,
        /// Trailing component.
        subfinal: Option<Vec<u8>>,
    },
    /// `(attr>=value)`
    GreaterOrEqual {
        /// Attribute description.
        attribute: String,
        /// Assertion value.
        value: Vec<u8>,
    },
    /// `(attr<=value)`
    LessOrEqual {
        /// Attribute description.
        attribute: String,
        /// Assertion value.
        value: Vec<u8>,
    },
    /// `(attr=*)`
    Present {
        /// Attribute description.
        attribute: String,
    },
    /// `(attr~=value)`
    Approximate {
        /// Attribute description.
        attribute: String,
        /// Assertion value.
        value: Vec<u8>,
    },
    /// `(attr:dn:rule:=value)`
    Extensible {
        /// Matching rule OID or name.
        matching_rule: Option<String>,
        /// Attribute description.
        attribute: Option<String>,
        /// Assertion value.
        value: Vec<u8>,
        /// Also match against the attributes of the entry's DN.
        dn_attributes: bool,
    },
}

impl Filter {
    /// Parses an RFC 4515 filter string.
    ///
    /// The enclosing parentheses may be left off a simple filter, so
    /// `cn=Bob` is accepted as `(cn=Bob)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFilter`] with the position of the problem.
    pub fn parse(s: &str) -> Result<Self> {
        parser::parse(s)
    }

    /// Creates an AND filter.
    #[must_use]
    pub const fn and(filters: Vec<Self>) -> Self {
        Self::And(filters)
    }

    /// Creates an OR filter.
    #[must_use]
    pub const fn or(filters: Vec<Self>) -> Self {
        Self::Or(filters)
    }

    /// Creates a NOT filter.
    #[must_use]
    pub fn not(filter: Self) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Creates an equality filter.
    #[must_use]
    pub fn equality(attribute: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        Self::Equality {
            attribute: attribute.into(),
            value: value.as_ref().to_vec(),
        }
    }

    /// Creates a substring filter.
    #[must_use]
    pub fn substring(
        attribute: impl Into<String>,
        subinitial: Option<&[u8]>,
        subany: &[&[u8]],
        subfinal: Option<&[u8]>,
    ) -> Self {
        Self::Substring {
            attribute: attribute.into(),
            subinitial: subinitial.map(<[u8]>::to_vec),
            subany: subany.iter().map(|s| s.to_vec()).collect(),
            subfinal: subfinal.map(<[u8]>::to_vec),
        }
    }

    /// Creates a greater-or-equal filter.
    #[must_use]
    pub fn greater_or_equal(attribute: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        Self::GreaterOrEqual {
            attribute: attribute.into(),
            value: value.as_ref().to_vec(),
        }
    }

    /// Creates a less-or-equal filter.
    #[must_use]
    pub fn less_or_equal(attribute: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        Self::LessOrEqual {
            attribute: attribute.into(),
            value: value.as_ref().to_vec(),
        }
    }

    /// Creates a presence filter.
    #[must_use]
    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present {
            attribute: attribute.into(),
        }
    }

    /// Creates an approximate-match filter.
    #[must_use]
    pub fn approximate(attribute: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        Self::Approximate {
            attribute: attribute.into(),
            value: value.as_ref().to_vec(),
        }
    }

    /// Creates an extensible-match filter.
    #[must_use]
    pub fn extensible(
        attribute: Option<&str>,
        matching_rule: Option<&str>,
        value: impl AsRef<[u8]>,
        dn_attributes: bool,
    ) -> Self {
        Self::Extensible {
            matching_rule: matching_rule.map(str::to_string),
            attribute: attribute.map(str::to_string),
            value: value.as_ref().to_vec(),
            dn_attributes,
        }
    }

    /// Returns the attribute description this filter targets, if any.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::And(_) | Self::Or(_) | Self::Not(_) => None,
            Self::Equality { attribute, .. }
            | Self::Substring { attribute, .. }
            | Self::GreaterOrEqual { attribute, .. }
            | Self::LessOrEqual { attribute, .. }
            | Self::Present { attribute }
            | Self::Approximate { attribute, .. } => Some(attribute),
            Self::Extensible { attribute, .. } => attribute.as_deref(),
        }
    }

    /// Returns true if this filter may appear in a matched values control.
    ///
    /// That excludes AND, OR, NOT and extensible matches that use
    /// `dnAttributes`.
    #[must_use]
    pub const fn is_simple_item(&self) -> bool {
        match self {
            Self::And(_) | Self::Or(_) | Self::Not(_) => false,
            Self::Extensible { dn_attributes, .. } => !*dn_attributes,
            _ => true,
        }
    }

    /// Encodes the filter as a BER element.
    #[must_use]
    pub fn encode(&self) -> Element {
        match self {
            Self::And(filters) => Element::sequence_tagged(AND, filters.iter().map(Self::encode)),
            Self::Or(filters) => Element::sequence_tagged(OR, filters.iter().map(Self::encode)),
            Self::Not(filter) => Element::sequence_tagged(NOT, [filter.encode()]),
            Self::Equality { attribute, value } => assertion(EQUALITY, attribute, value),
            Self::GreaterOrEqual { attribute, value } => {
                assertion(GREATER_OR_EQUAL, attribute, value)
            }
            Self::LessOrEqual { attribute, value } => assertion(LESS_OR_EQUAL, attribute, value),
            Self::Approximate { attribute, value } => assertion(APPROXIMATE, attribute, value),
            Self::Present { attribute } => Element::octet_string_tagged(PRESENT, attribute),
            Self::Substring {
                attribute,
                subinitial,
                subany,
                subfinal,
            } => {
                let components = subinitial
                    .iter()
                    .map(|v| Element::octet_string_tagged(SUB_INITIAL, v))
                    .chain(
                        subany
                            .iter()
                            .map(|v| Element::octet_string_tagged(SUB_ANY, v)),
                    )
                    .chain(
                        subfinal
                            .iter()
                            .map(|v| Element::octet_string_tagged(SUB_FINAL, v)),
                    );
                Element::sequence_tagged(
                    SUBSTRING,
                    [
                        Element::octet_string(attribute),
                        Element::sequence(components),
                    ],
                )
            }
            Self::Extensible {
                matching_rule,
                attribute,
                value,
                dn_attributes,
            } => {
                let mut members = Vec::with_capacity(4);
                if let Some(rule) = matching_rule {
                    members.push(Element::octet_string_tagged(MATCHING_RULE, rule));
                }
                if let Some(attribute) = attribute {
                    members.push(Element::octet_string_tagged(MATCH_TYPE, attribute));
                }
                members.push(Element::octet_string_tagged(MATCH_VALUE, value));
                if *dn_attributes {
                    members.push(Element::boolean_tagged(DN_ATTRIBUTES, true));
                }
                Element::sequence_tagged(EXTENSIBLE, members)
            }
        }
    }

    /// Decodes a filter from its BER element.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown filter type, a malformed component,
    /// or nesting deeper than [`MAX_DEPTH`].
    pub fn decode(element: &Element) -> Result<Self> {
        decode_at(element, 0)
    }
}

fn assertion(filter_tag: u8, attribute: &str, value: &[u8]) -> Element {
    Element::sequence_tagged(
        filter_tag,
        [Element::octet_string(attribute), Element::octet_string(value)],
    )
}

fn decode_at(element: &Element, depth: usize) -> Result<Filter> {
    if depth > MAX_DEPTH {
        return Err(Error::Decoding(format!(
            "filter nesting exceeds {MAX_DEPTH} levels"
        )));
    }
    let filter_tag = element.tag();
    match filter_tag {
        AND | OR => {
            let filters = element
                .decode_as_sequence_tagged(filter_tag)?
                .iter()
                .map(|e| decode_at(e, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            Ok(if filter_tag == AND {
                Filter::And(filters)
            } else {
                Filter::Or(filters)
            })
        }
        NOT => {
            let members = element.decode_as_sequence_tagged(NOT)?;
            check_count("not filter", members.len(), 1, 1)?;
            Ok(Filter::not(decode_at(&members[0], depth + 1)?))
        }
        EQUALITY | GREATER_OR_EQUAL | LESS_OR_EQUAL | APPROXIMATE => {
            let members = element.decode_as_sequence_tagged(filter_tag)?;
            check_count("attribute value assertion", members.len(), 2, 2)?;
            let attribute = members[0].decode_as_string()?;
            let value = members[1].decode_as_octet_string()?.to_vec();
            Ok(match filter_tag {
                EQUALITY => Filter::Equality { attribute, value },
                GREATER_OR_EQUAL => Filter::GreaterOrEqual { attribute, value },
                LESS_OR_EQUAL => Filter::LessOrEqual { attribute, value },
                _ => Filter::Approximate { attribute, value },
            })
        }
        PRESENT => Ok(Filter::Present {
            attribute: element.decode_as_string_tagged(PRESENT)?,
        }),
        SUBSTRING => decode_substring(element),
        EXTENSIBLE => decode_extensible(element),
        other => Err(Error::UnknownTag {
            context: "filter",
            tag: other,
        }),
    }
}

fn decode_substring(element: &Element) -> Result<Filter> {
    let members = element.decode_as_sequence_tagged(SUBSTRING)?;
    check_count("substring filter", members.len(), 2, 2)?;
    let attribute = members[0].decode_as_string()?;
    let components = members[1].decode_as_sequence()?;
    if components.is_empty() {
        return Err(Error::Decoding(
            "substring filter has no components".to_string(),
        ));
    }
    let last = components.len() - 1;
    let mut subinitial = None;
    let mut subany = Vec::new();
    let mut subfinal = None;
    for (i, component) in components.iter().enumerate() {
        let value = component.value().to_vec();
        match component.tag() {
            SUB_INITIAL if i == 0 => subinitial = Some(value),
            SUB_ANY => subany.push(value),
            SUB_FINAL if i == last => subfinal = Some(value),
            SUB_INITIAL | SUB_FINAL => {
                return Err(Error::Decoding(format!(
                    "substring component 0x{:02X} out of order",
                    component.tag()
                )));
            }
            other => {
                return Err(Error::UnknownTag {
                    context: "substring filter",
                    tag: other,
                });
            }
        }
    }
    Ok(Filter::Substring {
        attribute,
        subinitial,
        subany,
        subfinal,
    })
}

fn decode_extensible(element: &Element) -> Result<Filter> {
    let members = element.decode_as_sequence_tagged(EXTENSIBLE)?;
    check_count("extensible match filter", members.len(), 1, 4)?;
    let mut matching_rule = None;
    let mut attribute = None;
    let mut value = None;
    let mut dn_attributes = false;
    for member in &members {
        match member.tag() {
            MATCHING_RULE => {
                matching_rule = Some(member.decode_as_string_tagged(MATCHING_RULE)?);
            }
            MATCH_TYPE => attribute = Some(member.decode_as_string_tagged(MATCH_TYPE)?),
            MATCH_VALUE => value = Some(member.value().to_vec()),
            DN_ATTRIBUTES => dn_attributes = member.decode_as_boolean_tagged(DN_ATTRIBUTES)?,
            other => {
                return Err(Error::UnknownTag {
                    context: "extensible match filter",
                    tag: other,
                });
            }
        }
    }
    let Some(value) = value else {
        return Err(Error::Decoding(
            "extensible match filter has no match value".to_string(),
        ));
    };
    if matching_rule.is_none() && attribute.is_none() {
        return Err(Error::Decoding(
            "extensible match filter needs an attribute or a matching rule".to_string(),
        ));
    }
    Ok(Filter::Extensible {
        matching_rule,
        attribute,
        value,
        dn_attributes,
    })
}

/// Appends `value` with the RFC 4515 escapes applied.
fn write_value(out: &mut String, value: &[u8]) {
    for &b in value {
        match b {
            b'*' | b'(' | b')' | b'\\' | 0x00..=0x1F | 0x7F..=0xFF => {
                let _ = write!(out, "\\{b:02x}");
            }
            _ => out.push(char::from(b)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        out.push('(');
        match self {
            Self::And(filters) | Self::Or(filters) => {
                out.push(if matches!(self, Self::And(_)) { '&' } else { '|' });
                for filter in filters {
                    let _ = write!(out, "{filter}");
                }
            }
            Self::Not(filter) => {
                let _ = write!(out, "!{filter}");
            }
            Self::Equality { attribute, value } => {
                out.push_str(attribute);
                out.push('=');
                write_value(&mut out, value);
            }
            Self::GreaterOrEqual { attribute, value } => {
                out.push_str(attribute);
                out.push_str(">=");
                write_value(&mut out, value);
            }
            Self::LessOrEqual { attribute, value } => {
                out.push_str(attribute);
                out.push_str("<=");
                write_value(&mut out, value);
            }
            Self::Approximate { attribute, value } => {
                out.push_str(attribute);
                out.push_str("~=");
                write_value(&mut out, value);
            }
            Self::Present { attribute } => {
                out.push_str(attribute);
                out.push_str("=*");
            }
            Self::Substring {
                attribute,
                subinitial,
                subany,
                subfinal,
            } => {
                out.push_str(attribute);
                out.push('=');
                if let Some(initial) = subinitial {
                    write_value(&mut out, initial);
                }
                out.push('*');
                for any in subany {
                    write_value(&mut out, any);
                    out.push('*');
                }
                if let Some(last) = subfinal {
                    write_value(&mut out, last);
                }
            }
            Self::Extensible {
                matching_rule,
                attribute,
                value,
                dn_attributes,
            } => {
                if let Some(attribute) = attribute {
                    out.push_str(attribute);
                }
                if *dn_attributes {
                    out.push_str(":dn");
                }
                if let Some(rule) = matching_rule {
                    out.push(':');
                    out.push_str(rule);
                }
                out.push_str(":=");
                write_value(&mut out, value);
            }
        }
        out.push(')');
        f.write_str(&out)
    }
}

impl std::str::FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Filter> for Element {
    fn from(filter: Filter) -> Self {
        filter.encode()
    }
}

impl Default for Filter {
    /// `(objectClass=*)`
    fn default() -> Self {
        Self::present("objectClass")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_escapes() {
        let filter = Filter::equality("cn", "a*b(c)\\");
        assert_eq!(filter.to_string(), "(cn=a\\2ab\\28c\\29\\5c)");
        let filter = Filter::equality("cn", "caf\u{e9}");
        assert_eq!(filter.to_string(), "(cn=caf\\c3\\a9)");
    }

    #[test]
    fn test_substring_display() {
        let filter = Filter::substring("cn", Some(b"a"), &[b"b", b"c"], None);
        assert_eq!(filter.to_string(), "(cn=a*b*c*)");
        let filter = Filter::substring("cn", None, &[], Some(b"z"));
        assert_eq!(filter.to_string(), "(cn=*z)");
    }

    #[test]
    fn test_extensible_display() {
        let filter = Filter::extensible(Some("cn"), Some("caseExactMatch"), "Fred", true);
        assert_eq!(filter.to_string(), "(cn:dn:caseExactMatch:=Fred)");
        let filter = Filter::extensible(None, Some("2.5.13.5"), "x", false);
        assert_eq!(filter.to_string(), "(:2.5.13.5:=x)");
    }

    #[test]
    fn test_encode_tags() {
        assert_eq!(Filter::present("cn").encode().tag(), 0x87);
        assert_eq!(Filter::and(vec![]).encode().tag(), 0xA0);
        assert_eq!(Filter::not(Filter::present("cn")).encode().tag(), 0xA2);
        assert_eq!(Filter::equality("cn", "x").encode().tag(), 0xA3);
    }

    #[test]
    fn test_round_trip_all_variants() {
        let filter = Filter::and(vec![
            Filter::or(vec![
                Filter::equality("cn", "Bob"),
                Filter::approximate("sn", "smyth"),
            ]),
            Filter::not(Filter::present("mail")),
            Filter::greater_or_equal("uidNumber", "1000"),
            Filter::less_or_equal("uidNumber", "2000"),
            Filter::substring("cn", Some(b"B"), &[b"o"], Some(b"b")),
            Filter::extensible(Some("ou"), None, "People", true),
        ]);
        assert_eq!(Filter::decode(&filter.encode()).unwrap(), filter);
    }

    #[test]
    fn test_decode_rejects_misplaced_initial() {
        let element = Element::sequence_tagged(
            SUBSTRING,
            [
                Element::octet_string("cn"),
                Element::sequence([
                    Element::octet_string_tagged(SUB_ANY, "a"),
                    Element::octet_string_tagged(SUB_INITIAL, "b"),
                ]),
            ],
        );
        assert!(matches!(Filter::decode(&element), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_decode_unknown_tag() {
        let element = Element::octet_string_tagged(0x8F, "x");
        assert!(matches!(
            Filter::decode(&element),
            Err(Error::UnknownTag { tag: 0x8F, .. })
        ));
    }

    #[test]
    fn test_decode_depth_limit() {
        let mut element = Filter::present("cn").encode();
        for _ in 0..=MAX_DEPTH {
            element = Element::sequence_tagged(NOT, [element]);
        }
        assert!(matches!(Filter::decode(&element), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_simple_item() {
        assert!(Filter::equality("cn", "x").is_simple_item());
        assert!(!Filter::not(Filter::present("cn")).is_simple_item());
        assert!(!Filter::extensible(Some("cn"), None, "x", true).is_simple_item());
    }
}
