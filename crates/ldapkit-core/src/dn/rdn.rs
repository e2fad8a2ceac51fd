//! Relative distinguished names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use super::escape::{Escaping, escape_value, normalize_value};
use super::parser::{ParsedRdn, parse_rdn};
use crate::schema::{Schema, default_canonical_name};
use crate::{Error, Result};

/// One `type=value` pair inside an RDN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdnComponent {
    name: String,
    value: Vec<u8>,
}

impl RdnComponent {
    /// Creates a component.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the attribute name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw value bytes.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the value as text if it is valid UTF-8.
    #[must_use]
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

#[derive(Debug)]
struct Normalized {
    components: Vec<(String, String)>,
    string: String,
}

/// A relative distinguished name: one or more attribute values that name
/// an entry relative to its parent.
///
/// Equality, hashing and ordering use the normalized form, so the order of
/// the components in a multi-valued RDN does not matter.
#[derive(Clone)]
pub struct Rdn {
    components: Vec<RdnComponent>,
    text: String,
    schema: Option<Arc<Schema>>,
    normalized: OnceLock<Arc<Normalized>>,
}

impl Rdn {
    /// Creates a single-valued RDN.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::build(vec![RdnComponent::new(name, value)], None)
    }

    /// Creates an RDN from one or more components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Param`] if `components` is empty.
    pub fn from_components(components: Vec<RdnComponent>) -> Result<Self> {
        if components.is_empty() {
            return Err(Error::Param("an RDN needs at least one component".into()));
        }
        Ok(Self::build(components, None))
    }

    /// Parses a string holding exactly one RDN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDnSyntax`] if the text is malformed.
    pub fn parse(s: &str) -> Result<Self> {
        parse_rdn(s).map(|parsed| Self::from_parsed(parsed, s, None))
    }

    /// Parses an RDN that uses `schema` for name aliases and matching.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDnSyntax`] if the text is malformed.
    pub fn parse_with_schema(s: &str, schema: Arc<Schema>) -> Result<Self> {
        parse_rdn(s).map(|parsed| Self::from_parsed(parsed, s, Some(schema)))
    }

    /// Returns a copy of this RDN that normalizes with `schema`.
    #[must_use]
    pub fn with_schema(self, schema: Arc<Schema>) -> Self {
        Self {
            components: self.components,
            text: self.text,
            schema: Some(schema),
            normalized: OnceLock::new(),
        }
    }

    pub(crate) fn from_parsed(parsed: ParsedRdn, input: &str, schema: Option<Arc<Schema>>) -> Self {
        let components = parsed
            .components
            .into_iter()
            .map(|c| RdnComponent::new(c.name, c.value))
            .collect();
        Self {
            components,
            text: input[parsed.start..parsed.end].to_string(),
            schema,
            normalized: OnceLock::new(),
        }
    }

    fn build(components: Vec<RdnComponent>, schema: Option<Arc<Schema>>) -> Self {
        let text = render(&components, Escaping::Full);
        Self {
            components,
            text,
            schema,
            normalized: OnceLock::new(),
        }
    }

    /// Returns the components in the order they were written.
    #[must_use]
    pub fn components(&self) -> &[RdnComponent] {
        &self.components
    }

    /// Returns the attribute names in the order they were written.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        self.components.iter().map(RdnComponent::name).collect()
    }

    /// Returns the raw attribute values in the order they were written.
    #[must_use]
    pub fn attribute_values(&self) -> Vec<&[u8]> {
        self.components.iter().map(RdnComponent::value).collect()
    }

    /// Returns true if the RDN has more than one component.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.components.len() > 1
    }

    /// Returns true if any component uses the attribute `name` or an alias
    /// of it.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        let wanted = self.canonical_name(name);
        self.components
            .iter()
            .any(|c| self.canonical_name(&c.name) == wanted)
    }

    /// Returns true if some component matches `name` with `value` under the
    /// attribute's matching rules.
    #[must_use]
    pub fn has_attribute_value(&self, name: &str, value: impl AsRef<[u8]>) -> bool {
        let wanted_name = self.canonical_name(name);
        let wanted_value = normalize_value(value.as_ref(), self.is_case_exact(&wanted_name));
        self.normalized()
            .components
            .iter()
            .any(|(n, v)| *n == wanted_name && *v == wanted_value)
    }

    /// Returns the canonical form used for equality and hashing.
    #[must_use]
    pub fn to_normalized_string(&self) -> &str {
        &self.normalized().string
    }

    /// Returns the RDN with only the RFC 4514 mandatory characters escaped.
    #[must_use]
    pub fn to_minimally_encoded_string(&self) -> String {
        render(&self.components, Escaping::Minimal)
    }

    pub(crate) fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    fn canonical_name(&self, name: &str) -> String {
        self.schema.as_ref().map_or_else(
            || default_canonical_name(name),
            |schema| schema.canonical_name(name),
        )
    }

    fn is_case_exact(&self, canonical: &str) -> bool {
        self.schema
            .as_ref()
            .is_some_and(|schema| schema.is_case_exact(canonical))
    }

    fn normalized(&self) -> &Normalized {
        // Computing twice under a race is harmless: the result is the same.
        self.normalized.get_or_init(|| {
            let mut components: Vec<(String, String)> = self
                .components
                .iter()
                .map(|c| {
                    let name = self.canonical_name(&c.name);
                    let value = normalize_value(&c.value, self.is_case_exact(&name));
                    (name, value)
                })
                .collect();
            components.sort();
            let string = components
                .iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join("+");
            Arc::new(Normalized { components, string })
        })
    }
}

fn render(components: &[RdnComponent], escaping: Escaping) -> String {
    components
        .iter()
        .map(|c| format!("{}={}", c.name, escape_value(&c.value, escaping)))
        .collect::<Vec<_>>()
        .join("+")
}

impl FromStr for Rdn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rdn").field(&self.text).finish()
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.to_normalized_string() == other.to_normalized_string()
    }
}

impl Eq for Rdn {}

impl Hash for Rdn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_normalized_string().hash(state);
    }
}

impl PartialOrd for Rdn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rdn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized()
            .components
            .cmp(&other.normalized().components)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_display_keeps_text() {
        let rdn = Rdn::parse("CN=Bob Smith  ").unwrap();
        assert_eq!(rdn.to_string(), "CN=Bob Smith");
        assert_eq!(rdn.to_normalized_string(), "cn=bob smith");
    }

    #[test]
    fn test_multi_valued_order_independent() {
        let a = Rdn::parse("cn=Bob+uid=bob").unwrap();
        let b = Rdn::parse("UID=BOB+CN=bob").unwrap();
        assert_eq!(a, b);
        assert!(a.is_multi_valued());
        let set: HashSet<Rdn> = [a.clone(), b].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert_eq!(a.attribute_names(), vec!["cn", "uid"]);
    }

    #[test]
    fn test_constructed_rdn_escapes() {
        let rdn = Rdn::new("cn", "Doe, John");
        assert_eq!(rdn.to_string(), "cn=Doe\\, John");
        assert_eq!(Rdn::parse(&rdn.to_string()).unwrap(), rdn);
    }

    #[test]
    fn test_from_components_requires_one() {
        assert!(matches!(
            Rdn::from_components(vec![]),
            Err(Error::Param(_))
        ));
        let rdn = Rdn::from_components(vec![
            RdnComponent::new("sn", "a"),
            RdnComponent::new("cn", "b"),
        ])
        .unwrap();
        assert_eq!(rdn.to_normalized_string(), "cn=b+sn=a");
    }

    #[test]
    fn test_has_attribute_value() {
        let rdn = Rdn::parse("cn=John  Smith").unwrap();
        assert!(rdn.has_attribute("CN"));
        assert!(!rdn.has_attribute("sn"));
        assert!(rdn.has_attribute_value("cn", "john smith"));
        assert!(!rdn.has_attribute_value("cn", "john"));
    }

    #[test]
    fn test_schema_aliases_and_case_exact() {
        let schema = Arc::new(
            Schema::standard().with_case_exact_attribute("uid"),
        );
        let a = Rdn::parse_with_schema("commonName=Bob", schema.clone()).unwrap();
        let b = Rdn::parse_with_schema("cn=bob", schema.clone()).unwrap();
        assert_eq!(a, b);
        let c = Rdn::parse_with_schema("uid=Bob", schema.clone()).unwrap();
        let d = Rdn::parse_with_schema("uid=bob", schema).unwrap();
        assert_ne!(c, d);
        assert_eq!(
            Rdn::parse("uid=Bob").unwrap(),
            Rdn::parse("uid=bob").unwrap()
        );
    }

    #[test]
    fn test_ordering_uses_values() {
        let a = Rdn::parse("cn=alpha").unwrap();
        let b = Rdn::parse("CN=Beta").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_minimal_encoding() {
        let rdn = Rdn::parse(r"cn=a\=b\2c c").unwrap();
        assert_eq!(rdn.to_minimally_encoded_string(), r"cn=a=b\, c");
    }
}
