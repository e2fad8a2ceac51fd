//! Attribute naming and matching hints for DN handling.
//!
//! A [`Schema`] never validates anything. It only tells the DN code which
//! attribute names are aliases of one another and which attributes compare
//! their values case-sensitively.

use std::collections::{HashMap, HashSet};

/// Attribute name aliases and case-exact attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    aliases: HashMap<String, String>,
    case_exact: HashSet<String>,
}

/// Well-known alias → canonical pairs for naming attributes.
const STANDARD_ALIASES: &[(&str, &str)] = &[
    ("commonname", "cn"),
    ("2.5.4.3", "cn"),
    ("surname", "sn"),
    ("2.5.4.4", "sn"),
    ("countryname", "c"),
    ("2.5.4.6", "c"),
    ("localityname", "l"),
    ("2.5.4.7", "l"),
    ("stateorprovincename", "st"),
    ("2.5.4.8", "st"),
    ("streetaddress", "street"),
    ("2.5.4.9", "street"),
    ("organizationname", "o"),
    ("2.5.4.10", "o"),
    ("organizationalunitname", "ou"),
    ("2.5.4.11", "ou"),
    ("userid", "uid"),
    ("0.9.2342.19200300.100.1.1", "uid"),
    ("domaincomponent", "dc"),
    ("0.9.2342.19200300.100.1.25", "dc"),
];

impl Schema {
    /// Creates a schema with no aliases and no case-exact attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema that knows the standard naming attribute aliases.
    #[must_use]
    pub fn standard() -> Self {
        STANDARD_ALIASES
            .iter()
            .fold(Self::new(), |schema, (alias, canonical)| {
                schema.with_alias(alias, canonical)
            })
    }

    /// Registers `alias` as another name for `canonical`.
    #[must_use]
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases
            .insert(alias.to_ascii_lowercase(), canonical.to_ascii_lowercase());
        self
    }

    /// Marks an attribute as comparing its values case-sensitively.
    #[must_use]
    pub fn with_case_exact_attribute(mut self, name: &str) -> Self {
        let canonical = self.canonical_name(name);
        self.case_exact.insert(canonical);
        self
    }

    /// Returns the canonical lowercase form of an attribute name.
    #[must_use]
    pub fn canonical_name(&self, name: &str) -> String {
        let lower = strip_oid_prefix(name).to_ascii_lowercase();
        match self.aliases.get(&lower) {
            Some(canonical) => canonical.clone(),
            None => lower,
        }
    }

    /// Returns true if values of `name` compare case-sensitively.
    #[must_use]
    pub fn is_case_exact(&self, name: &str) -> bool {
        !self.case_exact.is_empty() && self.case_exact.contains(&self.canonical_name(name))
    }
}

/// Returns the canonical name of an attribute when no schema is available.
#[must_use]
pub fn default_canonical_name(name: &str) -> String {
    strip_oid_prefix(name).to_ascii_lowercase()
}

fn strip_oid_prefix(name: &str) -> &str {
    match name.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("oid.") => &name[4..],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_aliases() {
        let schema = Schema::standard();
        assert_eq!(schema.canonical_name("commonName"), "cn");
        assert_eq!(schema.canonical_name("2.5.4.3"), "cn");
        assert_eq!(schema.canonical_name("OID.2.5.4.11"), "ou");
        assert_eq!(schema.canonical_name("description"), "description");
    }

    #[test]
    fn test_case_exact_follows_aliases() {
        let schema = Schema::new()
            .with_alias("userId", "uid")
            .with_case_exact_attribute("UID");
        assert!(schema.is_case_exact("uid"));
        assert!(schema.is_case_exact("userid"));
        assert!(!schema.is_case_exact("cn"));
    }

    #[test]
    fn test_default_canonical_name() {
        assert_eq!(default_canonical_name("CN"), "cn");
        assert_eq!(default_canonical_name("oid.2.5.4.3"), "2.5.4.3");
    }
}
