//! Distinguished names (RFC 4514).
//!
//! A [`Dn`] is a sequence of [`Rdn`]s read from the entry itself (leftmost)
//! up to the root (rightmost). The empty sequence is the null DN, which is
//! the ancestor of every other DN and has no parent.
//!
//! # Example
//!
//! ```ignore
//! use ldapkit_core::Dn;
//!
//! let entry = Dn::parse("CN=Bob,OU=People,DC=example,DC=com")?;
//! let base = Dn::parse("ou=people,dc=example,dc=com")?;
//! assert!(entry.is_descendant_of(&base, false));
//! assert_eq!(entry.parent(), Some(base));
//! ```

mod escape;
mod parser;
mod rdn;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

pub use rdn::{Rdn, RdnComponent};

use crate::schema::Schema;
use crate::{Error, Result, SearchScope};

/// A distinguished name.
///
/// `Display` returns the string the DN was parsed from. Equality and
/// hashing use [`Dn::to_normalized_string`], which is computed on first use
/// and cached for the lifetime of the value.
#[derive(Clone)]
pub struct Dn {
    text: String,
    rdns: Vec<Rdn>,
    normalized: OnceLock<Arc<str>>,
}

impl Dn {
    /// Returns the null DN.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            text: String::new(),
            rdns: Vec::new(),
            normalized: OnceLock::new(),
        }
    }

    /// Parses a DN string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDnSyntax`] naming the offending position if
    /// the text is malformed.
    pub fn parse(s: &str) -> Result<Self> {
        Self::parse_inner(s, None)
    }

    /// Parses a DN that uses `schema` for name aliases and matching.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDnSyntax`] if the text is malformed.
    pub fn parse_with_schema(s: &str, schema: Arc<Schema>) -> Result<Self> {
        Self::parse_inner(s, Some(schema))
    }

    fn parse_inner(s: &str, schema: Option<Arc<Schema>>) -> Result<Self> {
        let rdns = parser::parse_dn(s)?
            .into_iter()
            .map(|parsed| Rdn::from_parsed(parsed, s, schema.clone()))
            .collect();
        Ok(Self {
            text: s.to_string(),
            rdns,
            normalized: OnceLock::new(),
        })
    }

    /// Builds a DN from RDNs ordered leaf first.
    #[must_use]
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        let text = rdns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            text,
            rdns,
            normalized: OnceLock::new(),
        }
    }

    /// Builds the DN of an entry named `rdn` directly below `parent`.
    #[must_use]
    pub fn from_rdn_and_parent(rdn: Rdn, parent: &Self) -> Self {
        let text = if parent.is_null() {
            rdn.to_string()
        } else {
            format!("{rdn},{}", parent.text)
        };
        let mut rdns = Vec::with_capacity(parent.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(parent.rdns.iter().cloned());
        Self {
            text,
            rdns,
            normalized: OnceLock::new(),
        }
    }

    /// Returns the DN of the child of this entry named `rdn`.
    #[must_use]
    pub fn child(&self, rdn: Rdn) -> Self {
        Self::from_rdn_and_parent(rdn, self)
    }

    /// Returns true for the null DN.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Returns the number of RDNs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    /// Returns true for the null DN.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_null()
    }

    /// Returns the leftmost RDN, or `None` for the null DN.
    #[must_use]
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// Returns all RDNs, leaf first.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Returns the original string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the parent DN.
    ///
    /// The null DN and single-RDN DNs have no parent.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.rdns.len() <= 1 {
            return None;
        }
        Some(Self::from_rdns(self.rdns[1..].to_vec()))
    }

    /// Returns the string form of the parent DN.
    #[must_use]
    pub fn parent_string(&self) -> Option<String> {
        self.parent().map(|p| p.text)
    }

    /// Returns true if this DN is above `other` in the tree.
    ///
    /// With `allow_equals`, a DN is also its own ancestor. The null DN is an
    /// ancestor of every non-null DN.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self, allow_equals: bool) -> bool {
        match self.rdns.len().cmp(&other.rdns.len()) {
            Ordering::Greater => false,
            Ordering::Equal => allow_equals && self == other,
            Ordering::Less => self
                .rdns
                .iter()
                .rev()
                .zip(other.rdns.iter().rev())
                .all(|(a, b)| a == b),
        }
    }

    /// Returns true if this DN is below `other` in the tree.
    #[must_use]
    pub fn is_descendant_of(&self, other: &Self, allow_equals: bool) -> bool {
        other.is_ancestor_of(self, allow_equals)
    }

    /// Parses `other` and checks whether this DN is its ancestor.
    ///
    /// # Errors
    ///
    /// Returns an error if `other` is not a valid DN.
    pub fn is_ancestor_of_str(&self, other: &str, allow_equals: bool) -> Result<bool> {
        Ok(self.is_ancestor_of(&Self::parse(other)?, allow_equals))
    }

    /// Parses `other` and checks whether this DN is its descendant.
    ///
    /// # Errors
    ///
    /// Returns an error if `other` is not a valid DN.
    pub fn is_descendant_of_str(&self, other: &str, allow_equals: bool) -> Result<bool> {
        Ok(self.is_descendant_of(&Self::parse(other)?, allow_equals))
    }

    /// Returns true if this DN falls inside a search of `base` with `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Param`] for an undefined scope value.
    pub fn matches_base_and_scope(&self, base: &Self, scope: SearchScope) -> Result<bool> {
        match scope {
            SearchScope::BASE => Ok(self == base),
            SearchScope::ONE => Ok(self.parent().as_ref() == Some(base)
                || (base.is_null() && self.rdns.len() == 1)),
            SearchScope::SUB => Ok(self.is_descendant_of(base, true)),
            SearchScope::SUBORDINATE_SUBTREE => Ok(self.is_descendant_of(base, false)),
            other => Err(Error::Param(format!(
                "search scope {} is not supported for base and scope matching",
                other.as_i32()
            ))),
        }
    }

    /// Returns the canonical form used for equality and hashing.
    ///
    /// Attribute names are lowercased and de-aliased, values are case
    /// folded and space-collapsed unless the schema marks them case-exact,
    /// and multi-valued RDN components are sorted.
    #[must_use]
    pub fn to_normalized_string(&self) -> &str {
        // Concurrent first calls may both compute; either result is valid.
        self.normalized.get_or_init(|| {
            self.rdns
                .iter()
                .map(Rdn::to_normalized_string)
                .collect::<Vec<_>>()
                .join(",")
                .into()
        })
    }

    /// Returns the DN with only the RFC 4514 mandatory characters escaped.
    #[must_use]
    pub fn to_minimally_encoded_string(&self) -> String {
        self.rdns
            .iter()
            .map(Rdn::to_minimally_encoded_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Returns the schema the DN was parsed with, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.rdns.first().and_then(Rdn::schema)
    }

    /// Parses and normalizes a DN string.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid DN.
    pub fn normalize(s: &str) -> Result<String> {
        Ok(Self::parse(s)?.to_normalized_string().to_string())
    }

    /// Returns true if `s` parses as a DN.
    #[must_use]
    pub fn is_valid(s: &str) -> bool {
        parser::parse_dn(s).is_ok()
    }

    /// Compares two DN strings in hierarchical order.
    ///
    /// # Errors
    ///
    /// Returns an error if either string is not a valid DN.
    pub fn compare_str(a: &str, b: &str) -> Result<Ordering> {
        Ok(Self::parse(a)?.cmp(&Self::parse(b)?))
    }

    /// Returns true if two DN strings name the same entry.
    ///
    /// # Errors
    ///
    /// Returns an error if either string is not a valid DN.
    pub fn equals_str(a: &str, b: &str) -> Result<bool> {
        Ok(Self::parse(a)? == Self::parse(b)?)
    }
}

impl Default for Dn {
    fn default() -> Self {
        Self::null()
    }
}

impl FromStr for Dn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dn").field(&self.text).finish()
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.to_normalized_string() == other.to_normalized_string()
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_normalized_string().hash(state);
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    /// Orders DNs by walking both RDN sequences from the root end, so a
    /// sorted list keeps every subtree together with its ancestors first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.rdns
            .iter()
            .rev()
            .zip(other.rdns.iter().rev())
            .map(|(a, b)| a.cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| self.rdns.len().cmp(&other.rdns.len()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Dn {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Dn {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
