//! Attributes and modifications.

use std::fmt;

use ldapkit_asn1::Element;

use crate::error::check_count;
use crate::{Error, Result};

/// An attribute description with zero or more values (a PartialAttribute).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Attribute description, e.g. `cn` or `userCertificate;binary`.
    pub name: String,
    /// Raw values in server order.
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    /// Creates an attribute with binary values.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Creates an attribute from text values.
    #[must_use]
    pub fn from_strings<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            name,
            values
                .into_iter()
                .map(|v| v.as_ref().as_bytes().to_vec())
                .collect(),
        )
    }

    /// Returns true if the description matches `name`, ignoring case.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Returns the values that are valid UTF-8.
    #[must_use]
    pub fn string_values(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter_map(|v| std::str::from_utf8(v).ok())
            .collect()
    }

    /// Returns the first value as text.
    #[must_use]
    pub fn first_string(&self) -> Option<&str> {
        self.values
            .first()
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Encodes the attribute as a PartialAttribute sequence.
    #[must_use]
    pub fn encode(&self) -> Element {
        Element::sequence([
            Element::octet_string(&self.name),
            Element::set(self.values.iter().map(Element::octet_string)),
        ])
    }

    /// Decodes a PartialAttribute sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not a two-member sequence of a
    /// name and a value set.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence()?;
        check_count("attribute", members.len(), 2, 2)?;
        let name = members[0].decode_as_string()?;
        let values = members[1]
            .decode_as_set()?
            .iter()
            .map(|v| v.decode_as_octet_string().map(<[u8]>::to_vec))
            .collect::<std::result::Result<_, _>>()?;
        Ok(Self { name, values })
    }
}

/// The kind of change a [`Modification`] makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModificationType(i32);

impl ModificationType {
    /// Add values.
    pub const ADD: Self = Self(0);
    /// Delete values, or the whole attribute if none are given.
    pub const DELETE: Self = Self(1);
    /// Replace all values.
    pub const REPLACE: Self = Self(2);
    /// Increment an integer value (RFC 4525).
    pub const INCREMENT: Self = Self(3);

    /// Creates a modification type from its wire value.
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

impl fmt::Display for ModificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("add"),
            1 => f.write_str("delete"),
            2 => f.write_str("replace"),
            3 => f.write_str("increment"),
            n => write!(f, "MOD_TYPE_{n}"),
        }
    }
}

/// One change in a modify request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Modification {
    /// What to do.
    pub mod_type: ModificationType,
    /// Which attribute and values.
    pub attribute: Attribute,
}

impl Modification {
    /// Creates a modification.
    #[must_use]
    pub const fn new(mod_type: ModificationType, attribute: Attribute) -> Self {
        Self {
            mod_type,
            attribute,
        }
    }

    pub(crate) fn encode(&self) -> Element {
        Element::sequence([
            Element::enumerated(i64::from(self.mod_type.0)),
            self.attribute.encode(),
        ])
    }

    pub(crate) fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence()?;
        check_count("modification", members.len(), 2, 2)?;
        Ok(Self {
            mod_type: ModificationType(members[0].decode_as_enumerated()?),
            attribute: Attribute::decode(&members[1])?,
        })
    }
}

/// Decodes a sequence of octet strings as UTF-8 text.
pub(crate) fn decode_strings(elements: &[Element]) -> Result<Vec<String>> {
    elements
        .iter()
        .map(|e| e.decode_as_string().map_err(Error::from))
        .collect()
}
