//! Search scopes.

use std::fmt;

/// The scope of a search request.
///
/// Kept open like [`crate::ResultCode`] so that a decoded request with an
/// unknown scope value survives until something needs to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SearchScope(i32);

impl SearchScope {
    /// Only the base entry.
    pub const BASE: Self = Self(0);
    /// Immediate children of the base entry.
    pub const ONE: Self = Self(1);
    /// The base entry and everything below it.
    pub const SUB: Self = Self(2);
    /// Everything below the base entry, excluding the base itself.
    pub const SUBORDINATE_SUBTREE: Self = Self(3);

    /// Creates a scope from its wire value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns the scope name, or `None` for an undefined value.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("base"),
            1 => Some("one"),
            2 => Some("sub"),
            3 => Some("subordinates"),
            _ => None,
        }
    }

    /// Returns true for the four scopes defined by RFC 4511 and its
    /// subordinate-subtree extension.
    #[must_use]
    pub const fn is_defined(self) -> bool {
        self.name().is_some()
    }
}

impl From<i32> for SearchScope {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "SCOPE{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(SearchScope::SUB.to_string(), "sub");
        assert_eq!(SearchScope::SUBORDINATE_SUBTREE.to_string(), "subordinates");
        assert_eq!(SearchScope::new(7).to_string(), "SCOPE7");
        assert!(!SearchScope::new(7).is_defined());
        assert_eq!(SearchScope::from(1), SearchScope::ONE);
    }
}
