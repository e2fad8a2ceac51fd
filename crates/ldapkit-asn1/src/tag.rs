//! BER tag helpers and universal tag numbers.
//!
//! LDAP only uses single-byte tags, so a tag is carried as a plain `u8`:
//!
//! ```text
//! Bits: 8 7 6 5 4 3 2 1
//!       C C P T T T T T
//! ```

/// UNIVERSAL 1, BOOLEAN.
pub const BOOLEAN: u8 = 0x01;
/// UNIVERSAL 2, INTEGER.
pub const INTEGER: u8 = 0x02;
/// UNIVERSAL 4, OCTET STRING.
pub const OCTET_STRING: u8 = 0x04;
/// UNIVERSAL 5, NULL.
pub const NULL: u8 = 0x05;
/// UNIVERSAL 10, ENUMERATED.
pub const ENUMERATED: u8 = 0x0A;
/// UNIVERSAL 16, constructed SEQUENCE.
pub const SEQUENCE: u8 = 0x30;
/// UNIVERSAL 17, constructed SET.
pub const SET: u8 = 0x31;

/// Bit that marks a constructed encoding.
pub const CONSTRUCTED: u8 = 0x20;

/// Tag class, taken from the two high-order bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    /// Standard ASN.1 types.
    Universal,
    /// Application-specific types (LDAP protocol ops).
    Application,
    /// Context-specific types (optional and choice fields).
    ContextSpecific,
    /// Private types.
    Private,
}

impl TagClass {
    /// Returns the class of a tag byte.
    #[must_use]
    pub const fn of(tag: u8) -> Self {
        match tag >> 6 {
            0 => Self::Universal,
            1 => Self::Application,
            2 => Self::ContextSpecific,
            _ => Self::Private,
        }
    }

    /// Returns the class bits positioned for a tag byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Universal => 0x00,
            Self::Application => 0x40,
            Self::ContextSpecific => 0x80,
            Self::Private => 0xC0,
        }
    }
}

/// Returns true if the tag marks a constructed encoding.
#[must_use]
pub const fn is_constructed(tag: u8) -> bool {
    tag & CONSTRUCTED != 0
}

/// Builds a context-specific primitive tag, e.g. `[0]` → `0x80`.
#[must_use]
pub const fn context(number: u8) -> u8 {
    TagClass::ContextSpecific.bits() | (number & 0x1F)
}

/// Builds a context-specific constructed tag, e.g. `[3]` → `0xA3`.
#[must_use]
pub const fn context_constructed(number: u8) -> u8 {
    context(number) | CONSTRUCTED
}

/// Builds an application primitive tag.
#[must_use]
pub const fn application(number: u8) -> u8 {
    TagClass::Application.bits() | (number & 0x1F)
}

/// Builds an application constructed tag.
#[must_use]
pub const fn application_constructed(number: u8) -> u8 {
    application(number) | CONSTRUCTED
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_class() {
        assert_eq!(TagClass::of(SEQUENCE), TagClass::Universal);
        assert_eq!(TagClass::of(0x63), TagClass::Application);
        assert_eq!(TagClass::of(0xA3), TagClass::ContextSpecific);
        assert_eq!(TagClass::of(0xC0), TagClass::Private);
    }

    #[test]
    fn test_builders() {
        assert_eq!(context(0), 0x80);
        assert_eq!(context(11), 0x8B);
        assert_eq!(context_constructed(3), 0xA3);
        assert_eq!(application(2), 0x42);
        assert_eq!(application_constructed(3), 0x63);
        assert_eq!(application_constructed(25), 0x79);
    }

    #[test]
    fn test_constructed() {
        assert!(is_constructed(SEQUENCE));
        assert!(is_constructed(0x63));
        assert!(!is_constructed(OCTET_STRING));
        assert!(!is_constructed(0x87));
    }
}
