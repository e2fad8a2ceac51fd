//! Persistent search and entry change notification
//! (draft-ietf-ldapext-psearch).

use std::fmt;
use std::ops::BitOr;

use ldapkit_asn1::{Element, tag};
use ldapkit_core::Dn;

use super::{Control, DecodableControl};
use crate::{Error, Result};

/// One kind of change a persistent search reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// Entry added.
    Add,
    /// Entry deleted.
    Delete,
    /// Entry modified.
    Modify,
    /// Entry renamed or moved.
    ModifyDn,
}

impl ChangeType {
    /// Returns the wire value, a single bit.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::Add => 1,
            Self::Delete => 2,
            Self::Modify => 4,
            Self::ModifyDn => 8,
        }
    }

    /// Looks up a change type by wire value.
    #[must_use]
    pub const fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Add),
            2 => Some(Self::Delete),
            4 => Some(Self::Modify),
            8 => Some(Self::ModifyDn),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Modify => "modify",
            Self::ModifyDn => "moddn",
        })
    }
}

/// A set of [`ChangeType`]s as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChangeTypes(i32);

impl ChangeTypes {
    /// Every change type.
    pub const ALL: Self = Self(15);

    /// Creates a mask from its wire value.
    #[must_use]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn bits(self) -> i32 {
        self.0
    }

    /// Returns true if `change` is in the set.
    #[must_use]
    pub const fn contains(self, change: ChangeType) -> bool {
        self.0 & change.value() != 0
    }
}

impl From<ChangeType> for ChangeTypes {
    fn from(change: ChangeType) -> Self {
        Self(change.value())
    }
}

impl BitOr for ChangeTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr for ChangeType {
    type Output = ChangeTypes;

    fn bitor(self, rhs: Self) -> ChangeTypes {
        ChangeTypes(self.value() | rhs.value())
    }
}

impl BitOr<ChangeType> for ChangeTypes {
    type Output = Self;

    fn bitor(self, rhs: ChangeType) -> Self {
        Self(self.0 | rhs.value())
    }
}

/// Keeps a search open and streams changes to matching entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersistentSearchRequest {
    /// Changes to report.
    pub change_types: ChangeTypes,
    /// Skip the initial search results.
    pub changes_only: bool,
    /// Attach entry change notification controls to each entry.
    pub return_ecs: bool,
    /// Criticality.
    pub critical: bool,
}

impl PersistentSearchRequest {
    /// Creates a critical request.
    #[must_use]
    pub const fn new(change_types: ChangeTypes, changes_only: bool, return_ecs: bool) -> Self {
        Self {
            change_types,
            changes_only,
            return_ecs,
            critical: true,
        }
    }
}

impl DecodableControl for PersistentSearchRequest {
    const OID: &'static str = "2.16.840.1.113730.3.4.3";
    const NAME: &'static str = "Persistent Search";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("persistent search value", 3, 3)?;
        Ok(Self {
            change_types: ChangeTypes(members[0].decode_as_i32()?),
            changes_only: members[1].decode_as_boolean()?,
            return_ecs: members[2].decode_as_boolean()?,
            critical: control.critical,
        })
    }

    fn to_control(&self) -> Control {
        Control::with_element(
            Self::OID,
            self.critical,
            &Element::sequence([
                Element::integer(i64::from(self.change_types.0)),
                Element::boolean(self.changes_only),
                Element::boolean(self.return_ecs),
            ]),
        )
    }
}

/// Attached to an entry returned by a persistent search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryChangeNotification {
    /// What happened to the entry.
    pub change_type: ChangeType,
    /// DN before a rename.
    pub previous_dn: Option<Dn>,
    /// Changelog number.
    pub change_number: Option<i64>,
}

impl DecodableControl for EntryChangeNotification {
    const OID: &'static str = "2.16.840.1.113730.3.4.7";
    const NAME: &'static str = "Entry Change Notification";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("entry change notification value", 1, 3)?;
        let raw = members[0].decode_as_enumerated()?;
        let change_type = ChangeType::from_value(raw)
            .ok_or_else(|| Error::Decoding(format!("invalid change type {raw}")))?;
        let mut previous_dn = None;
        let mut change_number = None;
        for member in &members[1..] {
            match member.tag() {
                tag::OCTET_STRING if previous_dn.is_none() && change_number.is_none() => {
                    previous_dn = Some(Dn::parse(&member.decode_as_string()?)?);
                }
                tag::INTEGER if change_number.is_none() => {
                    change_number = Some(member.decode_as_integer()?);
                }
                other => {
                    return Err(Error::UnknownTag {
                        context: "entry change notification",
                        tag: other,
                    });
                }
            }
        }
        Ok(Self {
            change_type,
            previous_dn,
            change_number,
        })
    }

    fn to_control(&self) -> Control {
        let mut members = vec![Element::enumerated(i64::from(self.change_type.value()))];
        if let Some(dn) = &self.previous_dn {
            members.push(Element::octet_string(dn.as_str()));
        }
        if let Some(number) = self.change_number {
            members.push(Element::integer(number));
        }
        Control::with_element(Self::OID, false, &Element::sequence(members))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_mask() {
        let types = ChangeType::Add | ChangeType::Modify;
        assert_eq!(types.bits(), 5);
        assert!(types.contains(ChangeType::Modify));
        assert!(!types.contains(ChangeType::Delete));
        assert!(ChangeTypes::ALL.contains(ChangeType::ModifyDn));
        assert_eq!((types | ChangeType::Delete).bits(), 7);
    }

    #[test]
    fn test_request_round_trip() {
        let request = PersistentSearchRequest::new(ChangeTypes::ALL, true, true);
        assert_eq!(
            PersistentSearchRequest::decode_control(&request.to_control()).unwrap(),
            request
        );
    }

    #[test]
    fn test_notification_round_trip() {
        let notification = EntryChangeNotification {
            change_type: ChangeType::ModifyDn,
            previous_dn: Some(Dn::parse("cn=old,dc=example,dc=com").unwrap()),
            change_number: Some(42),
        };
        assert_eq!(
            EntryChangeNotification::decode_control(&notification.to_control()).unwrap(),
            notification
        );
    }

    #[test]
    fn test_notification_change_number_only() {
        let value = Element::sequence([Element::enumerated(4), Element::integer(9)]);
        let control = Control::with_element(EntryChangeNotification::OID, false, &value);
        let decoded = EntryChangeNotification::decode_control(&control).unwrap();
        assert_eq!(decoded.change_type, ChangeType::Modify);
        assert_eq!(decoded.change_number, Some(9));
        assert!(decoded.previous_dn.is_none());
    }

    #[test]
    fn test_notification_bad_change_type() {
        let value = Element::sequence([Element::enumerated(3)]);
        let control = Control::with_element(EntryChangeNotification::OID, false, &value);
        assert!(matches!(
            EntryChangeNotification::decode_control(&control),
            Err(Error::Decoding(_))
        ));
    }
}
