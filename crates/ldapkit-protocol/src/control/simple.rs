//! Controls with no value, or a single scalar value.

use ldapkit_asn1::Element;

use super::{Control, DecodableControl};
use crate::{Error, Result};

macro_rules! value_less_control {
    ($(#[$doc:meta])* $name:ident, $oid:literal, $display:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            /// Criticality.
            pub critical: bool,
        }

        impl $name {
            /// Creates the control.
            #[must_use]
            pub const fn new(critical: bool) -> Self {
                Self { critical }
            }
        }

        impl DecodableControl for $name {
            const OID: &'static str = $oid;
            const NAME: &'static str = $display;

            fn decode_control(control: &Control) -> Result<Self> {
                control.expect_no_value(Self::NAME)?;
                Ok(Self {
                    critical: control.critical,
                })
            }

            fn to_control(&self) -> Control {
                Control::new(Self::OID, self.critical, None)
            }
        }
    };
}

value_less_control!(
    /// Treats referral objects as normal entries (RFC 3296).
    ManageDsaIt,
    "2.16.840.1.113730.3.4.2",
    "ManageDsaIT"
);

value_less_control!(
    /// Asks that shadow copies not be used (RFC 6171).
    DontUseCopy,
    "1.3.6.1.1.22",
    "Don't Use Copy"
);

value_less_control!(
    /// Makes adding an existing value or deleting a missing one succeed.
    PermissiveModify,
    "1.2.840.113556.1.4.1413",
    "Permissive Modify"
);

value_less_control!(
    /// Deletes an entry together with its subordinates.
    SubtreeDelete,
    "1.2.840.113556.1.4.805",
    "Subtree Delete"
);

value_less_control!(
    /// Asks the server to return the bound identity (RFC 3829).
    AuthorizationIdentityRequest,
    "2.16.840.1.113730.3.4.16",
    "Authorization Identity Request"
);

/// Controls whether subentries are returned (RFC 3672).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubentriesRequest {
    /// Return subentries instead of normal entries.
    pub visible: bool,
    /// Criticality.
    pub critical: bool,
}

impl DecodableControl for SubentriesRequest {
    const OID: &'static str = "1.3.6.1.4.1.4203.1.10.1";
    const NAME: &'static str = "Subentries";

    fn decode_control(control: &Control) -> Result<Self> {
        Ok(Self {
            visible: control.value_element()?.decode_as_boolean()?,
            critical: control.critical,
        })
    }

    fn to_control(&self) -> Control {
        Control::with_element(Self::OID, self.critical, &Element::boolean(self.visible))
    }
}

/// Runs an update inside a transaction (RFC 5805).
///
/// Always critical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionSpecification {
    /// Identifier from the start transaction response.
    pub transaction_id: Vec<u8>,
}

impl DecodableControl for TransactionSpecification {
    const OID: &'static str = "1.3.6.1.1.21.2";
    const NAME: &'static str = "Transaction Specification";

    fn decode_control(control: &Control) -> Result<Self> {
        let transaction_id = control.value.clone().ok_or_else(|| Error::MissingValue {
            oid: control.oid.clone(),
        })?;
        Ok(Self { transaction_id })
    }

    fn to_control(&self) -> Control {
        Control::new(Self::OID, true, Some(self.transaction_id.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_value_less_round_trip() {
        let control = SubtreeDelete::new(true).to_control();
        assert_eq!(control.oid, "1.2.840.113556.1.4.805");
        assert!(control.value.is_none());
        assert_eq!(SubtreeDelete::decode_control(&control).unwrap(), SubtreeDelete::new(true));
    }

    #[test]
    fn test_value_less_rejects_value() {
        let control = Control::new(ManageDsaIt::OID, false, Some(vec![]));
        let err = ManageDsaIt::decode_control(&control).unwrap_err();
        assert!(err.to_string().contains("must not have a value"));
    }

    #[test]
    fn test_subentries_round_trip() {
        let request = SubentriesRequest {
            visible: true,
            critical: false,
        };
        assert_eq!(SubentriesRequest::decode_control(&request.to_control()).unwrap(), request);
    }

    #[test]
    fn test_transaction_id_is_raw() {
        let spec = TransactionSpecification {
            transaction_id: vec![0, 1, 2],
        };
        let control = spec.to_control();
        assert!(control.critical);
        assert_eq!(control.value.as_deref(), Some(&[0u8, 1, 2][..]));
        assert_eq!(TransactionSpecification::decode_control(&control).unwrap(), spec);
    }
}
