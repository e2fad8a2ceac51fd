//! Controls: OID-identified extensions attached to requests and responses.
//!
//! On the wire every control is a [`Control`] with an OID, a criticality
//! flag and optional opaque value bytes. Controls this crate understands
//! implement [`DecodableControl`] and are listed in a registry keyed by OID,
//! so [`decode_any`] can turn a raw control into the matching variant of
//! [`AnyControl`]. Anything else stays [`AnyControl::Raw`].
//!
//! ```
//! use ldapkit_protocol::control::{AnyControl, DecodableControl, SimplePagedResults, decode_any};
//!
//! let request = SimplePagedResults::new(100).to_control();
//! match decode_any(request) {
//!     AnyControl::SimplePagedResults(paged) => assert_eq!(paged.size, 100),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

mod assertion;
mod dirsync;
mod paged;
mod password;
mod persistent_search;
mod proxied_auth;
mod read_entry;
mod simple;
mod sort;
mod sync;
mod vlv;

use std::collections::HashMap;
use std::sync::LazyLock;

use ldapkit_asn1::{Element, tag};

use crate::error::check_count;
use crate::result::LdapResult;
use crate::{Error, Result};

pub use assertion::{AssertionRequest, MatchedValuesRequest};
pub use dirsync::DirSync;
pub use paged::SimplePagedResults;
pub use password::{PasswordExpired, PasswordExpiring};
pub use persistent_search::{
    ChangeType, ChangeTypes, EntryChangeNotification, PersistentSearchRequest,
};
pub use proxied_auth::{
    AuthorizationIdentityResponse, ProxiedAuthorizationV1, ProxiedAuthorizationV2,
};
pub use read_entry::{PostReadRequest, PostReadResponse, PreReadRequest, PreReadResponse};
pub use simple::{
    AuthorizationIdentityRequest, DontUseCopy, ManageDsaIt, PermissiveModify, SubentriesRequest,
    SubtreeDelete, TransactionSpecification,
};
pub use sort::{ServerSideSortRequest, ServerSideSortResponse, SortKey};
pub use sync::{
    SYNC_INFO_OID, SyncDone, SyncInfo, SyncRequest, SyncRequestMode, SyncState, SyncStateKind,
};
pub use vlv::{VirtualListViewRequest, VirtualListViewResponse, VlvTarget};

/// Context tag of the control list in an LDAP message.
pub const CONTROLS_TAG: u8 = 0xA0;

/// A control as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Control {
    /// Control type OID.
    pub oid: String,
    /// Whether the peer must reject the operation if it does not
    /// understand the control.
    pub critical: bool,
    /// Encoded control value.
    pub value: Option<Vec<u8>>,
}

impl Control {
    /// Creates a control.
    #[must_use]
    pub fn new(oid: impl Into<String>, critical: bool, value: Option<Vec<u8>>) -> Self {
        Self {
            oid: oid.into(),
            critical,
            value,
        }
    }

    /// Creates a control whose value is an encoded element.
    #[must_use]
    pub fn with_element(oid: impl Into<String>, critical: bool, value: &Element) -> Self {
        Self::new(oid, critical, Some(value.encode().to_vec()))
    }

    /// Decodes the value as a single BER element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingValue`] if the control has no value, or a BER
    /// error if the value is not exactly one element.
    pub fn value_element(&self) -> Result<Element> {
        let value = self.value.as_deref().ok_or_else(|| Error::MissingValue {
            oid: self.oid.clone(),
        })?;
        Ok(Element::decode(value)?)
    }

    /// Decodes the value as a universal sequence and checks its size.
    pub(crate) fn value_sequence(
        &self,
        context: &'static str,
        min: usize,
        max: usize,
    ) -> Result<Vec<Element>> {
        let members = self.value_element()?.decode_as_sequence()?;
        check_count(context, members.len(), min, max)?;
        Ok(members)
    }

    /// Fails if the control carries a value.
    pub(crate) fn expect_no_value(&self, name: &str) -> Result<()> {
        if self.value.is_some() {
            return Err(Error::Decoding(format!(
                "{name} control ({}) must not have a value",
                self.oid
            )));
        }
        Ok(())
    }

    /// Fails unless the control is marked critical.
    pub(crate) fn expect_critical(&self, name: &str) -> Result<()> {
        if !self.critical {
            return Err(Error::Decoding(format!(
                "{name} control ({}) must be critical",
                self.oid
            )));
        }
        Ok(())
    }

    /// Encodes the control as a SEQUENCE.
    #[must_use]
    pub fn encode(&self) -> Element {
        let mut members = Vec::with_capacity(3);
        members.push(Element::octet_string(&self.oid));
        if self.critical {
            members.push(Element::boolean(true));
        }
        if let Some(value) = &self.value {
            members.push(Element::octet_string(value));
        }
        Element::sequence(members)
    }

    /// Decodes a control SEQUENCE.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence has no OID, more than three members,
    /// or a member of the wrong type.
    pub fn decode(element: &Element) -> Result<Self> {
        let members = element.decode_as_sequence()?;
        check_count("control", members.len(), 1, 3)?;
        let oid = members[0].decode_as_string()?;
        let mut critical = false;
        let mut value = None;
        for (i, member) in members.iter().enumerate().skip(1) {
            match member.tag() {
                tag::BOOLEAN if i == 1 => critical = member.decode_as_boolean()?,
                tag::OCTET_STRING if value.is_none() => value = Some(member.value().to_vec()),
                other => {
                    return Err(Error::UnknownTag {
                        context: "control",
                        tag: other,
                    });
                }
            }
        }
        Ok(Self {
            oid,
            critical,
            value,
        })
    }

    /// Encodes a control list as the `[0]` member of an LDAP message.
    #[must_use]
    pub fn encode_list(controls: &[Self]) -> Element {
        Element::sequence_tagged(CONTROLS_TAG, controls.iter().map(Self::encode))
    }

    /// Decodes the `[0]` control list of an LDAP message.
    ///
    /// # Errors
    ///
    /// Returns an error if the list or any control in it is malformed.
    pub fn decode_list(element: &Element) -> Result<Vec<Self>> {
        element
            .decode_as_sequence_tagged(CONTROLS_TAG)?
            .iter()
            .map(Self::decode)
            .collect()
    }
}

/// A control type with a fixed OID and a typed value.
pub trait DecodableControl: Sized {
    /// Control type OID.
    const OID: &'static str;

    /// Human-readable control name.
    const NAME: &'static str;

    /// Interprets a wire control as this type.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is missing or malformed.
    fn decode_control(control: &Control) -> Result<Self>;

    /// Builds the wire form of this control.
    fn to_control(&self) -> Control;

    /// Finds this control among a result's response controls.
    ///
    /// The first control with a matching OID is decoded. Returns `None` if
    /// the result has no such control.
    ///
    /// # Errors
    ///
    /// Returns an error if a matching control is present but malformed.
    fn get(result: &impl AsRef<LdapResult>) -> Result<Option<Self>> {
        result
            .as_ref()
            .response_control(Self::OID)
            .map(Self::decode_control)
            .transpose()
    }
}

type Decoder = fn(&Control) -> Result<AnyControl>;

macro_rules! registered_controls {
    ($($variant:ident),* $(,)?) => {
        /// A control decoded through the registry.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum AnyControl {
            $(
                #[doc = concat!("A decoded [`", stringify!($variant), "`].")]
                $variant($variant),
            )*
            /// A control with no registered decoder, or whose value the
            /// registered decoder rejected.
            Raw(Control),
        }

        impl AnyControl {
            /// Returns the control OID.
            #[must_use]
            pub fn oid(&self) -> &str {
                match self {
                    $(Self::$variant(_) => <$variant as DecodableControl>::OID,)*
                    Self::Raw(control) => &control.oid,
                }
            }

            /// Returns the control name, or `None` for a raw control.
            #[must_use]
            pub const fn name(&self) -> Option<&'static str> {
                match self {
                    $(Self::$variant(_) => Some(<$variant as DecodableControl>::NAME),)*
                    Self::Raw(_) => None,
                }
            }

            /// Returns the wire form of the control.
            #[must_use]
            pub fn to_control(&self) -> Control {
                match self {
                    $(Self::$variant(c) => c.to_control(),)*
                    Self::Raw(control) => control.clone(),
                }
            }
        }

        static REGISTRY: LazyLock<HashMap<&'static str, Decoder>> = LazyLock::new(|| {
            let mut registry: HashMap<&'static str, Decoder> = HashMap::new();
            $(
                registry.insert(<$variant as DecodableControl>::OID, |control| {
                    $variant::decode_control(control).map(AnyControl::$variant)
                });
            )*
            registry
        });

        #[cfg(test)]
        const REGISTERED_COUNT: usize = [$(stringify!($variant)),*].len();
    };
}

// Request and response controls that share an OID register the response
// type, since responses are what arrive off the wire.
registered_controls!(
    ServerSideSortRequest,
    ServerSideSortResponse,
    SimplePagedResults,
    VirtualListViewRequest,
    VirtualListViewResponse,
    PersistentSearchRequest,
    EntryChangeNotification,
    SyncRequest,
    SyncState,
    SyncDone,
    PreReadResponse,
    PostReadResponse,
    ProxiedAuthorizationV1,
    ProxiedAuthorizationV2,
    ManageDsaIt,
    DontUseCopy,
    PermissiveModify,
    SubtreeDelete,
    AuthorizationIdentityRequest,
    AuthorizationIdentityResponse,
    SubentriesRequest,
    PasswordExpired,
    PasswordExpiring,
    TransactionSpecification,
    AssertionRequest,
    MatchedValuesRequest,
    DirSync,
);

/// Returns true if a decoder is registered for `oid`.
#[must_use]
pub fn is_registered(oid: &str) -> bool {
    REGISTRY.contains_key(oid)
}

/// Decodes a control through the registry.
///
/// Unregistered OIDs and values the registered decoder rejects both yield
/// [`AnyControl::Raw`]. Criticality only binds the server, so a control the
/// client cannot interpret is passed through rather than treated as an
/// error.
#[must_use]
pub fn decode_any(control: Control) -> AnyControl {
    let Some(decoder) = REGISTRY.get(control.oid.as_str()) else {
        return AnyControl::Raw(control);
    };
    match decoder(&control) {
        Ok(decoded) => decoded,
        Err(error) => {
            tracing::debug!(oid = %control.oid, %error, "control value rejected, keeping raw form");
            AnyControl::Raw(control)
        }
    }
}

impl From<AnyControl> for Control {
    fn from(control: AnyControl) -> Self {
        match control {
            AnyControl::Raw(raw) => raw,
            other => other.to_control(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_control_wire_form() {
        let control = Control::new("1.2.3", false, None);
        assert_eq!(
            control.encode().encode().as_ref(),
            &[0x30, 0x07, 0x04, 0x05, b'1', b'.', b'2', b'.', b'3']
        );
        let control = Control::new("1.2.3", true, Some(vec![0xAB]));
        let decoded = Control::decode(&control.encode()).unwrap();
        assert_eq!(decoded, control);
    }

    #[test]
    fn test_control_value_without_criticality() {
        let element = Element::sequence([Element::octet_string("1.2"), Element::octet_string("v")]);
        let control = Control::decode(&element).unwrap();
        assert!(!control.critical);
        assert_eq!(control.value.as_deref(), Some(&b"v"[..]));
    }

    #[test]
    fn test_control_bad_member() {
        let element = Element::sequence([Element::octet_string("1.2"), Element::integer(1)]);
        assert!(matches!(
            Control::decode(&element),
            Err(Error::UnknownTag { tag: 0x02, .. })
        ));
        let element = Element::sequence([]);
        assert!(matches!(
            Control::decode(&element),
            Err(Error::ElementCount { actual: 0, .. })
        ));
    }

    #[test]
    fn test_registry_has_every_control_once() {
        assert_eq!(REGISTRY.len(), REGISTERED_COUNT);
        assert!(is_registered(DirSync::OID));
        assert!(is_registered(PreReadResponse::OID));
        assert!(!is_registered("1.2.3.4"));
    }

    #[test]
    fn test_unknown_oid_stays_raw() {
        let control = Control::new("1.2.3.4", true, Some(vec![1, 2, 3]));
        assert_eq!(decode_any(control.clone()), AnyControl::Raw(control));
    }

    #[test]
    fn test_rejected_value_stays_raw() {
        let control = Control::new(SimplePagedResults::OID, false, Some(vec![0xFF]));
        let decoded = decode_any(control.clone());
        assert_eq!(decoded, AnyControl::Raw(control.clone()));
        assert_eq!(decoded.oid(), SimplePagedResults::OID);
        assert_eq!(decoded.name(), None);
        assert_eq!(Control::from(decoded), control);
    }

    #[test]
    fn test_missing_value() {
        let control = Control::new(SimplePagedResults::OID, false, None);
        assert!(matches!(
            SimplePagedResults::decode_control(&control),
            Err(Error::MissingValue { .. })
        ));
    }

    #[test]
    fn test_list_round_trip() {
        let controls = vec![
            ManageDsaIt { critical: true }.to_control(),
            Control::new("1.2.3", false, Some(vec![])),
        ];
        let element = Control::encode_list(&controls);
        assert_eq!(element.tag(), CONTROLS_TAG);
        assert_eq!(Control::decode_list(&element).unwrap(), controls);
    }
}
