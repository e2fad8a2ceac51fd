//! Active Directory DirSync control.

use ldapkit_asn1::Element;

use super::{Control, DecodableControl};
use crate::Result;

/// Incremental replication of directory changes.
///
/// The same control is sent with the search and returned with the result;
/// the returned cookie is passed back to continue from that point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirSync {
    /// Bit-wise OR of the `FLAG_*` constants.
    pub flags: i32,
    /// Most attribute values to return per entry.
    pub max_attribute_count: i32,
    /// Replication state; empty for the first request.
    pub cookie: Vec<u8>,
    /// Criticality.
    pub critical: bool,
}

impl DirSync {
    /// Return only objects and attributes the caller may read.
    pub const FLAG_OBJECT_SECURITY: i32 = 0x0000_0001;
    /// Return parents before children.
    pub const FLAG_ANCESTORS_FIRST_ORDER: i32 = 0x0000_0800;
    /// Omit private data.
    pub const FLAG_PUBLIC_DATA_ONLY: i32 = 0x0000_2000;
    /// Return only changed values of multi-valued attributes.
    pub const FLAG_INCREMENTAL_VALUES: i32 = i32::MIN;

    /// Creates a critical control. A missing cookie becomes empty.
    #[must_use]
    pub fn new(flags: i32, max_attribute_count: i32, cookie: Option<Vec<u8>>) -> Self {
        Self {
            flags,
            max_attribute_count,
            cookie: cookie.unwrap_or_default(),
            critical: true,
        }
    }

    /// Returns true if `flag` is set.
    #[must_use]
    pub const fn has_flag(&self, flag: i32) -> bool {
        self.flags & flag != 0
    }
}

impl Default for DirSync {
    fn default() -> Self {
        Self::new(0, 0, None)
    }
}

impl DecodableControl for DirSync {
    const OID: &'static str = "1.2.840.113556.1.4.841";
    const NAME: &'static str = "DirSync";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("DirSync value", 3, 3)?;
        Ok(Self {
            flags: members[0].decode_as_i32()?,
            max_attribute_count: members[1].decode_as_i32()?,
            cookie: members[2].decode_as_octet_string()?.to_vec(),
            critical: control.critical,
        })
    }

    fn to_control(&self) -> Control {
        Control::with_element(
            Self::OID,
            self.critical,
            &Element::sequence([
                Element::integer(i64::from(self.flags)),
                Element::integer(i64::from(self.max_attribute_count)),
                Element::octet_string(&self.cookie),
            ]),
        )
    }
}
