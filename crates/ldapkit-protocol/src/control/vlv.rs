//! Virtual list view (draft-ietf-ldapext-ldapv3-vlv).

use ldapkit_asn1::Element;
use ldapkit_core::ResultCode;

use super::{Control, DecodableControl};
use crate::error::check_count;
use crate::{Error, Result};

const BY_OFFSET: u8 = 0xA0;
const GREATER_OR_EQUAL: u8 = 0x81;

/// Where the view is positioned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VlvTarget {
    /// A 1-based offset into a list of `content_count` entries.
    ByOffset {
        /// Target position.
        offset: i32,
        /// Client's estimate of the list size; 0 if unknown.
        content_count: i32,
    },
    /// The first entry whose sort key is at least this value.
    GreaterOrEqual(Vec<u8>),
}

/// Requests a window of a sorted result list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualListViewRequest {
    /// Entries to return before the target.
    pub before_count: i32,
    /// Entries to return after the target.
    pub after_count: i32,
    /// Target entry.
    pub target: VlvTarget,
    /// Context from a previous response.
    pub context_id: Option<Vec<u8>>,
    /// Criticality.
    pub critical: bool,
}

impl VirtualListViewRequest {
    /// Creates a critical request positioned by offset.
    #[must_use]
    pub const fn by_offset(
        offset: i32,
        content_count: i32,
        before_count: i32,
        after_count: i32,
    ) -> Self {
        Self {
            before_count,
            after_count,
            target: VlvTarget::ByOffset {
                offset,
                content_count,
            },
            context_id: None,
            critical: true,
        }
    }

    /// Creates a critical request positioned by assertion value.
    #[must_use]
    pub fn greater_or_equal(value: impl AsRef<[u8]>, before_count: i32, after_count: i32) -> Self {
        Self {
            before_count,
            after_count,
            target: VlvTarget::GreaterOrEqual(value.as_ref().to_vec()),
            context_id: None,
            critical: true,
        }
    }

    /// Sets the context ID.
    #[must_use]
    pub fn with_context_id(mut self, context_id: impl Into<Vec<u8>>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }
}

impl DecodableControl for VirtualListViewRequest {
    const OID: &'static str = "2.16.840.1.113730.3.4.9";
    const NAME: &'static str = "Virtual List View Request";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("virtual list view request value", 3, 4)?;
        let target = match members[2].tag() {
            BY_OFFSET => {
                let offset = members[2].decode_as_sequence_tagged(BY_OFFSET)?;
                check_count("virtual list view offset", offset.len(), 2, 2)?;
                VlvTarget::ByOffset {
                    offset: offset[0].decode_as_i32()?,
                    content_count: offset[1].decode_as_i32()?,
                }
            }
            GREATER_OR_EQUAL => VlvTarget::GreaterOrEqual(members[2].value().to_vec()),
            other => {
                return Err(Error::UnknownTag {
                    context: "virtual list view target",
                    tag: other,
                });
            }
        };
        Ok(Self {
            before_count: members[0].decode_as_i32()?,
            after_count: members[1].decode_as_i32()?,
            target,
            context_id: members
                .get(3)
                .map(|e| e.decode_as_octet_string().map(<[u8]>::to_vec))
                .transpose()?,
            critical: control.critical,
        })
    }

    fn to_control(&self) -> Control {
        let target = match &self.target {
            VlvTarget::ByOffset {
                offset,
                content_count,
            } => Element::sequence_tagged(
                BY_OFFSET,
                [
                    Element::integer(i64::from(*offset)),
                    Element::integer(i64::from(*content_count)),
                ],
            ),
            VlvTarget::GreaterOrEqual(value) => {
                Element::octet_string_tagged(GREATER_OR_EQUAL, value)
            }
        };
        let mut members = vec![
            Element::integer(i64::from(self.before_count)),
            Element::integer(i64::from(self.after_count)),
            target,
        ];
        if let Some(context_id) = &self.context_id {
            members.push(Element::octet_string(context_id));
        }
        Control::with_element(Self::OID, self.critical, &Element::sequence(members))
    }
}

/// The server's description of the returned window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualListViewResponse {
    /// Position of the target entry in the list.
    pub target_position: i32,
    /// Server's count of entries in the list.
    pub content_count: i32,
    /// Outcome of the view operation.
    pub result_code: ResultCode,
    /// Context to send with the next request.
    pub context_id: Option<Vec<u8>>,
}

impl DecodableControl for VirtualListViewResponse {
    const OID: &'static str = "2.16.840.1.113730.3.4.10";
    const NAME: &'static str = "Virtual List View Response";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("virtual list view response value", 3, 4)?;
        Ok(Self {
            target_position: members[0].decode_as_i32()?,
            content_count: members[1].decode_as_i32()?,
            result_code: ResultCode::new(members[2].decode_as_enumerated()?),
            context_id: members
                .get(3)
                .map(|e| e.decode_as_octet_string().map(<[u8]>::to_vec))
                .transpose()?,
        })
    }

    fn to_control(&self) -> Control {
        let mut members = vec![
            Element::integer(i64::from(self.target_position)),
            Element::integer(i64::from(self.content_count)),
            Element::enumerated(i64::from(self.result_code.as_i32())),
        ];
        if let Some(context_id) = &self.context_id {
            members.push(Element::octet_string(context_id));
        }
        Control::with_element(Self::OID, false, &Element::sequence(members))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_targets_round_trip() {
        let request = VirtualListViewRequest::by_offset(1, 0, 0, 9);
        assert_eq!(
            VirtualListViewRequest::decode_control(&request.to_control()).unwrap(),
            request
        );
        let request =
            VirtualListViewRequest::greater_or_equal("m", 2, 2).with_context_id(b"ctx".to_vec());
        assert_eq!(
            VirtualListViewRequest::decode_control(&request.to_control()).unwrap(),
            request
        );
    }

    #[test]
    fn test_response_count_checked() {
        let value = Element::sequence([Element::integer(1), Element::integer(2)]);
        let control = Control::with_element(VirtualListViewResponse::OID, false, &value);
        assert!(matches!(
            VirtualListViewResponse::decode_control(&control),
            Err(Error::ElementCount { min: 3, max: 4, actual: 2, .. })
        ));
    }

    #[test]
    fn test_response_round_trip() {
        let response = VirtualListViewResponse {
            target_position: 5,
            content_count: 120,
            result_code: ResultCode::SUCCESS,
            context_id: Some(vec![7]),
        };
        assert_eq!(
            VirtualListViewResponse::decode_control(&response.to_control()).unwrap(),
            response
        );
    }
}
