//! Content synchronization (RFC 4533).

use ldapkit_asn1::{Element, tag};

use super::{Control, DecodableControl};
use crate::op::IntermediateResponse;
use crate::{Error, Result};

/// OID of the Sync Info intermediate response.
pub const SYNC_INFO_OID: &str = "1.3.6.1.4.1.4203.1.9.1.4";

const NEW_COOKIE: u8 = 0x80;
const REFRESH_DELETE: u8 = 0xA1;
const REFRESH_PRESENT: u8 = 0xA2;
const SYNC_ID_SET: u8 = 0xA3;

/// Sync request mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncRequestMode {
    /// Bring the client up to date, then end the search.
    RefreshOnly,
    /// Bring the client up to date, then keep streaming changes.
    RefreshAndPersist,
}

impl SyncRequestMode {
    const fn value(self) -> i64 {
        match self {
            Self::RefreshOnly => 1,
            Self::RefreshAndPersist => 3,
        }
    }
}

/// Starts a content synchronization search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncRequest {
    /// Refresh mode.
    pub mode: SyncRequestMode,
    /// State from a previous session.
    pub cookie: Option<Vec<u8>>,
    /// Ask the server to reload rather than fail if the cookie is stale.
    pub reload_hint: bool,
    /// Criticality.
    pub critical: bool,
}

impl SyncRequest {
    /// Creates a critical request.
    #[must_use]
    pub const fn new(mode: SyncRequestMode, cookie: Option<Vec<u8>>) -> Self {
        Self {
            mode,
            cookie,
            reload_hint: false,
            critical: true,
        }
    }
}

impl DecodableControl for SyncRequest {
    const OID: &'static str = "1.3.6.1.4.1.4203.1.9.1.1";
    const NAME: &'static str = "Content Synchronization Request";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("sync request value", 1, 3)?;
        let mode = match members[0].decode_as_enumerated()? {
            1 => SyncRequestMode::RefreshOnly,
            3 => SyncRequestMode::RefreshAndPersist,
            other => return Err(Error::Decoding(format!("invalid sync request mode {other}"))),
        };
        let (cookie, reload_hint) = cookie_and_flag(&members[1..], "sync request", false)?;
        Ok(Self {
            mode,
            cookie,
            reload_hint,
            critical: control.critical,
        })
    }

    fn to_control(&self) -> Control {
        let mut members = vec![Element::enumerated(self.mode.value())];
        members.extend(self.cookie.iter().map(Element::octet_string));
        if self.reload_hint {
            members.push(Element::boolean(true));
        }
        Control::with_element(Self::OID, self.critical, &Element::sequence(members))
    }
}

/// What a sync state control says about its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStateKind {
    /// Entry is unchanged and still present.
    Present,
    /// Entry was added.
    Add,
    /// Entry was modified.
    Modify,
    /// Entry was deleted.
    Delete,
}

/// Attached to each entry of a sync search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncState {
    /// What happened to the entry.
    pub state: SyncStateKind,
    /// The entry's entryUUID.
    pub entry_uuid: [u8; 16],
    /// Updated session state.
    pub cookie: Option<Vec<u8>>,
}

impl DecodableControl for SyncState {
    const OID: &'static str = "1.3.6.1.4.1.4203.1.9.1.2";
    const NAME: &'static str = "Content Synchronization State";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("sync state value", 2, 3)?;
        let state = match members[0].decode_as_enumerated()? {
            0 => SyncStateKind::Present,
            1 => SyncStateKind::Add,
            2 => SyncStateKind::Modify,
            3 => SyncStateKind::Delete,
            other => return Err(Error::Decoding(format!("invalid sync state {other}"))),
        };
        let uuid = members[1].decode_as_octet_string()?;
        let entry_uuid = <[u8; 16]>::try_from(uuid).map_err(|_| {
            Error::Decoding(format!("entryUUID must be 16 bytes, got {}", uuid.len()))
        })?;
        Ok(Self {
            state,
            entry_uuid,
            cookie: members
                .get(2)
                .map(|e| e.decode_as_octet_string().map(<[u8]>::to_vec))
                .transpose()?,
        })
    }

    fn to_control(&self) -> Control {
        let state = match self.state {
            SyncStateKind::Present => 0,
            SyncStateKind::Add => 1,
            SyncStateKind::Modify => 2,
            SyncStateKind::Delete => 3,
        };
        let mut members = vec![
            Element::enumerated(state),
            Element::octet_string(self.entry_uuid),
        ];
        members.extend(self.cookie.iter().map(Element::octet_string));
        Control::with_element(Self::OID, false, &Element::sequence(members))
    }
}

/// Attached to the SearchResultDone of a sync search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncDone {
    /// Final session state.
    pub cookie: Option<Vec<u8>>,
    /// Entries not returned during refresh were deleted.
    pub refresh_deletes: bool,
}

impl DecodableControl for SyncDone {
    const OID: &'static str = "1.3.6.1.4.1.4203.1.9.1.3";
    const NAME: &'static str = "Content Synchronization Done";

    fn decode_control(control: &Control) -> Result<Self> {
        let members = control.value_sequence("sync done value", 0, 2)?;
        let (cookie, refresh_deletes) = cookie_and_flag(&members, "sync done", false)?;
        Ok(Self {
            cookie,
            refresh_deletes,
        })
    }

    fn to_control(&self) -> Control {
        let mut members: Vec<Element> = self.cookie.iter().map(Element::octet_string).collect();
        if self.refresh_deletes {
            members.push(Element::boolean(true));
        }
        Control::with_element(Self::OID, false, &Element::sequence(members))
    }
}

/// The value of a Sync Info intermediate response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyncInfo {
    /// A new cookie with no other change.
    NewCookie(Vec<u8>),
    /// The refresh phase using delete messages ended.
    RefreshDelete {
        /// Updated session state.
        cookie: Option<Vec<u8>>,
        /// The refresh phase is complete.
        refresh_done: bool,
    },
    /// The refresh phase using present messages ended.
    RefreshPresent {
        /// Updated session state.
        cookie: Option<Vec<u8>>,
        /// The refresh phase is complete.
        refresh_done: bool,
    },
    /// A set of entries that were deleted or are still present.
    SyncIdSet {
        /// Updated session state.
        cookie: Option<Vec<u8>>,
        /// The UUIDs name deleted entries rather than present ones.
        refresh_deletes: bool,
        /// entryUUIDs.
        uuids: Vec<[u8; 16]>,
    },
}

impl SyncInfo {
    /// Decodes the value of a Sync Info intermediate response.
    ///
    /// # Errors
    ///
    /// Returns an error if the response has the wrong OID, no value, or an
    /// invalid value.
    pub fn decode(response: &IntermediateResponse) -> Result<Self> {
        if response.oid.as_deref() != Some(SYNC_INFO_OID) {
            return Err(Error::Decoding(format!(
                "intermediate response {:?} is not a sync info message",
                response.oid
            )));
        }
        let value = response.value.as_deref().ok_or_else(|| Error::MissingValue {
            oid: SYNC_INFO_OID.to_string(),
        })?;
        let element = Element::decode(value)?;
        match element.tag() {
            NEW_COOKIE => Ok(Self::NewCookie(element.value().to_vec())),
            REFRESH_DELETE | REFRESH_PRESENT => {
                let members = element.members()?;
                let (cookie, refresh_done) = cookie_and_flag(&members, "sync info refresh", true)?;
                Ok(if element.tag() == REFRESH_DELETE {
                    Self::RefreshDelete {
                        cookie,
                        refresh_done,
                    }
                } else {
                    Self::RefreshPresent {
                        cookie,
                        refresh_done,
                    }
                })
            }
            SYNC_ID_SET => {
                let members = element.members()?;
                let Some((set, rest)) = members.split_last() else {
                    return Err(Error::Decoding("sync ID set has no UUIDs".to_string()));
                };
                let (cookie, refresh_deletes) = cookie_and_flag(rest, "sync ID set", false)?;
                let uuids = set
                    .decode_as_set()?
                    .iter()
                    .map(|e| {
                        let bytes = e.decode_as_octet_string()?;
                        <[u8; 16]>::try_from(bytes).map_err(|_| {
                            Error::Decoding(format!("sync UUID must be 16 bytes, got {}", bytes.len()))
                        })
                    })
                    .collect::<Result<_>>()?;
                Ok(Self::SyncIdSet {
                    cookie,
                    refresh_deletes,
                    uuids,
                })
            }
            other => Err(Error::UnknownTag {
                context: "sync info",
                tag: other,
            }),
        }
    }

    /// Builds the intermediate response carrying this message.
    #[must_use]
    pub fn to_intermediate_response(&self) -> IntermediateResponse {
        let element = match self {
            Self::NewCookie(cookie) => Element::octet_string_tagged(NEW_COOKIE, cookie),
            Self::RefreshDelete {
                cookie,
                refresh_done,
            }
            | Self::RefreshPresent {
                cookie,
                refresh_done,
            } => {
                let mut members: Vec<Element> = cookie.iter().map(Element::octet_string).collect();
                if !refresh_done {
                    members.push(Element::boolean(false));
                }
                let info_tag = if matches!(self, Self::RefreshDelete { .. }) {
                    REFRESH_DELETE
                } else {
                    REFRESH_PRESENT
                };
                Element::sequence_tagged(info_tag, members)
            }
            Self::SyncIdSet {
                cookie,
                refresh_deletes,
                uuids,
            } => {
                let mut members: Vec<Element> = cookie.iter().map(Element::octet_string).collect();
                if *refresh_deletes {
                    members.push(Element::boolean(true));
                }
                members.push(Element::set(uuids.iter().map(Element::octet_string)));
                Element::sequence_tagged(SYNC_ID_SET, members)
            }
        };
        IntermediateResponse {
            oid: Some(SYNC_INFO_OID.to_string()),
            value: Some(element.encode().to_vec()),
        }
    }
}

/// Reads `cookie OCTET STRING OPTIONAL, flag BOOLEAN DEFAULT <default>`.
fn cookie_and_flag(
    members: &[Element],
    context: &'static str,
    default: bool,
) -> Result<(Option<Vec<u8>>, bool)> {
    let mut cookie = None;
    let mut flag = default;
    let mut seen_flag = false;
    for member in members {
        match member.tag() {
            tag::OCTET_STRING if cookie.is_none() && !seen_flag => {
                cookie = Some(member.value().to_vec());
            }
            tag::BOOLEAN if !seen_flag => {
                flag = member.decode_as_boolean()?;
                seen_flag = true;
            }
            other => return Err(Error::UnknownTag { context, tag: other }),
        }
    }
    Ok((cookie, flag))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const UUID: [u8; 16] = [
        0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD,
        0xEF,
    ];

    #[test]
    fn test_request_round_trip() {
        let mut request = SyncRequest::new(SyncRequestMode::RefreshAndPersist, Some(b"c1".to_vec()));
        request.reload_hint = true;
        assert_eq!(SyncRequest::decode_control(&request.to_control()).unwrap(), request);
        let request = SyncRequest::new(SyncRequestMode::RefreshOnly, None);
        assert_eq!(SyncRequest::decode_control(&request.to_control()).unwrap(), request);
    }

    #[test]
    fn test_state_requires_16_byte_uuid() {
        let value = Element::sequence([Element::enumerated(1), Element::octet_string([1u8, 2, 3])]);
        let control = Control::with_element(SyncState::OID, false, &value);
        assert!(matches!(
            SyncState::decode_control(&control),
            Err(Error::Decoding(_))
        ));
        let state = SyncState {
            state: SyncStateKind::Delete,
            entry_uuid: UUID,
            cookie: None,
        };
        assert_eq!(SyncState::decode_control(&state.to_control()).unwrap(), state);
    }

    #[test]
    fn test_done_defaults() {
        let control = Control::with_element(SyncDone::OID, false, &Element::sequence([]));
        let done = SyncDone::decode_control(&control).unwrap();
        assert_eq!(done.cookie, None);
        assert!(!done.refresh_deletes);
    }

    #[test]
    fn test_sync_info_forms() {
        let messages = [
            SyncInfo::NewCookie(b"abc".to_vec()),
            SyncInfo::RefreshDelete {
                cookie: Some(b"x".to_vec()),
                refresh_done: true,
            },
            SyncInfo::RefreshPresent {
                cookie: None,
                refresh_done: false,
            },
            SyncInfo::SyncIdSet {
                cookie: None,
                refresh_deletes: true,
                uuids: vec![UUID, [0; 16]],
            },
        ];
        for message in messages {
            let response = message.to_intermediate_response();
            assert_eq!(SyncInfo::decode(&response).unwrap(), message);
        }
    }

    #[test]
    fn test_sync_info_wrong_oid() {
        let response = IntermediateResponse {
            oid: Some("1.2.3".into()),
            value: Some(vec![0x80, 0x00]),
        };
        assert!(SyncInfo::decode(&response).is_err());
    }
}
