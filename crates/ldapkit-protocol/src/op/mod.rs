//! Protocol ops: the operation-specific payload of an LDAP message.
//!
//! [`ProtocolOp`] has one variant per operation. Each payload type encodes
//! to and decodes from a single BER element whose tag identifies the op.

mod bind;
mod extended;
mod response;
mod search;
mod update;

use std::fmt;

use ldapkit_asn1::Element;

pub use bind::{BindCredentials, BindRequest, BindResponse};
pub use extended::{
    ExtendedRequest, ExtendedResponse, IntermediateResponse, NOTICE_OF_DISCONNECTION_OID,
    START_TLS_OID, WHO_AM_I_OID,
};
pub use response::{LdapResponse, REFERRALS_TAG};
pub use search::{DerefPolicy, SearchRequest, SearchResultEntry, SearchResultReference};
pub use update::{
    AbandonRequest, AddRequest, CompareRequest, DeleteRequest, ModifyDnRequest, ModifyRequest,
};

use crate::{Error, Result};

/// Application tags of each protocol op.
pub mod tags {
    /// BindRequest.
    pub const BIND_REQUEST: u8 = 0x60;
    /// BindResponse.
    pub const BIND_RESPONSE: u8 = 0x61;
    /// UnbindRequest (primitive NULL).
    pub const UNBIND_REQUEST: u8 = 0x42;
    /// SearchRequest.
    pub const SEARCH_REQUEST: u8 = 0x63;
    /// SearchResultEntry.
    pub const SEARCH_RESULT_ENTRY: u8 = 0x64;
    /// SearchResultDone.
    pub const SEARCH_RESULT_DONE: u8 = 0x65;
    /// SearchResultReference.
    pub const SEARCH_RESULT_REFERENCE: u8 = 0x73;
    /// ModifyRequest.
    pub const MODIFY_REQUEST: u8 = 0x66;
    /// ModifyResponse.
    pub const MODIFY_RESPONSE: u8 = 0x67;
    /// AddRequest.
    pub const ADD_REQUEST: u8 = 0x68;
    /// AddResponse.
    pub const ADD_RESPONSE: u8 = 0x69;
    /// DelRequest (primitive OCTET STRING).
    pub const DELETE_REQUEST: u8 = 0x4A;
    /// DelResponse.
    pub const DELETE_RESPONSE: u8 = 0x6B;
    /// ModifyDNRequest.
    pub const MODIFY_DN_REQUEST: u8 = 0x6C;
    /// ModifyDNResponse.
    pub const MODIFY_DN_RESPONSE: u8 = 0x6D;
    /// CompareRequest.
    pub const COMPARE_REQUEST: u8 = 0x6E;
    /// CompareResponse.
    pub const COMPARE_RESPONSE: u8 = 0x6F;
    /// AbandonRequest (primitive INTEGER).
    pub const ABANDON_REQUEST: u8 = 0x50;
    /// ExtendedRequest.
    pub const EXTENDED_REQUEST: u8 = 0x77;
    /// ExtendedResponse.
    pub const EXTENDED_RESPONSE: u8 = 0x78;
    /// IntermediateResponse.
    pub const INTERMEDIATE_RESPONSE: u8 = 0x79;
}

/// The kind of operation a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationType {
    /// Abandon.
    Abandon,
    /// Add.
    Add,
    /// Bind.
    Bind,
    /// Compare.
    Compare,
    /// Delete.
    Delete,
    /// Extended.
    Extended,
    /// Modify.
    Modify,
    /// Modify DN.
    ModifyDn,
    /// Search.
    Search,
    /// Unbind.
    Unbind,
}

impl OperationType {
    /// Every operation type.
    pub const ALL: [Self; 10] = [
        Self::Abandon,
        Self::Add,
        Self::Bind,
        Self::Compare,
        Self::Delete,
        Self::Extended,
        Self::Modify,
        Self::ModifyDn,
        Self::Search,
        Self::Unbind,
    ];

    /// Returns true if the server sends a response to this operation.
    #[must_use]
    pub const fn expects_response(self) -> bool {
        !matches!(self, Self::Abandon | Self::Unbind)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abandon => "ABANDON",
            Self::Add => "ADD",
            Self::Bind => "BIND",
            Self::Compare => "COMPARE",
            Self::Delete => "DELETE",
            Self::Extended => "EXTENDED",
            Self::Modify => "MODIFY",
            Self::ModifyDn => "MODIFY_DN",
            Self::Search => "SEARCH",
            Self::Unbind => "UNBIND",
        })
    }
}

/// The payload of an LDAP message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtocolOp {
    /// Authenticate.
    BindRequest(BindRequest),
    /// Result of a bind.
    BindResponse(BindResponse),
    /// Close the connection.
    UnbindRequest,
    /// Search a subtree.
    SearchRequest(SearchRequest),
    /// One matching entry.
    SearchResultEntry(SearchResultEntry),
    /// A continuation reference.
    SearchResultReference(SearchResultReference),
    /// End of a search.
    SearchResultDone(LdapResponse),
    /// Change an entry.
    ModifyRequest(ModifyRequest),
    /// Result of a modify.
    ModifyResponse(LdapResponse),
    /// Create an entry.
    AddRequest(AddRequest),
    /// Result of an add.
    AddResponse(LdapResponse),
    /// Remove an entry.
    DeleteRequest(DeleteRequest),
    /// Result of a delete.
    DeleteResponse(LdapResponse),
    /// Rename or move an entry.
    ModifyDnRequest(ModifyDnRequest),
    /// Result of a modify DN.
    ModifyDnResponse(LdapResponse),
    /// Test an attribute value.
    CompareRequest(CompareRequest),
    /// Result of a compare.
    CompareResponse(LdapResponse),
    /// Stop an outstanding operation.
    AbandonRequest(AbandonRequest),
    /// Extended operation.
    ExtendedRequest(ExtendedRequest),
    /// Result of an extended operation.
    ExtendedResponse(ExtendedResponse),
    /// Non-final response to an extended or search operation.
    IntermediateResponse(IntermediateResponse),
}

impl ProtocolOp {
    /// Returns the BER tag of this op.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::BindRequest(_) => tags::BIND_REQUEST,
            Self::BindResponse(_) => tags::BIND_RESPONSE,
            Self::UnbindRequest => tags::UNBIND_REQUEST,
            Self::SearchRequest(_) => tags::SEARCH_REQUEST,
            Self::SearchResultEntry(_) => tags::SEARCH_RESULT_ENTRY,
            Self::SearchResultReference(_) => tags::SEARCH_RESULT_REFERENCE,
            Self::SearchResultDone(_) => tags::SEARCH_RESULT_DONE,
            Self::ModifyRequest(_) => tags::MODIFY_REQUEST,
            Self::ModifyResponse(_) => tags::MODIFY_RESPONSE,
            Self::AddRequest(_) => tags::ADD_REQUEST,
            Self::AddResponse(_) => tags::ADD_RESPONSE,
            Self::DeleteRequest(_) => tags::DELETE_REQUEST,
            Self::DeleteResponse(_) => tags::DELETE_RESPONSE,
            Self::ModifyDnRequest(_) => tags::MODIFY_DN_REQUEST,
            Self::ModifyDnResponse(_) => tags::MODIFY_DN_RESPONSE,
            Self::CompareRequest(_) => tags::COMPARE_REQUEST,
            Self::CompareResponse(_) => tags::COMPARE_RESPONSE,
            Self::AbandonRequest(_) => tags::ABANDON_REQUEST,
            Self::ExtendedRequest(_) => tags::EXTENDED_REQUEST,
            Self::ExtendedResponse(_) => tags::EXTENDED_RESPONSE,
            Self::IntermediateResponse(_) => tags::INTERMEDIATE_RESPONSE,
        }
    }

    /// Returns the operation this op starts or answers.
    ///
    /// Intermediate responses can belong to several kinds of operation and
    /// return `None`.
    #[must_use]
    pub const fn operation_type(&self) -> Option<OperationType> {
        Some(match self {
            Self::BindRequest(_) | Self::BindResponse(_) => OperationType::Bind,
            Self::UnbindRequest => OperationType::Unbind,
            Self::SearchRequest(_)
            | Self::SearchResultEntry(_)
            | Self::SearchResultReference(_)
            | Self::SearchResultDone(_) => OperationType::Search,
            Self::ModifyRequest(_) | Self::ModifyResponse(_) => OperationType::Modify,
            Self::AddRequest(_) | Self::AddResponse(_) => OperationType::Add,
            Self::DeleteRequest(_) | Self::DeleteResponse(_) => OperationType::Delete,
            Self::ModifyDnRequest(_) | Self::ModifyDnResponse(_) => OperationType::ModifyDn,
            Self::CompareRequest(_) | Self::CompareResponse(_) => OperationType::Compare,
            Self::AbandonRequest(_) => OperationType::Abandon,
            Self::ExtendedRequest(_) | Self::ExtendedResponse(_) => OperationType::Extended,
            Self::IntermediateResponse(_) => return None,
        })
    }

    /// Returns the RFC 4511 name of the op.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BindRequest(_) => "BindRequest",
            Self::BindResponse(_) => "BindResponse",
            Self::UnbindRequest => "UnbindRequest",
            Self::SearchRequest(_) => "SearchRequest",
            Self::SearchResultEntry(_) => "SearchResultEntry",
            Self::SearchResultReference(_) => "SearchResultReference",
            Self::SearchResultDone(_) => "SearchResultDone",
            Self::ModifyRequest(_) => "ModifyRequest",
            Self::ModifyResponse(_) => "ModifyResponse",
            Self::AddRequest(_) => "AddRequest",
            Self::AddResponse(_) => "AddResponse",
            Self::DeleteRequest(_) => "DelRequest",
            Self::DeleteResponse(_) => "DelResponse",
            Self::ModifyDnRequest(_) => "ModifyDNRequest",
            Self::ModifyDnResponse(_) => "ModifyDNResponse",
            Self::CompareRequest(_) => "CompareRequest",
            Self::CompareResponse(_) => "CompareResponse",
            Self::AbandonRequest(_) => "AbandonRequest",
            Self::ExtendedRequest(_) => "ExtendedRequest",
            Self::ExtendedResponse(_) => "ExtendedResponse",
            Self::IntermediateResponse(_) => "IntermediateResponse",
        }
    }

    /// Returns the result fields if this op is a final response.
    #[must_use]
    pub const fn response(&self) -> Option<&LdapResponse> {
        match self {
            Self::BindResponse(BindResponse { response, .. })
            | Self::ExtendedResponse(ExtendedResponse { response, .. })
            | Self::SearchResultDone(response)
            | Self::ModifyResponse(response)
            | Self::AddResponse(response)
            | Self::DeleteResponse(response)
            | Self::ModifyDnResponse(response)
            | Self::CompareResponse(response) => Some(response),
            _ => None,
        }
    }

    /// Returns true if this op ends the operation it answers.
    #[must_use]
    pub const fn is_final_response(&self) -> bool {
        self.response().is_some()
    }

    /// Returns true if a client sends this op.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(
            self,
            Self::BindRequest(_)
                | Self::UnbindRequest
                | Self::SearchRequest(_)
                | Self::ModifyRequest(_)
                | Self::AddRequest(_)
                | Self::DeleteRequest(_)
                | Self::ModifyDnRequest(_)
                | Self::CompareRequest(_)
                | Self::AbandonRequest(_)
                | Self::ExtendedRequest(_)
        )
    }

    /// Encodes the op as a single element.
    #[must_use]
    pub fn encode(&self) -> Element {
        match self {
            Self::BindRequest(op) => op.encode(),
            Self::BindResponse(op) => op.encode(),
            Self::UnbindRequest => Element::null_tagged(tags::UNBIND_REQUEST),
            Self::SearchRequest(op) => op.encode(),
            Self::SearchResultEntry(op) => op.encode(),
            Self::SearchResultReference(op) => op.encode(),
            Self::SearchResultDone(r) => r.encode(tags::SEARCH_RESULT_DONE),
            Self::ModifyRequest(op) => op.encode(),
            Self::ModifyResponse(r) => r.encode(tags::MODIFY_RESPONSE),
            Self::AddRequest(op) => op.encode(),
            Self::AddResponse(r) => r.encode(tags::ADD_RESPONSE),
            Self::DeleteRequest(op) => op.encode(),
            Self::DeleteResponse(r) => r.encode(tags::DELETE_RESPONSE),
            Self::ModifyDnRequest(op) => op.encode(),
            Self::ModifyDnResponse(r) => r.encode(tags::MODIFY_DN_RESPONSE),
            Self::CompareRequest(op) => op.encode(),
            Self::CompareResponse(r) => r.encode(tags::COMPARE_RESPONSE),
            Self::AbandonRequest(op) => op.encode(),
            Self::ExtendedRequest(op) => op.encode(),
            Self::ExtendedResponse(op) => op.encode(),
            Self::IntermediateResponse(op) => op.encode(),
        }
    }

    /// Decodes an op, choosing the variant by tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTag`] for a tag that names no op, or the
    /// variant's own decode error.
    pub fn decode(element: &Element) -> Result<Self> {
        let op_tag = element.tag();
        Ok(match op_tag {
            tags::BIND_REQUEST => Self::BindRequest(BindRequest::decode(element)?),
            tags::BIND_RESPONSE => Self::BindResponse(BindResponse::decode(element)?),
            tags::UNBIND_REQUEST => {
                element.decode_as_null_tagged(tags::UNBIND_REQUEST)?;
                Self::UnbindRequest
            }
            tags::SEARCH_REQUEST => Self::SearchRequest(SearchRequest::decode(element)?),
            tags::SEARCH_RESULT_ENTRY => {
                Self::SearchResultEntry(SearchResultEntry::decode(element)?)
            }
            tags::SEARCH_RESULT_REFERENCE => {
                Self::SearchResultReference(SearchResultReference::decode(element)?)
            }
            tags::SEARCH_RESULT_DONE => {
                Self::SearchResultDone(LdapResponse::decode(element, op_tag)?)
            }
            tags::MODIFY_REQUEST => Self::ModifyRequest(ModifyRequest::decode(element)?),
            tags::MODIFY_RESPONSE => Self::ModifyResponse(LdapResponse::decode(element, op_tag)?),
            tags::ADD_REQUEST => Self::AddRequest(AddRequest::decode(element)?),
            tags::ADD_RESPONSE => Self::AddResponse(LdapResponse::decode(element, op_tag)?),
            tags::DELETE_REQUEST => Self::DeleteRequest(DeleteRequest::decode(element)?),
            tags::DELETE_RESPONSE => Self::DeleteResponse(LdapResponse::decode(element, op_tag)?),
            tags::MODIFY_DN_REQUEST => Self::ModifyDnRequest(ModifyDnRequest::decode(element)?),
            tags::MODIFY_DN_RESPONSE => {
                Self::ModifyDnResponse(LdapResponse::decode(element, op_tag)?)
            }
            tags::COMPARE_REQUEST => Self::CompareRequest(CompareRequest::decode(element)?),
            tags::COMPARE_RESPONSE => {
                Self::CompareResponse(LdapResponse::decode(element, op_tag)?)
            }
            tags::ABANDON_REQUEST => Self::AbandonRequest(AbandonRequest::decode(element)?),
            tags::EXTENDED_REQUEST => Self::ExtendedRequest(ExtendedRequest::decode(element)?),
            tags::EXTENDED_RESPONSE => Self::ExtendedResponse(ExtendedResponse::decode(element)?),
            tags::INTERMEDIATE_RESPONSE => {
                Self::IntermediateResponse(IntermediateResponse::decode(element)?)
            }
            other => {
                return Err(Error::UnknownTag {
                    context: "protocol op",
                    tag: other,
                });
            }
        })
    }
}

impl fmt::Display for ProtocolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        if let Some(response) = self.response() {
            write!(f, "(resultCode={})", response.result_code)?;
        }
        Ok(())
    }
}

macro_rules! from_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for ProtocolOp {
                fn from(op: $variant) -> Self {
                    Self::$variant(op)
                }
            }
        )*
    };
}

from_payload!(
    BindRequest,
    BindResponse,
    SearchRequest,
    SearchResultEntry,
    SearchResultReference,
    ModifyRequest,
    AddRequest,
    DeleteRequest,
    ModifyDnRequest,
    CompareRequest,
    AbandonRequest,
    ExtendedRequest,
    ExtendedResponse,
    IntermediateResponse,
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ldapkit_core::ResultCode;

    #[test]
    fn test_unbind_wire_form() {
        let element = ProtocolOp::UnbindRequest.encode();
        assert_eq!(element.encode().as_ref(), &[0x42, 0x00]);
        assert_eq!(ProtocolOp::decode(&element).unwrap(), ProtocolOp::UnbindRequest);
    }

    #[test]
    fn test_response_variants_keep_their_tag() {
        let done = ProtocolOp::CompareResponse(LdapResponse::new(ResultCode::COMPARE_TRUE));
        let element = done.encode();
        assert_eq!(element.tag(), 0x6F);
        assert_eq!(ProtocolOp::decode(&element).unwrap(), done);
        assert_eq!(done.operation_type(), Some(OperationType::Compare));
        assert!(done.is_final_response());
        assert_eq!(done.to_string(), "CompareResponse(resultCode=6 (compareTrue))");
    }

    #[test]
    fn test_unknown_op_tag() {
        let element = Element::sequence_tagged(0x7F, []);
        assert!(matches!(
            ProtocolOp::decode(&element),
            Err(Error::UnknownTag { tag: 0x7F, .. })
        ));
    }

    #[test]
    fn test_entry_is_not_final() {
        let op = ProtocolOp::from(SearchResultEntry::new("cn=a", vec![]));
        assert!(!op.is_final_response());
        assert!(!op.is_request());
        assert!(ProtocolOp::UnbindRequest.is_request());
        assert_eq!(op.name(), "SearchResultEntry");
        assert_eq!(
            ProtocolOp::from(IntermediateResponse {
                oid: None,
                value: None
            })
            .operation_type(),
            None
        );
    }

    #[test]
    fn test_operation_type_display() {
        assert_eq!(OperationType::ModifyDn.to_string(), "MODIFY_DN");
        assert!(!OperationType::Abandon.expects_response());
        assert!(OperationType::Search.expects_response());
    }
}
