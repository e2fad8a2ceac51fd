//! # ldapkit-protocol
//!
//! LDAP v3 (RFC 4511) messages on top of the `ldapkit-asn1` BER codec:
//! the message envelope, every protocol op, search filters, controls, and
//! the result types a completed operation produces.
//!
//! ## Features
//!
//! - **Message envelope**: [`LdapMessage`] encodes through a buffer writer
//!   and decodes either from a byte slice or incrementally from a stream
//! - **Protocol ops**: [`ProtocolOp`] covers bind, search, modify, add,
//!   delete, modify DN, compare, abandon, extended and intermediate messages
//! - **Filters**: RFC 4515 string parsing with positional errors and
//!   canonical string output
//! - **Controls**: a registry of typed controls keyed by OID, with a raw
//!   fallback for anything unknown
//! - **Results**: [`LdapResult`] and its search, compare, extended and bind
//!   refinements
//!
//! ## Quick Start
//!
//! ```ignore
//! use ldapkit_core::SearchScope;
//! use ldapkit_protocol::control::{DecodableControl, SimplePagedResults};
//! use ldapkit_protocol::{Filter, LdapMessage, SearchRequest};
//!
//! let filter = Filter::parse("(&(objectClass=person)(mail=*))")?;
//! let search = SearchRequest::new("dc=example,dc=com", SearchScope::SUB, filter)
//!     .with_attributes(["cn", "mail"]);
//! let message = LdapMessage::new(1, search)
//!     .with_controls(vec![SimplePagedResults::new(500).to_control()]);
//! let bytes = message.encode();
//!
//! let echoed = LdapMessage::decode(&bytes)?;
//! assert_eq!(echoed, message);
//! ```
//!
//! ## Modules
//!
//! - [`control`]: Request and response controls
//! - [`filter`]: Search filters
//! - [`op`]: Protocol op payloads

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attribute;
pub mod control;
mod error;
pub mod filter;
mod message;
pub mod op;
mod result;

pub use attribute::{Attribute, Modification, ModificationType};
pub use control::{AnyControl, Control, DecodableControl};
pub use error::{Error, Result};
pub use filter::Filter;
pub use message::LdapMessage;
pub use op::{
    BindRequest, DeleteRequest, ExtendedRequest, LdapResponse, ModifyRequest, OperationType,
    ProtocolOp, SearchRequest, SearchResultEntry, SearchResultReference,
};
pub use result::{
    BindResult, CompareResult, ExtendedResult, LdapResult, OperationResult, SearchResult,
};
