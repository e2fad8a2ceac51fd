//! # ldapkit-asn1
//!
//! The ASN.1 Basic Encoding Rules subset that LDAP (RFC 4511) puts on the
//! wire: single-byte tags, definite lengths, and the primitive and
//! constructed types a directory client needs.
//!
//! ## Features
//!
//! - **Immutable elements**: [`Element`] owns a tag and its content bytes
//!   and encodes itself on demand
//! - **Typed views**: `decode_as_*` methods narrow a generic element to a
//!   sequence, octet string, integer, enumerated, boolean, or null, with a
//!   `_tagged` form for context-specific tags
//! - **Stream decoding**: [`StreamReader`] reads one element at a time and
//!   tracks consumed bytes so [`SequenceCursor`] can detect framing overruns
//! - **Buffer encoding**: [`Writer`] writes nested sequences in place and
//!   patches lengths as scopes close
//!
//! ## Quick Start
//!
//! ```ignore
//! use ldapkit_asn1::{Element, StreamReader, Writer, tag};
//!
//! let mut w = Writer::new();
//! w.sequence(tag::SEQUENCE, |w| {
//!     w.add_integer(1);
//!     w.add_octet_string("dc=example,dc=com");
//! });
//! let bytes = w.freeze();
//!
//! let mut r = StreamReader::new(std::io::Cursor::new(bytes));
//! let seq = r.begin_sequence()?;
//! while seq.has_more_elements(&r)? {
//!     let element = r.read_element()?;
//!     println!("{element:?}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`length`]: Definite-length codec
//! - [`tag`]: Tag classes and universal tag numbers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod element;
mod error;
pub mod length;
mod reader;
pub mod tag;
mod writer;

pub use element::Element;
pub use error::{Error, Result};
pub use reader::{DEFAULT_MAX_ELEMENT_SIZE, SequenceCursor, StreamReader};
pub use writer::{SequenceScope, Writer};
