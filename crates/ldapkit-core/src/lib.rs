//! # ldapkit-core
//!
//! Protocol-independent LDAP value types shared by the codec and the client:
//! result codes, search scopes, and RFC 4514 distinguished names.
//!
//! ## Features
//!
//! - **Distinguished names**: single-pass parser with positional syntax
//!   errors, hex and quoted values, `\XX` escapes, and multi-valued RDNs
//! - **Normalized equality**: DN and RDN equality and hashing use a cached
//!   canonical form, so `CN=Bob,DC=com` equals `cn=bob,dc=com`
//! - **Hierarchical ordering**: sorting DNs keeps each subtree together,
//!   ancestors first
//! - **Result codes**: every RFC 4511 code plus the client-side codes the
//!   correlation layer synthesizes
//! - **Optional serde**: enable the `serde` feature to serialize result
//!   codes, scopes, and DNs
//!
//! ## Quick Start
//!
//! ```ignore
//! use ldapkit_core::{Dn, SearchScope};
//!
//! let base = Dn::parse("ou=People,dc=example,dc=com")?;
//! let entry = Dn::parse("CN=Bob,OU=People,DC=example,DC=com")?;
//! assert!(entry.matches_base_and_scope(&base, SearchScope::ONE)?);
//!
//! let mut dns = vec![entry.clone(), base.clone()];
//! dns.sort();
//! assert_eq!(dns, vec![base, entry]);
//! ```
//!
//! ## Modules
//!
//! - [`dn`]: DN and RDN model
//! - [`schema`]: Attribute aliases and case-exact hints

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod dn;
mod error;
mod result_code;
pub mod schema;
mod scope;

pub use dn::{Dn, Rdn, RdnComponent};
pub use error::{Error, Result};
pub use result_code::ResultCode;
pub use schema::Schema;
pub use scope::SearchScope;
