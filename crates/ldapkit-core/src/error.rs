//! Error types for the core LDAP model.

use thiserror::Error;

use crate::ResultCode;

/// Errors raised while building or parsing core LDAP values.
#[derive(Debug, Error)]
pub enum Error {
    /// A DN or RDN string does not follow the RFC 4514 grammar.
    #[error("invalid DN '{value}': {message} at position {position}")]
    InvalidDnSyntax {
        /// The text being parsed.
        value: String,
        /// Byte offset of the offending character.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// The caller passed a structurally invalid argument.
    #[error("invalid parameter: {0}")]
    Param(String),

    /// A BER-encoded value could not be decoded.
    #[error(transparent)]
    Asn1(#[from] ldapkit_asn1::Error),
}

impl Error {
    /// Returns the result code that best describes this error.
    #[must_use]
    pub const fn result_code(&self) -> ResultCode {
        match self {
            Self::InvalidDnSyntax { .. } => ResultCode::INVALID_DN_SYNTAX,
            Self::Param(_) => ResultCode::PARAM_ERROR,
            Self::Asn1(_) => ResultCode::DECODING_ERROR,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
