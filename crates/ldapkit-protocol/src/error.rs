//! Error types for LDAP message decoding.

use thiserror::Error;

use ldapkit_core::ResultCode;

/// Errors that can occur while encoding or decoding LDAP messages.
#[derive(Debug, Error)]
pub enum Error {
    /// The data is well-formed BER but not a valid LDAP structure.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// A sequence had too few or too many members.
    #[error("invalid number of elements in {context} (expected {min} to {max}, got {actual})")]
    ElementCount {
        /// What was being decoded.
        context: &'static str,
        /// Minimum number of members.
        min: usize,
        /// Maximum number of members.
        max: usize,
        /// Number of members found.
        actual: usize,
    },

    /// An element had a type that is not allowed at its position.
    #[error("invalid element type 0x{tag:02X} in {context}")]
    UnknownTag {
        /// What was being decoded.
        context: &'static str,
        /// The unexpected tag.
        tag: u8,
    },

    /// A search filter string could not be parsed.
    #[error("invalid filter '{filter}': {message} at position {position}")]
    InvalidFilter {
        /// The filter text.
        filter: String,
        /// Byte offset of the problem.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// A control that requires a value arrived without one.
    #[error("control {oid} has no value")]
    MissingValue {
        /// OID of the control.
        oid: String,
    },

    /// Decoding failed after the message ID had been read.
    #[error("message {message_id}: {source}")]
    Message {
        /// ID of the message that failed.
        message_id: i32,
        /// The underlying failure.
        source: Box<Error>,
    },

    /// BER-level failure.
    #[error(transparent)]
    Asn1(#[from] ldapkit_asn1::Error),

    /// DN or parameter failure.
    #[error(transparent)]
    Core(#[from] ldapkit_core::Error),
}

impl Error {
    /// Returns the result code that best describes this error.
    #[must_use]
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::InvalidFilter { .. } => ResultCode::FILTER_ERROR,
            Self::Core(e) => e.result_code(),
            Self::Message { source, .. } => source.result_code(),
            _ => ResultCode::DECODING_ERROR,
        }
    }

    /// Returns the ID of the message that failed, if it was decoded.
    #[must_use]
    pub const fn message_id(&self) -> Option<i32> {
        match self {
            Self::Message { message_id, .. } => Some(*message_id),
            _ => None,
        }
    }

    /// Returns true if the input stream can no longer be trusted.
    #[must_use]
    pub fn is_framing(&self) -> bool {
        match self {
            Self::Asn1(e) => e.is_framing(),
            Self::Message { source, .. } => source.is_framing(),
            _ => false,
        }
    }

    pub(crate) fn with_message_id(self, message_id: i32) -> Self {
        match self {
            Self::Message { .. } => self,
            other => Self::Message {
                message_id,
                source: Box::new(other),
            },
        }
    }
}

/// Fails unless `actual` lies within `min..=max`.
pub(crate) const fn check_count(
    context: &'static str,
    actual: usize,
    min: usize,
    max: usize,
) -> Result<()> {
    if actual < min || actual > max {
        return Err(Error::ElementCount {
            context,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
