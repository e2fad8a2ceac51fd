//! Error types for the LDAP client.

use thiserror::Error;

use ldapkit_core::ResultCode;
use ldapkit_protocol::OperationType;

/// Errors that can occur while submitting or tracking operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A message could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ldapkit_protocol::Error),

    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation with this message ID is already pending.
    #[error("an operation with message ID {0} is already pending")]
    DuplicateMessageId(i32),

    /// The operation never gets a response, so it cannot be tracked.
    #[error("{0} operations do not receive a response and cannot be registered")]
    NotRegistrable(OperationType),

    /// The connection has shut down.
    #[error("the connection is closed")]
    ConnectionClosed,

    /// An argument was rejected.
    #[error("invalid parameter: {0}")]
    Param(String),
}

impl Error {
    /// Returns the result code that best describes this error.
    #[must_use]
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::Protocol(e) => e.result_code(),
            Self::Io(_) | Self::ConnectionClosed => ResultCode::SERVER_DOWN,
            Self::DuplicateMessageId(_) | Self::NotRegistrable(_) | Self::Param(_) => {
                ResultCode::PARAM_ERROR
            }
        }
    }
}

impl From<ldapkit_asn1::Error> for Error {
    fn from(e: ldapkit_asn1::Error) -> Self {
        Self::Protocol(e.into())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_result_codes() {
        assert_eq!(Error::ConnectionClosed.result_code(), ResultCode::SERVER_DOWN);
        assert_eq!(
            Error::NotRegistrable(OperationType::Abandon).result_code(),
            ResultCode::PARAM_ERROR
        );
        let framing: Error = ldapkit_asn1::Error::UnexpectedEof.into();
        assert_eq!(framing.result_code(), ResultCode::DECODING_ERROR);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::NotRegistrable(OperationType::Unbind).to_string(),
            "UNBIND operations do not receive a response and cannot be registered"
        );
        assert_eq!(
            Error::DuplicateMessageId(4).to_string(),
            "an operation with message ID 4 is already pending"
        );
    }
}
