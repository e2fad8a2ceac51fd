//! Error types for the BER codec.

use thiserror::Error;

/// Errors that can occur while encoding or decoding BER elements.
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer bytes were available than the element declared.
    #[error("truncated element: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to finish the element.
        needed: usize,
        /// Bytes that were actually available.
        available: usize,
    },

    /// The multi-byte length form used more length bytes than allowed.
    #[error("length encoding too large: {0} bytes (max 4)")]
    LengthTooLarge(usize),

    /// Indefinite-length encoding is not permitted.
    #[error("indefinite length encoding is not supported")]
    IndefiniteLength,

    /// The declared element length exceeds the configured maximum.
    #[error("element length {length} exceeds the maximum allowed size of {max} bytes")]
    ElementTooLarge {
        /// Declared length.
        length: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The element's tag does not match the requested interpretation.
    #[error("cannot decode element with type 0x{actual:02X} as {kind} (expected type 0x{expected:02X})")]
    TypeMismatch {
        /// Tag the caller expected.
        expected: u8,
        /// Tag that was actually present.
        actual: u8,
        /// Name of the requested interpretation.
        kind: &'static str,
    },

    /// The element's content is not valid for the requested interpretation.
    #[error("invalid {kind} value: {message}")]
    InvalidValue {
        /// Name of the requested interpretation.
        kind: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// Bytes remained after a complete element was decoded.
    #[error("{count} unexpected trailing bytes after the element")]
    TrailingData {
        /// Number of leftover bytes.
        count: usize,
    },

    /// A stream reader moved past the declared end of an open sequence.
    #[error("read past the end of a sequence (length {length}, end {end}, position {position})")]
    ReadPastSequenceEnd {
        /// Declared sequence length.
        length: usize,
        /// Stream offset at which the sequence ends.
        end: u64,
        /// Current stream offset.
        position: u64,
    },

    /// The input ended in the middle of an element.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// I/O error from the underlying reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the stream position can no longer be trusted.
    ///
    /// After a framing error no further elements should be read from the
    /// same stream.
    #[must_use]
    pub const fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::ReadPastSequenceEnd { .. } | Self::UnexpectedEof | Self::Io(_)
        )
    }

    pub(crate) fn invalid(kind: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind,
            message: message.into(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
