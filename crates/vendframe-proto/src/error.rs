//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while building a command frame.
///
/// Reply-side problems never surface as errors: a byte sequence that fails
/// validation is simply not a frame, and the reassembler resynchronizes past
/// it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload does not fit the family's one-byte length field.
    #[error("payload too large: frame would be {size} bytes, limit is {max}")]
    PayloadTooLarge {
        /// Total frame size the payload would produce.
        size: usize,
        /// Largest encodable frame size for this family.
        max: usize,
    },

    /// A validated reply is too short for the fields being decoded.
    #[error("reply too short: expected at least {expected} bytes, got {actual}")]
    ReplyTooShort {
        /// Minimum length the decoder needs.
        expected: usize,
        /// Actual frame length.
        actual: usize,
    },
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
