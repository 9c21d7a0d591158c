//! Caller-visible error types.

use thiserror::Error;

/// Errors surfaced by adapter operations.
///
/// None of these are fatal to the adapter; the caller may try again once the
/// condition clears. Malformed inbound frames never surface here — the
/// reassembler drops them and the caller's timeout is the backstop.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The operation produced an empty frame; nothing was written.
    #[error("no content")]
    NoContent,

    /// The client id is not registered.
    #[error("no such client")]
    NoSuchClient,

    /// The correlation key is already in flight for this client.
    #[error("already processing")]
    Processing,

    /// No reply arrived within the deadline.
    #[error("timeout")]
    Timeout,

    /// The transport write failed; surfaced unchanged, no retry.
    #[error("transport write failed: {0}")]
    Write(#[from] std::io::Error),

    /// Frame construction or reply decoding failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] vendframe_proto::ProtocolError),
}

impl AdapterError {
    /// Whether the condition clears on its own (busy key, slow device) as
    /// opposed to requiring operator attention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Processing | Self::Timeout)
    }
}
