//! Request/reply correlation engine for vending controller transports.
//!
//! Each physical controller is reached through a byte-stream transport and
//! represented by a [`Client`] handle. Outbound commands are written whole;
//! inbound bytes are reassembled into validated frames and routed to the
//! caller waiting under the matching correlation key.
//!
//! The moving parts:
//!
//! - [`ReplySlots`]: the per-client rendezvous table. A key is present while
//!   exactly one command is in flight under it; a second caller is rejected
//!   immediately rather than queued.
//! - [`ClientRegistry`]: process-wide map from client id to handle.
//! - [`exchange`]: the shared call engine — register the key, write the
//!   frame, await replies with a normalized timeout, retire the key on every
//!   exit path.
//! - [`ingest`]: the reader-side dispatcher driven once per received chunk.
//!
//! There is no command queue and no retry: a busy key fails synchronously,
//! a timed-out reply that arrives later finds no slot and is dropped.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatch;
pub mod env;
pub mod error;
pub mod exchange;
pub mod registry;
pub mod slots;
pub mod timeout;

pub use dispatch::ingest;
pub use env::{Environment, SystemEnv};
pub use error::AdapterError;
pub use exchange::{Call, exchange};
pub use registry::{Client, ClientRegistry};
pub use slots::{ReplySlots, SlotGuard};
pub use timeout::{DEFAULT_TIMEOUT_MS, MIN_TIMEOUT_MS, SHIP_TIMEOUT_MS, normalize};

/// Space-separated upper-case hex rendering for wire logging.
pub(crate) fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}
