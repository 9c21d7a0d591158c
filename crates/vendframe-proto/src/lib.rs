//! Wire protocol layer for the supported vending controller families.
//!
//! Three controller families (A, B, Z) speak different binary framings over
//! a byte-stream transport. This crate is the pure protocol layer: building
//! outbound command frames, recognizing and validating inbound reply frames
//! inside an arbitrary byte stream, and declaring which correlation key a
//! validated reply belongs to.
//!
//! There is no I/O here. The reassembler in [`scan`] works on a caller-owned
//! rolling buffer, and routing decisions are returned as data ([`Route`]) for
//! the correlation engine to execute.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod family_a;
pub mod family_b;
pub mod family_z;
pub mod route;
pub mod scan;

pub use error::{ProtocolError, Result};
pub use route::{Disposition, Route};
pub use scan::{Grammar, scan};
