//! Operation surfaces for the supported vending controller families.
//!
//! Each adapter is a thin façade over the correlation engine: encode the
//! command, compute the correlation key, register it, write the frame, await
//! the reply, decode it into the operation's typed reply record. Argument
//! and reply records carry serde derives matching the upstream JSON field
//! names; binary reply fields serialize as upper-case hex ([`Hex`]) or as an
//! integer array ([`ByteArray`]).
//!
//! Adapters are generic over the [`vendframe_core::Environment`] so tests
//! can pin the wall clock that feeds frame tags and reply timestamps.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod family_a;
pub mod family_b;
pub mod family_z;
pub mod lifter;
pub mod wire_json;

pub use family_a::FamilyA;
pub use family_b::FamilyB;
pub use family_z::FamilyZ;
pub use lifter::Lifter;
pub use wire_json::{ByteArray, Hex};
