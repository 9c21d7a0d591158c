//! Fuzz target for reply decoding.
//!
//! The decoders run on frames the reassembler validated, but they must not
//! panic on arbitrary bytes either: a too-short frame is an error (or an
//! unknown status), never an out-of-bounds access.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vendframe_proto::{family_b, family_z};

fuzz_target!(|data: &[u8]| {
    let _ = family_z::CellReply::parse(data);
    let _ = family_z::CabinetStatus::parse(data);

    let status = family_b::LifterStatus::parse(data);
    let _ = status.is_ok();
    let _ = status.code();
});
