//! Fuzz target for the stream reassembler.
//!
//! Feeds arbitrary bytes through every family grammar, whole and split at a
//! chunk boundary, and checks:
//! - The scanner never panics, whatever the input.
//! - Every emitted frame passes the family's validation predicate.
//! - The frame sequence does not depend on how the stream was chunked.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use vendframe_proto::{Grammar, family_a, family_b, family_z, scan};

fn check<G: Grammar>(data: &[u8]) {
    let mut buf = BytesMut::from(data);
    let whole = scan::<G>(&mut buf);

    for frame in &whole {
        assert!(G::validate(frame), "scanner emitted an invalid frame");
        // Routing must never panic either, whatever the frame contents.
        let _ = G::route(frame);
    }

    // Re-feed the same stream split at the midpoint: the frame sequence
    // must be identical.
    let mid = data.len() / 2;
    let mut buf = BytesMut::from(&data[..mid]);
    let mut chunked = scan::<G>(&mut buf);
    buf.extend_from_slice(&data[mid..]);
    chunked.extend(scan::<G>(&mut buf));

    assert_eq!(whole, chunked, "frame sequence depends on chunking");
}

fuzz_target!(|data: &[u8]| {
    check::<family_a::Wire>(data);
    check::<family_b::Wire>(data);
    check::<family_z::Wire>(data);
});
