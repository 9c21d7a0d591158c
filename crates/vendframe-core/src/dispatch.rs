//! Reader-side dispatch: reassemble a chunk, deliver what parses.
//!
//! Each client has one reader task that owns the rolling buffer and calls
//! [`ingest`] once per received chunk. Validated frames are routed to the
//! correlation tables passed in — normally just the owning client's, but a
//! serial line shared by several logical clients passes all of them and a
//! broadcast-style reply (family Z status) reaches each one.
//!
//! Delivery that finds no slot is a logged no-op: the caller either timed
//! out (its slot is gone) or never existed (unsolicited frame). Nothing here
//! can fail the reader.

use bytes::BytesMut;
use vendframe_proto::{Disposition, Grammar, scan};

use crate::{hex_dump, slots::ReplySlots};

/// Append `chunk` to the client's rolling buffer and dispatch every complete
/// frame it now contains. The residual stays in `buf` for the next chunk.
pub fn ingest<G: Grammar>(buf: &mut BytesMut, chunk: &[u8], channels: &[&ReplySlots]) {
    buf.extend_from_slice(chunk);

    for frame in scan::<G>(buf) {
        tracing::debug!(frame = %hex_dump(&frame), "reply frame received");

        let Some(route) = G::route(&frame) else {
            tracing::debug!(frame = %hex_dump(&frame), "frame has no route, dropped");
            continue;
        };

        for slots in channels {
            let delivered = match route.disposition {
                Disposition::Retain => slots.deliver(&route.key, frame.clone()),
                Disposition::Consume => slots.consume(&route.key, frame.clone()),
            };
            let delivered = delivered
                || route
                    .fallback
                    .is_some_and(|fallback| slots.deliver(fallback, frame.clone()));
            if !delivered {
                tracing::trace!(key = %route.key, "no waiter for reply, dropped");
            }
        }
    }
}
