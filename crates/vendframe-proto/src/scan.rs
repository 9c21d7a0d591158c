//! Stream reassembly: carving validated frames out of a rolling byte buffer.
//!
//! Transports deliver arbitrary chunks: a reply may arrive split across
//! reads, preceded by line noise, or back-to-back with the next reply. Each
//! family describes its framing through the [`Grammar`] trait and the one
//! [`scan`] loop does the rest.
//!
//! Resynchronization policy: an invalid candidate advances the cursor by a
//! single byte, never by the claimed frame size, so a misaligned start byte
//! cannot swallow legitimate trailing data. Once a frame is emitted, bytes up
//! to the next plausible start are discarded as garbage; if no such byte
//! remains the buffer is cleared outright.

use bytes::{Bytes, BytesMut};

use crate::route::Route;

/// Per-family framing description consumed by [`scan`].
///
/// Implementations are zero-sized marker types; all methods are pure
/// functions of the buffer contents.
pub trait Grammar {
    /// Smallest complete frame this family can produce.
    ///
    /// The scanner never examines a window shorter than this, which also
    /// guarantees the header bytes consulted by [`Grammar::frame_len`] are
    /// present.
    const MIN_FRAME: usize;

    /// Whether `buf[at..]` begins with a plausible frame start.
    ///
    /// Called only when at least [`Self::MIN_FRAME`] bytes follow `at`.
    fn is_start(buf: &[u8], at: usize) -> bool;

    /// Total frame length claimed by the header at `at`.
    ///
    /// Called only when [`Self::is_start`] held. A claim shorter than
    /// [`Self::MIN_FRAME`] is treated as invalid by the scanner.
    fn frame_len(buf: &[u8], at: usize) -> usize;

    /// Full validation of a complete candidate frame (checksums, delimiters).
    fn validate(frame: &[u8]) -> bool;

    /// Earliest offset in `buf` that could begin a frame.
    ///
    /// Must also report a start sequence cut off by the end of the buffer
    /// (for example a lone first header byte in the final position), so that
    /// a frame split across chunk boundaries is not thrown away.
    fn find_start(buf: &[u8]) -> Option<usize>;

    /// Correlation route for a validated frame, `None` to drop it.
    fn route(frame: &[u8]) -> Option<Route>;
}

/// Extract every complete, valid frame from `buf`, leaving the residual.
///
/// The residual is whatever tail could still grow into a frame: a partial
/// frame, or skipped bytes that have not yet been ruled out. Callers append
/// the next transport chunk to the same buffer and invoke `scan` again;
/// feeding the stream in different chunkings yields the same frame sequence.
pub fn scan<G: Grammar>(buf: &mut BytesMut) -> Vec<Bytes> {
    let mut frames = Vec::new();
    let mut i = 0;

    while i + G::MIN_FRAME <= buf.len() {
        if !G::is_start(buf, i) {
            i += 1;
            continue;
        }
        let size = G::frame_len(buf, i);
        if size >= G::MIN_FRAME && i + size > buf.len() {
            // Partial tail: keep everything and wait for the next chunk.
            break;
        }
        if size < G::MIN_FRAME || !G::validate(&buf[i..i + size]) {
            i += 1;
            continue;
        }
        frames.push(Bytes::copy_from_slice(&buf[i..i + size]));
        match G::find_start(&buf[i + size..]) {
            None => {
                // Nothing after the frame can begin another one.
                buf.clear();
                return frames;
            },
            Some(next) => {
                let _ = buf.split_to(i + size + next);
                i = 0;
            },
        }
    }

    frames
}
