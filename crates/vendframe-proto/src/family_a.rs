//! Family A controller protocol: spiral-rack dispensers.
//!
//! Commands go out as `01 55 F N T… M H L`: a two-byte preamble, the
//! function byte, the total frame length, the payload, a wall-clock frame
//! tag, and a 16-bit big-endian arithmetic sum over everything before it.
//! Replies mirror the layout behind an `FF 00` preamble and are validated by
//! the same trailing sum.
//!
//! Only one operation exists for this family (rotate, function `C0`), but it
//! uses dynamic correlation keys so that two different cells can be rotated
//! concurrently over the same line.

use crate::{
    error::{ProtocolError, Result},
    route::Route,
    scan::Grammar,
};

/// Rotate a cell motor.
pub const FUNC_ROTATE: u8 = 0xC0;

/// Correlation key stems.
pub mod key {
    /// Rotate; composed with row/column.
    pub const ROTATE: &str = "rotate";
}

/// Two-byte preamble of a command frame.
pub const COMMAND_START: [u8; 2] = [0x01, 0x55];
/// Two-byte preamble of a reply frame.
pub const REPLY_START: [u8; 2] = [0xFF, 0x00];

/// Shortest well-formed reply: preamble, function, length, tag, 16-bit sum.
pub const MIN_REPLY: usize = 6;

/// Frame tag for a moment of wall-clock time: minute and second folded into
/// one byte, wrapping naturally at 256.
pub fn frame_tag(seconds_into_hour: u64) -> u8 {
    (seconds_into_hour % 3600) as u8
}

/// Build a command frame `01 55 F N T… M H L`.
///
/// `N` counts the four header bytes, the payload, the tag and the two
/// checksum bytes; the sum runs over every byte before `H`.
pub fn encode(function: u8, tag: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let size = 4 + payload.len() + 1 + 2;
    if size > 0xFF {
        return Err(ProtocolError::PayloadTooLarge { size, max: 0xFF });
    }

    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&COMMAND_START);
    out.push(function);
    out.push(size as u8);
    out.extend_from_slice(payload);
    out.push(tag);
    let sum = out.iter().fold(0u16, |s, &b| s.wrapping_add(u16::from(b)));
    out.extend_from_slice(&sum.to_be_bytes());
    Ok(out)
}

/// Compose the dynamic correlation key for a rotate call.
pub fn rotate_key(row: u8, column: u8) -> String {
    format!("{}-{row}-{column}", key::ROTATE)
}

/// Reassembler grammar for reply frames.
pub struct Wire;

impl Grammar for Wire {
    const MIN_FRAME: usize = MIN_REPLY;

    fn is_start(buf: &[u8], at: usize) -> bool {
        buf[at] == REPLY_START[0] && buf[at + 1] == REPLY_START[1]
    }

    fn frame_len(buf: &[u8], at: usize) -> usize {
        buf[at + 3] as usize
    }

    fn validate(frame: &[u8]) -> bool {
        let sum = frame[..frame.len() - 2]
            .iter()
            .fold(0u16, |s, &b| s.wrapping_add(u16::from(b)));
        frame[frame.len() - 2..] == sum.to_be_bytes()
    }

    fn find_start(buf: &[u8]) -> Option<usize> {
        buf.iter().enumerate().find_map(|(i, &b)| {
            if b != REPLY_START[0] {
                return None;
            }
            match buf.get(i + 1) {
                Some(&next) if next == REPLY_START[1] => Some(i),
                // A trailing 0xFF may be a reply header split across chunks.
                None => Some(i),
                Some(_) => None,
            }
        })
    }

    fn route(frame: &[u8]) -> Option<Route> {
        if frame[2] != FUNC_ROTATE {
            return None;
        }
        Some(Route::retain(rotate_key(frame[4], frame[5])))
    }
}
