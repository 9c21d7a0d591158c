//! Family Z controller protocol: locker cabinets with tagged frames.
//!
//! Commands and replies share one layout, `A8 N F M T… C FE`: a start byte,
//! the total frame length, the function byte, a frame tag, the payload, the
//! low byte of the arithmetic sum over everything before it, and a fixed
//! terminator. The tag is derived from the wall clock and echoed back by the
//! controller, which lets two otherwise identical operations on the same
//! cell run back-to-back without their replies crossing.
//!
//! Because replies echo the tag, row and column, the correlation keys are
//! dynamic: `"<op>-<tag>-<row>-<column>"`. Rotate and unlock replies whose
//! caller has already gone away fall back to an in-flight bulk `lookup`
//! collection if one is registered.

use crate::{
    error::{ProtocolError, Result},
    route::Route,
    scan::Grammar,
};

/// Function bytes.
pub mod function {
    /// Cabinet status query.
    pub const STATUS: u8 = 0x04;
    /// Rotate a cell motor.
    pub const ROTATE: u8 = 0x05;
    /// Check a cell.
    pub const CHECK: u8 = 0x07;
    /// Bulk lookup; the controller answers with a burst of cell replies.
    pub const LOOKUP: u8 = 0x08;
    /// Unlock a locker door.
    pub const UNLOCK: u8 = 0x09;
}

/// Correlation key stems.
pub mod key {
    /// Cabinet status.
    pub const STATUS: &str = "status";
    /// Rotate; composed with tag/row/column.
    pub const ROTATE: &str = "rotate";
    /// Check; composed with tag/row/column.
    pub const CHECK: &str = "check";
    /// Bulk lookup collection.
    pub const LOOKUP: &str = "lookup";
    /// Unlock; composed with tag/row/column.
    pub const UNLOCK: &str = "unlock";
}

/// Start byte of every frame.
pub const START: u8 = 0xA8;
/// Terminator byte closing every frame.
pub const TERMINATOR: u8 = 0xFE;

/// Shortest reply the controller emits (an 8-byte check reply).
pub const MIN_REPLY: usize = 8;

/// Expected reply lengths per function, used as dispatch gates.
const STATUS_REPLY_LEN: usize = 9;
const CHECK_REPLY_LEN: usize = 8;
const CELL_REPLY_LEN: usize = 10;

/// Frame tag for a moment of wall-clock time.
///
/// The controller folds the minute and second into a single byte, modulo 250
/// so a handful of values stay reserved.
pub fn frame_tag(seconds_into_hour: u64) -> u8 {
    (seconds_into_hour % 250) as u8
}

/// Build a command frame `A8 N F M T… C FE`.
pub fn encode(function: u8, tag: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let size = 4 + 2 + payload.len();
    if size > 0xFF {
        return Err(ProtocolError::PayloadTooLarge { size, max: 0xFF });
    }

    let mut out = Vec::with_capacity(size);
    out.push(START);
    out.push(size as u8);
    out.push(function);
    out.push(tag);
    out.extend_from_slice(payload);
    out.push(out.iter().fold(0u8, |sum, &b| sum.wrapping_add(b)));
    out.push(TERMINATOR);
    Ok(out)
}

/// Compose the dynamic correlation key for a cell-addressed operation.
pub fn cell_key(op: &str, tag: u8, row: u8, column: u8) -> String {
    format!("{op}-{tag}-{row}-{column}")
}

/// Fields echoed by a cell-addressed reply (check, rotate, unlock, lookup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellReply {
    /// Echoed frame tag.
    pub frame: u8,
    /// Echoed row.
    pub row: u8,
    /// Echoed column.
    pub column: u8,
    /// Operation duration as reported by the controller.
    pub duration: u8,
    /// Whether the controller reports success.
    ///
    /// Only ten-byte replies carry a result byte; the short check reply is a
    /// bare acknowledgement and decodes as success.
    pub success: bool,
}

impl CellReply {
    /// Decode from a validated reply frame.
    pub fn parse(frame: &[u8]) -> Result<Self> {
        if frame.len() < MIN_REPLY {
            return Err(ProtocolError::ReplyTooShort {
                expected: MIN_REPLY,
                actual: frame.len(),
            });
        }
        Ok(Self {
            frame: frame[3],
            row: frame[4],
            column: frame[5],
            duration: frame[6],
            success: if frame.len() == CELL_REPLY_LEN { frame[7] == 1 } else { true },
        })
    }
}

/// Fields of a cabinet status reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CabinetStatus {
    /// Configured target temperature.
    pub expected_temperature: u8,
    /// Measured temperature.
    pub actual_temperature: u8,
    /// Whether the refrigerator is currently running.
    pub refrigerator_operating: bool,
}

impl CabinetStatus {
    /// Decode from a validated status reply frame.
    pub fn parse(frame: &[u8]) -> Result<Self> {
        if frame.len() < STATUS_REPLY_LEN {
            return Err(ProtocolError::ReplyTooShort {
                expected: STATUS_REPLY_LEN,
                actual: frame.len(),
            });
        }
        Ok(Self {
            expected_temperature: frame[4],
            actual_temperature: frame[5],
            refrigerator_operating: frame[6] == 1,
        })
    }
}

/// Reassembler grammar.
pub struct Wire;

impl Grammar for Wire {
    const MIN_FRAME: usize = MIN_REPLY;

    fn is_start(buf: &[u8], at: usize) -> bool {
        buf[at] == START
    }

    fn frame_len(buf: &[u8], at: usize) -> usize {
        buf[at + 1] as usize
    }

    fn validate(frame: &[u8]) -> bool {
        if frame[frame.len() - 1] != TERMINATOR {
            return false;
        }
        let sum = frame[..frame.len() - 2].iter().fold(0u8, |s, &b| s.wrapping_add(b));
        sum == frame[frame.len() - 2]
    }

    fn find_start(buf: &[u8]) -> Option<usize> {
        buf.iter().position(|&b| b == START)
    }

    fn route(frame: &[u8]) -> Option<Route> {
        match (frame[2], frame.len()) {
            (function::STATUS, STATUS_REPLY_LEN) => Some(Route::retain(key::STATUS)),
            (function::CHECK, CHECK_REPLY_LEN) => {
                Some(Route::consume(cell_key(key::CHECK, frame[3], frame[4], frame[5])))
            },
            (function::ROTATE, CELL_REPLY_LEN) => Some(
                Route::consume(cell_key(key::ROTATE, frame[3], frame[4], frame[5]))
                    .or_else(key::LOOKUP),
            ),
            (function::UNLOCK, CELL_REPLY_LEN) => Some(
                Route::consume(cell_key(key::UNLOCK, frame[3], frame[4], frame[5]))
                    .or_else(key::LOOKUP),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::{route::Disposition, scan::scan};

    /// Build a valid reply of an arbitrary total length.
    fn reply(function: u8, tag: u8, tail: &[u8]) -> Vec<u8> {
        let size = 4 + 2 + tail.len();
        let mut out = vec![START, size as u8, function, tag];
        out.extend_from_slice(tail);
        out.push(out.iter().fold(0u8, |s, &b| s.wrapping_add(b)));
        out.push(TERMINATOR);
        out
    }

    #[test]
    fn frame_tag_wraps_at_250() {
        assert_eq!(frame_tag(70), 70); // minute 1, second 10
        assert_eq!(frame_tag(249), 249);
        assert_eq!(frame_tag(250), 0);
        assert_eq!(frame_tag(3599), 99);
    }

    #[test]
    fn rotate_command_layout() {
        let frame = encode(function::ROTATE, 70, &[2, 3]).unwrap();
        assert_eq!(frame, [0xA8, 0x08, 0x05, 0x46, 0x02, 0x03, 0x00, 0xFE]);
    }

    #[test]
    fn payload_limit_enforced() {
        assert!(encode(function::LOOKUP, 0, &[0u8; 0xFF - 6 + 1]).is_err());
        assert!(encode(function::LOOKUP, 0, &[0u8; 0xFF - 6]).is_ok());
    }

    #[test]
    fn reply_requires_terminator_and_sum() {
        let good = reply(function::STATUS, 5, &[20, 18, 1]);
        let mut buf = BytesMut::from(&good[..]);
        assert_eq!(scan::<Wire>(&mut buf).len(), 1);

        let mut no_terminator = good.clone();
        let last = no_terminator.len() - 1;
        no_terminator[last] = 0xFD;
        let mut buf = BytesMut::from(&no_terminator[..]);
        assert!(scan::<Wire>(&mut buf).is_empty());

        let mut bad_sum = good;
        let sum_at = bad_sum.len() - 2;
        bad_sum[sum_at] ^= 0x01;
        let mut buf = BytesMut::from(&bad_sum[..]);
        assert!(scan::<Wire>(&mut buf).is_empty());
    }

    #[test]
    fn status_routes_to_fixed_key() {
        let frame = reply(function::STATUS, 5, &[20, 18, 1]);
        let route = Wire::route(&frame).unwrap();
        assert_eq!(route.key, key::STATUS);
        assert_eq!(route.disposition, Disposition::Retain);
        assert!(route.fallback.is_none());
    }

    #[test]
    fn check_consumes_its_dynamic_key() {
        let frame = reply(function::CHECK, 42, &[1, 9]);
        assert_eq!(frame.len(), 8);
        let route = Wire::route(&frame).unwrap();
        assert_eq!(route.key, "check-42-1-9");
        assert_eq!(route.disposition, Disposition::Consume);
        assert!(route.fallback.is_none());
    }

    #[test]
    fn rotate_and_unlock_fall_back_to_lookup() {
        let frame = reply(function::ROTATE, 70, &[2, 3, 12, 1]);
        assert_eq!(frame.len(), 10);
        let route = Wire::route(&frame).unwrap();
        assert_eq!(route.key, "rotate-70-2-3");
        assert_eq!(route.fallback, Some(key::LOOKUP));

        let frame = reply(function::UNLOCK, 70, &[2, 3, 12, 0]);
        let route = Wire::route(&frame).unwrap();
        assert_eq!(route.key, "unlock-70-2-3");
        assert_eq!(route.fallback, Some(key::LOOKUP));
    }

    #[test]
    fn unexpected_length_is_dropped() {
        // A rotate reply must be exactly ten bytes to dispatch.
        let frame = reply(function::ROTATE, 70, &[2, 3, 12]);
        assert_eq!(frame.len(), 9);
        assert!(Wire::route(&frame).is_none());
    }

    #[test]
    fn cell_reply_decoding() {
        let ten = reply(function::ROTATE, 70, &[2, 3, 12, 1]);
        let decoded = CellReply::parse(&ten).unwrap();
        assert_eq!(decoded.frame, 70);
        assert_eq!(decoded.row, 2);
        assert_eq!(decoded.column, 3);
        assert_eq!(decoded.duration, 12);
        assert!(decoded.success);

        let failed = reply(function::ROTATE, 70, &[2, 3, 12, 0]);
        assert!(!CellReply::parse(&failed).unwrap().success);

        // Short check acknowledgements decode as success.
        let ack = reply(function::CHECK, 70, &[2, 3]);
        assert!(CellReply::parse(&ack).unwrap().success);
    }

    #[test]
    fn status_decoding() {
        let frame = reply(function::STATUS, 5, &[4, 7, 1]);
        let status = CabinetStatus::parse(&frame).unwrap();
        assert_eq!(status.expected_temperature, 4);
        assert_eq!(status.actual_temperature, 7);
        assert!(status.refrigerator_operating);
    }

    #[test]
    fn zero_length_claim_does_not_wedge_the_scanner() {
        // A stray start byte followed by a zero length must be skipped, and
        // the real frame behind it still parsed.
        let mut stream = vec![START, 0x00];
        stream.extend_from_slice(&reply(function::STATUS, 5, &[20, 18, 1]));
        let mut buf = BytesMut::from(&stream[..]);
        assert_eq!(scan::<Wire>(&mut buf).len(), 1);
    }
}
