//! Family B controller protocol: the basic vending board and its lifter
//! add-on.
//!
//! Both element types share one serial line. The basic board speaks six-byte
//! complement-coded commands (`00 FF P ~P S ~S`) and answers with fixed
//! five-byte `00 5D` records guarded by a byte sum. The lifter speaks
//! STX-delimited variable records (`02 L F D… C 03 X`) with an inner
//! arithmetic checksum over the data and an outer XOR over the whole frame.
//!
//! The reassembler grammar therefore accepts two kinds of start: the
//! `00 5D` reply header and the lifter's `02` STX byte.

use crate::{
    error::{ProtocolError, Result},
    route::Route,
    scan::Grammar,
};

/// Primary command bytes understood by the basic board.
pub mod opcode {
    /// Connectivity check.
    pub const CHECK: u8 = 0xDF;
    /// Merge a cell with its neighbor (double-width slots).
    pub const MERGE: u8 = 0xCA;
    /// Undo a cell merge.
    pub const UNMERGE: u8 = 0xC9;
    /// Cabinet status query (temperature).
    pub const STATUS: u8 = 0xDC;
    /// Rotate every motor once (self test).
    pub const ROTATE_ALL: u8 = 0x65;
    /// Heater relay; secondary selects on/off.
    pub const HEATER: u8 = 0xD4;
    /// Cabinet lights; secondary selects on/off.
    pub const LIGHTS: u8 = 0xDD;
    /// Refrigerator compressor relay; secondary selects on/off.
    pub const REFRIGERATOR: u8 = 0xCC;
    /// Refrigerator controller enable.
    pub const REFRIGERATOR_CONTROLLER: u8 = 0xCD;
    /// Refrigerator temperature setpoint; secondary carries the degrees.
    pub const SETPOINT: u8 = 0xCE;
}

/// Function bytes understood by the lifter.
pub mod lifter_function {
    /// Lifter status query.
    pub const STATUS: u8 = 0x01;
    /// Ship an item: pick from a cell and carry it to the outlet.
    pub const SHIP: u8 = 0x02;
    /// Tray operation.
    pub const TRAY: u8 = 0x03;
    /// Move the lifter to a floor.
    pub const MOVE: u8 = 0x04;
    /// Reset the lifter mechanics.
    pub const RESET: u8 = 0x05;
    /// Outlet shutter open/close.
    pub const SHUTTER: u8 = 0x06;
    /// Clear a latched fault.
    pub const CLEAR: u8 = 0x50;
    /// Probe whether a cell exists.
    pub const EXIST: u8 = 0x85;
}

/// Correlation keys for this family.
pub mod key {
    /// Every basic-board reply rendezvouses here.
    pub const DEFAULT: &str = "default";
    /// Lifter status.
    pub const STATUS: &str = "status";
    /// Lifter ship.
    pub const SHIP: &str = "ship";
    /// Lifter tray.
    pub const TRAY: &str = "tray";
    /// Lifter move.
    pub const MOVE: &str = "move";
    /// Lifter reset.
    pub const RESET: &str = "reset";
    /// Lifter shutter.
    pub const SHUTTER: &str = "shutter";
    /// Lifter fault clear.
    pub const CLEAR: &str = "clear";
    /// Lifter cell probe.
    pub const EXIST: &str = "exist";
}

/// STX byte opening every lifter frame.
pub const LIFTER_START: u8 = 0x02;
/// End-of-record marker preceding the lifter XOR byte.
pub const LIFTER_END: u8 = 0x03;
/// Two-byte header of a basic-board reply.
pub const REPLY_START: [u8; 2] = [0x00, 0x5D];

/// Fixed size of a basic-board reply.
pub const REPLY_LEN: usize = 5;

/// Largest lifter frame: one-byte length field covering function + data +
/// inner checksum, plus STX, length, ETX and XOR.
const LIFTER_MAX_FRAME: usize = 2 + 0xFF + 2;

/// Build a six-byte basic-board command.
///
/// The bitwise complements of the primary and secondary bytes stand in for a
/// checksum.
pub fn encode_basic(primary: u8, secondary: u8) -> Vec<u8> {
    vec![0x00, 0xFF, primary, !primary, secondary, !secondary]
}

/// Build a lifter command frame `02 L F D… C 03 X`.
///
/// `L` counts the function byte, the data and the inner checksum. `C` is the
/// low byte of the arithmetic sum over the data, and `X` XORs every byte
/// before it, STX included.
pub fn encode_lifter(function: u8, data: &[u8]) -> Result<Vec<u8>> {
    let record = data.len() + 2;
    if record > 0xFF {
        return Err(ProtocolError::PayloadTooLarge {
            size: record + 4,
            max: LIFTER_MAX_FRAME,
        });
    }

    let mut out = Vec::with_capacity(record + 4);
    out.push(LIFTER_START);
    out.push(record as u8);
    out.push(function);
    out.extend_from_slice(data);
    out.push(data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b)));
    out.push(LIFTER_END);
    out.push(out.iter().fold(0u8, |x, &b| x ^ b));
    Ok(out)
}

/// Lifter status and error bytes, as echoed by a status reply.
///
/// Replies too short to carry both bytes decode as unknown (non-OK) rather
/// than failing; the caller's timeout remains the backstop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifterStatus {
    /// Raw status byte; zero when the lifter is idle and healthy.
    pub status: u8,
    /// Raw error byte; zero when no fault is latched.
    pub error: u8,
}

impl LifterStatus {
    /// Decode from a validated lifter reply frame.
    pub fn parse(frame: &[u8]) -> Self {
        Self {
            status: frame.get(4).copied().unwrap_or(0xFF),
            error: frame.get(5).copied().unwrap_or(0xFF),
        }
    }

    /// Healthy and idle: status and error both zero.
    pub fn is_ok(self) -> bool {
        self.status == 0 && self.error == 0
    }

    /// Error code string as reported upstream.
    ///
    /// Codes 11-19 and 21-29 are families of related faults and collapse to
    /// `"10i"` and `"20i"`; everything else keeps its two-digit form.
    pub fn code(self) -> String {
        match self.error {
            11..=19 => "10i".to_string(),
            21..=29 => "20i".to_string(),
            other => format!("{other:02}"),
        }
    }
}

/// Reassembler grammar for the shared basic + lifter line.
pub struct Wire;

impl Grammar for Wire {
    const MIN_FRAME: usize = REPLY_LEN;

    fn is_start(buf: &[u8], at: usize) -> bool {
        buf[at] == LIFTER_START || (buf[at] == REPLY_START[0] && buf[at + 1] == REPLY_START[1])
    }

    fn frame_len(buf: &[u8], at: usize) -> usize {
        if buf[at] == LIFTER_START { 2 + buf[at + 1] as usize + 2 } else { REPLY_LEN }
    }

    fn validate(frame: &[u8]) -> bool {
        if frame[0] == LIFTER_START {
            frame[frame.len() - 2] == LIFTER_END
        } else {
            let sum = frame[..4].iter().fold(0u8, |s, &b| s.wrapping_add(b));
            sum == frame[4]
        }
    }

    fn find_start(buf: &[u8]) -> Option<usize> {
        buf.iter().enumerate().find_map(|(i, &b)| {
            if b == LIFTER_START {
                return Some(i);
            }
            if b == REPLY_START[0] {
                // A lone 0x00 in the final position may be a split reply
                // header; keep it until the next chunk settles the question.
                match buf.get(i + 1) {
                    Some(&next) if next == REPLY_START[1] => return Some(i),
                    None => return Some(i),
                    Some(_) => {},
                }
            }
            None
        })
    }

    fn route(frame: &[u8]) -> Option<Route> {
        if frame[0] != LIFTER_START {
            return Some(Route::retain(key::DEFAULT));
        }
        let key = match frame[2] {
            lifter_function::STATUS => key::STATUS,
            lifter_function::SHIP => key::SHIP,
            lifter_function::TRAY => key::TRAY,
            lifter_function::MOVE => key::MOVE,
            lifter_function::RESET => key::RESET,
            lifter_function::SHUTTER => key::SHUTTER,
            lifter_function::CLEAR => key::CLEAR,
            lifter_function::EXIST => key::EXIST,
            _ => return None,
        };
        Some(Route::retain(key))
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::scan::scan;

    /// Build a valid lifter reply the way the controller does.
    fn lifter_reply(function: u8, data: &[u8]) -> Vec<u8> {
        encode_lifter(function, data).unwrap()
    }

    #[test]
    fn basic_command_layout() {
        assert_eq!(encode_basic(0x03, 0xAA), [0x00, 0xFF, 0x03, 0xFC, 0xAA, 0x55]);
        assert_eq!(encode_basic(0xDF, 0x55), [0x00, 0xFF, 0xDF, 0x20, 0x55, 0xAA]);
    }

    #[test]
    fn lifter_command_checksums() {
        let frame = encode_lifter(lifter_function::SHIP, &[0x04, 0x07]).unwrap();
        // 02 L F D0 D1 C 03 X
        assert_eq!(frame[0], LIFTER_START);
        assert_eq!(frame[1], 4); // function + two data bytes + inner checksum
        assert_eq!(frame[2], lifter_function::SHIP);
        assert_eq!(frame[5], 0x0B); // 04 + 07
        assert_eq!(frame[6], LIFTER_END);
        let xor = frame[..frame.len() - 1].iter().fold(0u8, |x, &b| x ^ b);
        assert_eq!(frame[7], xor);
    }

    #[test]
    fn lifter_payload_limit() {
        assert!(matches!(
            encode_lifter(lifter_function::SHIP, &[0u8; 254]),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
        assert!(encode_lifter(lifter_function::SHIP, &[0u8; 253]).is_ok());
    }

    #[test]
    fn basic_reply_validates_byte_sum() {
        let mut buf = BytesMut::from(&[0x00, 0x5D, 0x00, 0xAA, 0x07][..]);
        let frames = scan::<Wire>(&mut buf);
        assert_eq!(frames.len(), 1);

        let mut bad = BytesMut::from(&[0x00, 0x5D, 0x00, 0xAA, 0x08][..]);
        assert!(scan::<Wire>(&mut bad).is_empty());
    }

    #[test]
    fn basic_reply_routes_to_default() {
        let route = Wire::route(&[0x00, 0x5D, 0x00, 0xAA, 0x07]).unwrap();
        assert_eq!(route.key, key::DEFAULT);
        assert_eq!(route.disposition, crate::route::Disposition::Retain);
    }

    #[test]
    fn lifter_reply_routes_by_function_byte() {
        for (function, expected) in [
            (lifter_function::STATUS, key::STATUS),
            (lifter_function::SHIP, key::SHIP),
            (lifter_function::TRAY, key::TRAY),
            (lifter_function::MOVE, key::MOVE),
            (lifter_function::RESET, key::RESET),
            (lifter_function::SHUTTER, key::SHUTTER),
            (lifter_function::CLEAR, key::CLEAR),
            (lifter_function::EXIST, key::EXIST),
        ] {
            let frame = lifter_reply(function, &[0x00]);
            assert_eq!(Wire::route(&frame).unwrap().key, expected);
        }
        let unknown = lifter_reply(0x42, &[0x00]);
        assert!(Wire::route(&unknown).is_none());
    }

    #[test]
    fn mixed_line_carries_both_frame_kinds() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&lifter_reply(lifter_function::STATUS, &[0x00, 0x00, 0x00]));
        buf.extend_from_slice(&[0x00, 0x5D, 0x00, 0xAA, 0x07]);

        let frames = scan::<Wire>(&mut buf);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0][0], LIFTER_START);
        assert_eq!(&frames[1][..2], &REPLY_START);
        assert!(buf.is_empty());
    }

    #[test]
    fn status_decoding_and_error_collapse() {
        let healthy = lifter_reply(lifter_function::STATUS, &[0x00, 0x00, 0x00]);
        let status = LifterStatus::parse(&healthy);
        assert!(status.is_ok());
        assert_eq!(status.code(), "00");

        let faulted = lifter_reply(lifter_function::STATUS, &[0x00, 0x01, 0x0D]);
        let status = LifterStatus::parse(&faulted);
        assert!(!status.is_ok());
        assert_eq!(status.code(), "10i");

        let faulted = lifter_reply(lifter_function::STATUS, &[0x00, 0x01, 0x17]);
        assert_eq!(LifterStatus::parse(&faulted).code(), "20i");

        let faulted = lifter_reply(lifter_function::STATUS, &[0x00, 0x01, 0x05]);
        assert_eq!(LifterStatus::parse(&faulted).code(), "05");
    }

    #[test]
    fn split_reply_header_is_kept_in_residual() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x00, 0x5D, 0x00, 0xAA, 0x07]);
        // Next reply arrives with only its first header byte so far.
        buf.extend_from_slice(&[0x00]);

        let frames = scan::<Wire>(&mut buf);
        assert_eq!(frames.len(), 1);
        assert_eq!(&buf[..], &[0x00]);

        buf.extend_from_slice(&[0x5D, 0x00, 0xAA, 0x07]);
        assert_eq!(scan::<Wire>(&mut buf).len(), 1);
    }
}
