//! Per-call timeout normalization.
//!
//! Upstream callers pass timeouts in integer milliseconds, with zero meaning
//! "use the operation's default". Sub-100 ms values are raised to 100 ms: a
//! controller on a serial line cannot answer faster, and a too-tight
//! deadline would only manufacture spurious timeouts.

use std::time::Duration;

/// Default deadline for single-shot operations.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default outer deadline for the lifter ship flow, which spans several
/// polled status round trips.
pub const SHIP_TIMEOUT_MS: u64 = 60_000;

/// Smallest accepted deadline.
pub const MIN_TIMEOUT_MS: u64 = 100;

/// Normalize a caller-supplied timeout against an operation default.
pub fn normalize(timeout_ms: u64, default_ms: u64) -> Duration {
    let ms = match timeout_ms {
        0 => default_ms,
        t if t < MIN_TIMEOUT_MS => MIN_TIMEOUT_MS,
        t => t,
    };
    Duration::from_millis(ms)
}
