//! Per-client correlation table.
//!
//! Presence of a key means "a command is in flight under this key". Each
//! entry pairs the key with the sending half of a bounded channel; the
//! waiting caller holds the receiving half. Registration is
//! insert-if-absent under one lock, which is what makes the
//! one-in-flight-per-key invariant atomic: of two racing callers exactly one
//! inserts, the other observes the occupied entry and fails busy.
//!
//! The caller retires its key on every exit path through [`SlotGuard`];
//! delivery for a key that is no longer present is a no-op, never an error.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use bytes::Bytes;
use tokio::sync::mpsc;

/// Keyed rendezvous table for one client.
#[derive(Debug, Default)]
pub struct ReplySlots {
    inner: Mutex<HashMap<String, mpsc::Sender<Bytes>>>,
}

impl ReplySlots {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `key`, binding it to a fresh queue of `capacity`.
    ///
    /// Returns `None` when the key is already in flight. On success the
    /// returned guard retires the key when dropped, and the receiver yields
    /// frames delivered for it in arrival order.
    pub fn register(
        &self,
        key: &str,
        capacity: usize,
    ) -> Option<(SlotGuard<'_>, mpsc::Receiver<Bytes>)> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.contains_key(key) {
            return None;
        }
        let (tx, rx) = mpsc::channel(capacity.max(1));
        inner.insert(key.to_string(), tx);
        Some((SlotGuard { slots: self, key: key.to_string() }, rx))
    }

    /// Deliver a frame to the slot under `key`, leaving the slot in place.
    ///
    /// Returns `false` when no such slot exists or its queue is already
    /// full; the frame is dropped in both cases.
    pub fn deliver(&self, key: &str, frame: Bytes) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.get(key) {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => false,
        }
    }

    /// Deliver a frame and retire the slot in the same step (single-shot
    /// replies). Returns `false` when no such slot exists.
    pub fn consume(&self, key: &str, frame: Bytes) -> bool {
        let tx = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.remove(key)
        };
        match tx {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => false,
        }
    }

    /// Whether `key` is currently in flight.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    /// Number of in-flight keys.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn retire(&self, key: &str) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
    }
}

/// Removes its key from the table on drop.
///
/// Held by the waiting caller for the whole await, so the key is retired on
/// success, timeout, error and cancellation alike.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    slots: &'a ReplySlots,
    key: String,
}

impl SlotGuard<'_> {
    /// The key this guard retires.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slots.retire(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_register_is_rejected() {
        let slots = ReplySlots::new();
        let first = slots.register("rotate", 1);
        assert!(first.is_some());
        assert!(slots.register("rotate", 1).is_none());
    }

    #[test]
    fn guard_drop_retires_the_key() {
        let slots = ReplySlots::new();
        {
            let _held = slots.register("rotate", 1);
            assert!(slots.contains("rotate"));
        }
        assert!(!slots.contains("rotate"));
        assert!(slots.register("rotate", 1).is_some());
    }

    #[test]
    fn racing_registers_fail_busy_exactly_once() {
        let slots = ReplySlots::new();
        std::thread::scope(|scope| {
            let handles: Vec<_> =
                (0..8).map(|_| scope.spawn(|| slots.register("status", 1))).collect();
            // Claims are returned (not dropped) so every loser raced a live
            // registration: exactly one wins.
            let claims: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(claims.iter().filter(|c| c.is_some()).count(), 1);
        });
        assert!(!slots.contains("status"));
    }

    #[test]
    fn delivery_to_absent_key_is_a_no_op() {
        let slots = ReplySlots::new();
        assert!(!slots.deliver("status", Bytes::from_static(&[1, 2, 3])));
        assert!(!slots.consume("status", Bytes::from_static(&[1, 2, 3])));
        assert_eq!(slots.in_flight(), 0);
    }

    #[test]
    fn consume_retires_the_slot_at_delivery() {
        let slots = ReplySlots::new();
        let (guard, mut rx) = slots.register("check-1-2-3", 1).unwrap();

        assert!(slots.consume("check-1-2-3", Bytes::from_static(&[9])));
        assert!(!slots.contains("check-1-2-3"));

        // The in-flight caller still receives the frame that consumed the
        // slot.
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(&[9]));
        drop(guard);
    }

    #[test]
    fn frames_arrive_in_delivery_order() {
        let slots = ReplySlots::new();
        let (_guard, mut rx) = slots.register("lookup", 5).unwrap();

        for n in 0..5u8 {
            assert!(slots.deliver("lookup", Bytes::copy_from_slice(&[n])));
        }
        for n in 0..5u8 {
            assert_eq!(rx.try_recv().unwrap()[0], n);
        }
    }

    #[test]
    fn queue_capacity_bounds_buffered_frames() {
        let slots = ReplySlots::new();
        let (_guard, _rx) = slots.register("default", 1).unwrap();

        assert!(slots.deliver("default", Bytes::from_static(&[1])));
        // Queue full: the frame is dropped, the slot stays.
        assert!(!slots.deliver("default", Bytes::from_static(&[2])));
        assert!(slots.contains("default"));
    }
}
