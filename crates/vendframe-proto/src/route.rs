//! Routing decisions for validated reply frames.
//!
//! The reassembler yields raw validated frames; each family then maps a frame
//! to the correlation key its caller is waiting under. That mapping is
//! returned as a [`Route`] value so the correlation engine stays
//! family-agnostic: it only needs to know the key, whether delivery retires
//! the slot, and where to fall back when the primary key has no waiter.

/// What delivery does to the slot registered under the route's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Leave the slot in place; the caller retires it on exit.
    Retain,
    /// Remove the slot at delivery time (single-shot replies).
    Consume,
}

/// Where a validated reply frame should be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Correlation key the waiting caller registered.
    pub key: String,
    /// Whether delivery retires the slot.
    pub disposition: Disposition,
    /// Key to try when `key` has no registered slot.
    ///
    /// Used by family Z: a rotate or unlock reply whose caller already went
    /// away may still satisfy an in-flight bulk `lookup`.
    pub fallback: Option<&'static str>,
}

impl Route {
    /// Route that leaves the slot registered after delivery.
    pub fn retain(key: impl Into<String>) -> Self {
        Self { key: key.into(), disposition: Disposition::Retain, fallback: None }
    }

    /// Route that removes the slot at delivery time.
    pub fn consume(key: impl Into<String>) -> Self {
        Self { key: key.into(), disposition: Disposition::Consume, fallback: None }
    }

    /// Add a fallback key consulted when the primary key is absent.
    #[must_use]
    pub fn or_else(mut self, fallback: &'static str) -> Self {
        self.fallback = Some(fallback);
        self
    }
}
