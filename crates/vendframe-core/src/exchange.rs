//! The shared call engine: one command out, its replies back in.
//!
//! Every adapter operation funnels through [`exchange`]: resolve the client,
//! claim the correlation key, write the frame, then block on the slot's
//! queue until the reply count is reached or the deadline fires. The slot is
//! retired on every exit path — success, timeout, write error, cancellation
//! — so a reply that arrives after the caller gave up finds no slot and is
//! dropped by the dispatcher.

use bytes::Bytes;

use crate::{
    env::Environment,
    error::AdapterError,
    hex_dump,
    registry::ClientRegistry,
    timeout::{DEFAULT_TIMEOUT_MS, normalize},
};

/// One in-flight command: what to write, where to wait, for how long.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    /// Target client id.
    pub client_id: &'a str,
    /// Complete command frame to write.
    pub frame: &'a [u8],
    /// Correlation key to wait under.
    pub key: &'a str,
    /// Slot queue bound and target reply count (1 for ordinary calls).
    pub capacity: usize,
    /// Caller-supplied timeout in milliseconds; zero selects the default.
    pub timeout_ms: u64,
    /// Operation default applied when `timeout_ms` is zero.
    pub default_ms: u64,
}

impl<'a> Call<'a> {
    /// Single-reply call with the standard default deadline.
    pub fn new(client_id: &'a str, frame: &'a [u8], key: &'a str) -> Self {
        Self {
            client_id,
            frame,
            key,
            capacity: 1,
            timeout_ms: 0,
            default_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Use the caller-supplied timeout (milliseconds, zero = default).
    #[must_use]
    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Override the default applied when the caller passes zero.
    #[must_use]
    pub fn default_timeout(mut self, default_ms: u64) -> Self {
        self.default_ms = default_ms;
        self
    }

    /// Collect up to `capacity` replies instead of one.
    #[must_use]
    pub fn collect(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Write the call's frame and await its replies.
///
/// With `capacity > 1` a deadline that fires after at least one reply is a
/// partial success and returns what was collected; with zero replies it is
/// a timeout either way.
pub async fn exchange<E: Environment>(
    env: &E,
    clients: &ClientRegistry,
    call: Call<'_>,
) -> Result<Vec<Bytes>, AdapterError> {
    if call.frame.is_empty() {
        return Err(AdapterError::NoContent);
    }
    let client = clients.get(call.client_id).ok_or(AdapterError::NoSuchClient)?;

    let Some((_guard, mut replies)) = client.channels().register(call.key, call.capacity) else {
        return Err(AdapterError::Processing);
    };

    match client.write(call.frame).await {
        Ok(n) => {
            tracing::info!(
                client_id = call.client_id,
                key = call.key,
                bytes = n,
                frame = %hex_dump(call.frame),
                "command written"
            );
        },
        Err(err) => {
            tracing::error!(
                client_id = call.client_id,
                key = call.key,
                error = %err,
                "command write failed"
            );
            return Err(AdapterError::Write(err));
        },
    }

    let deadline = env.sleep(normalize(call.timeout_ms, call.default_ms));
    tokio::pin!(deadline);

    let mut collected = Vec::new();
    loop {
        tokio::select! {
            received = replies.recv() => {
                match received {
                    Some(reply) => {
                        collected.push(reply);
                        if collected.len() >= call.capacity {
                            return Ok(collected);
                        }
                    },
                    // Sender gone: the slot was consumed at delivery and no
                    // further replies can arrive.
                    None if !collected.is_empty() => return Ok(collected),
                    None => return Err(AdapterError::Timeout),
                }
            },
            () = &mut deadline => {
                if call.capacity > 1 && !collected.is_empty() {
                    tracing::debug!(
                        client_id = call.client_id,
                        key = call.key,
                        collected = collected.len(),
                        "deadline reached with partial collection"
                    );
                    return Ok(collected);
                }
                return Err(AdapterError::Timeout);
            },
        }
    }
}
