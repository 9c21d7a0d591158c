//! Family B adapter: the lifter add-on.
//!
//! Lifter machines carry items from a cell to the outlet with an elevator
//! instead of dropping them. Commands use the STX-framed lifter records and
//! each function rendezvouses on its own fixed key, so a status poll can run
//! while a tray operation is still settling.
//!
//! Shipping is the one multi-step flow: gate on a status pre-check, issue
//! the ship command, then poll status once a second until the lifter reports
//! idle-and-healthy, a fault is latched, or the outer deadline runs out.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use vendframe_core::{
    AdapterError, Call, ClientRegistry, Environment, SHIP_TIMEOUT_MS, SystemEnv, exchange,
    normalize,
};
use vendframe_proto::family_b::{self, LifterStatus, key, lifter_function};

use crate::wire_json::Hex;

/// Interval between status polls while a ship is in progress.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Arguments naming just a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifterArgs {
    /// Target client id.
    pub client_id: String,
    /// Timeout in milliseconds; zero selects the default.
    #[serde(default)]
    pub timeout: u64,
}

/// Arguments addressing a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipArgs {
    /// Target client id.
    pub client_id: String,
    /// Cell row.
    pub row: u8,
    /// Cell column.
    pub column: u8,
    /// Outer deadline in milliseconds; zero selects the ship default.
    #[serde(default)]
    pub timeout: u64,
}

/// Arguments addressing a tray.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrayArgs {
    /// Target client id.
    pub client_id: String,
    /// Tray number.
    pub number: u8,
    /// Timeout in milliseconds; zero selects the default.
    #[serde(default)]
    pub timeout: u64,
}

/// Arguments for moving the lifter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveArgs {
    /// Target client id.
    pub client_id: String,
    /// Destination floor.
    pub floor: u8,
    /// Timeout in milliseconds; zero selects the default.
    #[serde(default)]
    pub timeout: u64,
}

/// Arguments for the outlet shutter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutterArgs {
    /// Target client id.
    pub client_id: String,
    /// Open the shutter (`true`) or close it (`false`).
    pub open: bool,
    /// Timeout in milliseconds; zero selects the default.
    #[serde(default)]
    pub timeout: u64,
}

/// Decoded lifter reply.
#[derive(Debug, Clone, Serialize)]
pub struct LifterReply {
    /// Raw reply frame as upper-case hex.
    pub hex: Hex,
    /// Raw status byte.
    pub status: u8,
    /// Raw error byte.
    pub error: u8,
    /// Idle and healthy.
    pub ok: bool,
    /// Upstream error code string (fault families collapsed).
    pub code: String,
}

impl LifterReply {
    fn from_frame(frame: &[u8]) -> Self {
        let decoded = LifterStatus::parse(frame);
        Self {
            hex: Hex::from(frame),
            status: decoded.status,
            error: decoded.error,
            ok: decoded.is_ok(),
            code: decoded.code(),
        }
    }
}

/// Operation surface for family B lifter machines.
pub struct Lifter<E: Environment = SystemEnv> {
    clients: Arc<ClientRegistry>,
    env: E,
}

impl Lifter<SystemEnv> {
    /// Adapter over the given client registry, using the system clock.
    #[must_use]
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self::with_env(clients, SystemEnv::new())
    }
}

impl<E: Environment> Lifter<E> {
    /// Adapter with an explicit environment.
    pub fn with_env(clients: Arc<ClientRegistry>, env: E) -> Self {
        Self { clients, env }
    }

    async fn call(
        &self,
        client_id: &str,
        function: u8,
        data: &[u8],
        wait_key: &str,
        timeout_ms: u64,
    ) -> Result<Bytes, AdapterError> {
        let frame = family_b::encode_lifter(function, data)?;
        let replies = exchange(
            &self.env,
            &self.clients,
            Call::new(client_id, &frame, wait_key).timeout(timeout_ms),
        )
        .await?;
        replies.into_iter().next().ok_or(AdapterError::Timeout)
    }

    /// Query lifter status.
    pub async fn status(&self, args: &LifterArgs) -> Result<LifterReply, AdapterError> {
        let frame = self
            .call(&args.client_id, lifter_function::STATUS, &[0x00], key::STATUS, args.timeout)
            .await?;
        Ok(LifterReply::from_frame(&frame))
    }

    /// Ship an item from a cell to the outlet.
    ///
    /// Gates on a status pre-check (a lifter that is already faulted or busy
    /// reports its state without shipping), then polls status once a second
    /// until the lifter is idle again, a fault is latched (the faulted reply
    /// is returned as-is), or the outer deadline fires.
    pub async fn ship(&self, args: &ShipArgs) -> Result<LifterReply, AdapterError> {
        let deadline = normalize(args.timeout, SHIP_TIMEOUT_MS);
        match tokio::time::timeout(deadline, self.ship_flow(args)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AdapterError::Timeout),
        }
    }

    async fn ship_flow(&self, args: &ShipArgs) -> Result<LifterReply, AdapterError> {
        let pre = self.poll_status(&args.client_id).await?;
        if !pre.ok {
            tracing::warn!(
                client_id = %args.client_id,
                status = pre.status,
                code = %pre.code,
                "lifter not ready, refusing to ship"
            );
            return Ok(pre);
        }

        let initial = self
            .call(
                &args.client_id,
                lifter_function::SHIP,
                &[args.row, args.column],
                key::SHIP,
                0,
            )
            .await?;
        tracing::debug!(
            client_id = %args.client_id,
            row = args.row,
            column = args.column,
            initial = %hex::encode_upper(&initial),
            "ship accepted, polling for completion"
        );

        loop {
            self.env.sleep(POLL_INTERVAL).await;
            let polled = self.poll_status(&args.client_id).await?;
            if polled.ok || polled.error != 0 {
                return Ok(polled);
            }
        }
    }

    async fn poll_status(&self, client_id: &str) -> Result<LifterReply, AdapterError> {
        let frame =
            self.call(client_id, lifter_function::STATUS, &[0x00], key::STATUS, 0).await?;
        Ok(LifterReply::from_frame(&frame))
    }

    /// Run a tray operation.
    pub async fn tray(&self, args: &TrayArgs) -> Result<LifterReply, AdapterError> {
        let frame = self
            .call(&args.client_id, lifter_function::TRAY, &[args.number], key::TRAY, args.timeout)
            .await?;
        Ok(LifterReply::from_frame(&frame))
    }

    /// Move the lifter to a floor.
    pub async fn move_lifter(&self, args: &MoveArgs) -> Result<LifterReply, AdapterError> {
        let frame = self
            .call(&args.client_id, lifter_function::MOVE, &[args.floor], key::MOVE, args.timeout)
            .await?;
        Ok(LifterReply::from_frame(&frame))
    }

    /// Reset the lifter mechanics.
    pub async fn reset(&self, args: &LifterArgs) -> Result<LifterReply, AdapterError> {
        let frame = self
            .call(&args.client_id, lifter_function::RESET, &[0x00], key::RESET, args.timeout)
            .await?;
        Ok(LifterReply::from_frame(&frame))
    }

    /// Open or close the outlet shutter.
    pub async fn shutter(&self, args: &ShutterArgs) -> Result<LifterReply, AdapterError> {
        let position = if args.open { 0x01 } else { 0x00 };
        let frame = self
            .call(&args.client_id, lifter_function::SHUTTER, &[position], key::SHUTTER, args.timeout)
            .await?;
        Ok(LifterReply::from_frame(&frame))
    }

    /// Clear a latched fault.
    pub async fn clear_fault(&self, args: &LifterArgs) -> Result<LifterReply, AdapterError> {
        let frame = self
            .call(&args.client_id, lifter_function::CLEAR, &[0x00], key::CLEAR, args.timeout)
            .await?;
        Ok(LifterReply::from_frame(&frame))
    }

    /// Probe whether a cell exists.
    pub async fn cell_exists(&self, args: &ShipArgs) -> Result<LifterReply, AdapterError> {
        let frame = self
            .call(
                &args.client_id,
                lifter_function::EXIST,
                &[args.row, args.column],
                key::EXIST,
                args.timeout,
            )
            .await?;
        Ok(LifterReply::from_frame(&frame))
    }
}
