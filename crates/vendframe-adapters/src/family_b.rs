//! Family B adapter: the basic vending board.
//!
//! Every basic-board command is a six-byte complement-coded frame and every
//! reply rendezvouses on the shared `"default"` key, so only one basic
//! operation can be in flight per client — a second caller fails busy
//! immediately. Most operations complete within a second; the caller only
//! chooses the timeout for the motor operations.

use std::{sync::Arc, time::SystemTime};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use vendframe_core::{AdapterError, Call, ClientRegistry, Environment, SystemEnv, exchange};
use vendframe_proto::family_b::{self, opcode};

/// The quick commands answer within a second on a healthy line.
const QUICK_TIMEOUT_MS: u64 = 1_000;
/// A full self-test rotation of every motor takes minutes.
const ROTATE_ALL_TIMEOUT_MS: u64 = 3 * 60 * 1_000;

/// Acknowledgement frame a successful rotate produces.
const ROTATE_ACK: [u8; 5] = [0x00, 0x5D, 0x00, 0xAA, 0x07];

/// Arguments naming just a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicArgs {
    /// Target client id.
    pub client_id: String,
}

/// Arguments addressing a cell by number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellArgs {
    /// Target client id.
    pub client_id: String,
    /// Cell number.
    pub number: u8,
}

/// Arguments for [`FamilyB::rotate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateArgs {
    /// Target client id.
    pub client_id: String,
    /// Cell number; doubles as the primary command byte.
    pub number: u8,
    /// Timeout in milliseconds; zero selects the default.
    #[serde(default)]
    pub timeout: u64,
}

/// Arguments for [`FamilyB::turn_on_refrigerator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefrigeratorArgs {
    /// Target client id.
    pub client_id: String,
    /// Setpoint in degrees.
    pub temperature: u8,
}

/// Reply of [`FamilyB::status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReply {
    /// Server wall-clock time when the reply was decoded.
    pub time: SystemTime,
    /// Measured cabinet temperature.
    pub actual_temperature: u8,
}

/// Operation surface for family B basic boards.
pub struct FamilyB<E: Environment = SystemEnv> {
    clients: Arc<ClientRegistry>,
    env: E,
}

impl FamilyB<SystemEnv> {
    /// Adapter over the given client registry, using the system clock.
    #[must_use]
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self::with_env(clients, SystemEnv::new())
    }
}

impl<E: Environment> FamilyB<E> {
    /// Adapter with an explicit environment.
    pub fn with_env(clients: Arc<ClientRegistry>, env: E) -> Self {
        Self { clients, env }
    }

    async fn call(
        &self,
        client_id: &str,
        primary: u8,
        secondary: u8,
        timeout_ms: u64,
    ) -> Result<Bytes, AdapterError> {
        let frame = family_b::encode_basic(primary, secondary);
        let replies = exchange(
            &self.env,
            &self.clients,
            Call::new(client_id, &frame, family_b::key::DEFAULT).timeout(timeout_ms),
        )
        .await?;
        replies.into_iter().next().ok_or(AdapterError::Timeout)
    }

    /// Connectivity check.
    pub async fn check(&self, args: &BasicArgs) -> Result<bool, AdapterError> {
        self.call(&args.client_id, opcode::CHECK, 0x55, QUICK_TIMEOUT_MS).await?;
        Ok(true)
    }

    /// Merge a cell with its neighbor (double-width slots).
    pub async fn merge_cells(&self, args: &CellArgs) -> Result<bool, AdapterError> {
        self.call(&args.client_id, opcode::MERGE, args.number, QUICK_TIMEOUT_MS).await?;
        Ok(true)
    }

    /// Undo a cell merge.
    pub async fn unmerge_cells(&self, args: &CellArgs) -> Result<bool, AdapterError> {
        self.call(&args.client_id, opcode::UNMERGE, args.number, QUICK_TIMEOUT_MS).await?;
        Ok(true)
    }

    /// Read the cabinet temperature.
    pub async fn status(&self, args: &BasicArgs) -> Result<StatusReply, AdapterError> {
        let reply = self.call(&args.client_id, opcode::STATUS, 0x55, QUICK_TIMEOUT_MS).await?;
        Ok(StatusReply {
            time: self.env.wall_clock(),
            actual_temperature: reply.get(2).copied().unwrap_or_default(),
        })
    }

    /// Rotate the motor behind a cell.
    ///
    /// Returns `true` only when the controller answers with the exact
    /// acknowledgement frame; any other reply means the motor did not
    /// complete its turn.
    pub async fn rotate(&self, args: &RotateArgs) -> Result<bool, AdapterError> {
        let reply = self.call(&args.client_id, args.number, 0xAA, args.timeout).await?;
        Ok(reply[..] == ROTATE_ACK)
    }

    /// Rotate every motor once (self test).
    pub async fn rotate_all(&self, args: &BasicArgs) -> Result<bool, AdapterError> {
        self.call(&args.client_id, opcode::ROTATE_ALL, 0x55, ROTATE_ALL_TIMEOUT_MS).await?;
        Ok(true)
    }

    /// Switch the heater on.
    pub async fn turn_on_heater(&self, args: &BasicArgs) -> Result<bool, AdapterError> {
        self.call(&args.client_id, opcode::HEATER, 0x01, QUICK_TIMEOUT_MS).await?;
        Ok(true)
    }

    /// Switch the heater off.
    pub async fn turn_off_heater(&self, args: &BasicArgs) -> Result<bool, AdapterError> {
        self.call(&args.client_id, opcode::HEATER, 0x00, QUICK_TIMEOUT_MS).await?;
        Ok(true)
    }

    /// Switch the cabinet lights on.
    pub async fn turn_on_lights(&self, args: &BasicArgs) -> Result<bool, AdapterError> {
        self.call(&args.client_id, opcode::LIGHTS, 0xAA, QUICK_TIMEOUT_MS).await?;
        Ok(true)
    }

    /// Switch the cabinet lights off.
    pub async fn turn_off_lights(&self, args: &BasicArgs) -> Result<bool, AdapterError> {
        self.call(&args.client_id, opcode::LIGHTS, 0x55, QUICK_TIMEOUT_MS).await?;
        Ok(true)
    }

    /// Start refrigeration: compressor, controller, then the setpoint.
    ///
    /// The three commands run sequentially and the first failure
    /// short-circuits the rest.
    pub async fn turn_on_refrigerator(&self, args: &RefrigeratorArgs) -> Result<(), AdapterError> {
        self.call(&args.client_id, opcode::REFRIGERATOR, 0x01, QUICK_TIMEOUT_MS).await?;
        self.call(&args.client_id, opcode::REFRIGERATOR_CONTROLLER, 0x01, QUICK_TIMEOUT_MS)
            .await?;
        self.call(&args.client_id, opcode::SETPOINT, args.temperature, QUICK_TIMEOUT_MS).await?;
        Ok(())
    }

    /// Stop refrigeration.
    pub async fn turn_off_refrigerator(&self, args: &BasicArgs) -> Result<bool, AdapterError> {
        self.call(&args.client_id, opcode::REFRIGERATOR, 0x00, QUICK_TIMEOUT_MS).await?;
        Ok(true)
    }
}
