//! Family Z adapter: locker cabinets with tagged frames.
//!
//! Cell operations (check, rotate, unlock) compose their correlation key
//! from the wall-clock frame tag and the cell coordinates, so concurrent
//! calls on different cells — or on the same cell a second apart — never
//! collide. The bulk `lookup` collects a burst of up to five cell replies
//! and treats a deadline with a partial collection as success.

use std::{sync::Arc, time::SystemTime};

use serde::{Deserialize, Serialize};
use vendframe_core::{AdapterError, Call, ClientRegistry, Environment, SystemEnv, exchange};
use vendframe_proto::family_z::{self, CabinetStatus, function, key};

use crate::wire_json::{ByteArray, Hex};

/// The controller answers a lookup with at most this many cell replies.
const LOOKUP_CAPACITY: usize = 5;

/// Arguments addressing a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellArgs {
    /// Target client id.
    pub client_id: String,
    /// Cell row.
    pub row: u8,
    /// Cell column.
    pub column: u8,
    /// Timeout in milliseconds; zero selects the default.
    #[serde(default)]
    pub timeout: u64,
}

/// Arguments for [`FamilyZ::lookup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupArgs {
    /// Target client id.
    pub client_id: String,
    /// Timeout in milliseconds; zero selects the default.
    #[serde(default)]
    pub timeout: u64,
}

/// Arguments for [`FamilyZ::status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusArgs {
    /// Target client id.
    pub client_id: String,
    /// Timeout in milliseconds; zero selects the default.
    #[serde(default)]
    pub timeout: u64,
}

/// Decoded cell reply.
#[derive(Debug, Clone, Serialize)]
pub struct CellReply {
    /// Raw reply frame as an integer array.
    pub bytes: ByteArray,
    /// Raw reply frame as upper-case hex.
    pub hex: Hex,
    /// Echoed frame tag.
    pub frame: u8,
    /// Echoed row.
    pub row: u8,
    /// Echoed column.
    pub column: u8,
    /// Operation duration as reported by the controller.
    pub duration: u8,
    /// Whether the controller reports success.
    pub success: bool,
}

impl CellReply {
    fn from_frame(frame: &[u8]) -> Result<Self, AdapterError> {
        let decoded = family_z::CellReply::parse(frame)?;
        Ok(Self {
            bytes: ByteArray::from(frame),
            hex: Hex::from(frame),
            frame: decoded.frame,
            row: decoded.row,
            column: decoded.column,
            duration: decoded.duration,
            success: decoded.success,
        })
    }
}

/// Reply of [`FamilyZ::lookup`].
#[derive(Debug, Clone, Serialize)]
pub struct LookupReply {
    /// Collected cell replies, in arrival order.
    pub replies: Vec<CellReply>,
}

/// Reply of [`FamilyZ::status`].
#[derive(Debug, Clone, Serialize)]
pub struct StatusReply {
    /// Server wall-clock time when the reply was decoded.
    pub time: SystemTime,
    /// Configured target temperature.
    pub expected_temperature: u8,
    /// Measured temperature.
    pub actual_temperature: u8,
    /// Whether the refrigerator is currently running.
    pub refrigerator_operating: bool,
}

/// Operation surface for family Z controllers.
pub struct FamilyZ<E: Environment = SystemEnv> {
    clients: Arc<ClientRegistry>,
    env: E,
}

impl FamilyZ<SystemEnv> {
    /// Adapter over the given client registry, using the system clock.
    #[must_use]
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self::with_env(clients, SystemEnv::new())
    }
}

impl<E: Environment> FamilyZ<E> {
    /// Adapter with an explicit environment.
    pub fn with_env(clients: Arc<ClientRegistry>, env: E) -> Self {
        Self { clients, env }
    }

    async fn cell_call(
        &self,
        args: &CellArgs,
        func: u8,
        stem: &str,
    ) -> Result<CellReply, AdapterError> {
        let tag = family_z::frame_tag(self.env.seconds_into_hour());
        let frame = family_z::encode(func, tag, &[args.row, args.column])?;
        let wait_key = family_z::cell_key(stem, tag, args.row, args.column);

        let replies = exchange(
            &self.env,
            &self.clients,
            Call::new(&args.client_id, &frame, &wait_key).timeout(args.timeout),
        )
        .await?;
        let first = replies.into_iter().next().ok_or(AdapterError::Timeout)?;
        CellReply::from_frame(&first)
    }

    /// Check a cell.
    pub async fn check(&self, args: &CellArgs) -> Result<CellReply, AdapterError> {
        self.cell_call(args, function::CHECK, key::CHECK).await
    }

    /// Rotate a cell motor.
    pub async fn rotate(&self, args: &CellArgs) -> Result<CellReply, AdapterError> {
        self.cell_call(args, function::ROTATE, key::ROTATE).await
    }

    /// Unlock a locker door.
    pub async fn unlock(&self, args: &CellArgs) -> Result<CellReply, AdapterError> {
        self.cell_call(args, function::UNLOCK, key::UNLOCK).await
    }

    /// Collect the controller's burst of pending cell replies.
    ///
    /// Returns up to five replies; a deadline that fires after at least one
    /// reply yields the partial collection rather than a timeout.
    pub async fn lookup(&self, args: &LookupArgs) -> Result<LookupReply, AdapterError> {
        let tag = family_z::frame_tag(self.env.seconds_into_hour());
        let frame = family_z::encode(function::LOOKUP, tag, &[0x01, 0x01])?;

        let collected = exchange(
            &self.env,
            &self.clients,
            Call::new(&args.client_id, &frame, key::LOOKUP)
                .timeout(args.timeout)
                .collect(LOOKUP_CAPACITY),
        )
        .await?;

        let replies = collected
            .iter()
            .map(|frame| CellReply::from_frame(frame))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LookupReply { replies })
    }

    /// Read cabinet temperatures and refrigerator state.
    pub async fn status(&self, args: &StatusArgs) -> Result<StatusReply, AdapterError> {
        let tag = family_z::frame_tag(self.env.seconds_into_hour());
        let frame = family_z::encode(function::STATUS, tag, &[0x02, 0x02])?;

        let replies = exchange(
            &self.env,
            &self.clients,
            Call::new(&args.client_id, &frame, key::STATUS).timeout(args.timeout),
        )
        .await?;
        let first = replies.into_iter().next().ok_or(AdapterError::Timeout)?;
        let decoded = CabinetStatus::parse(&first)?;

        Ok(StatusReply {
            time: self.env.wall_clock(),
            expected_temperature: decoded.expected_temperature,
            actual_temperature: decoded.actual_temperature,
            refrigerator_operating: decoded.refrigerator_operating,
        })
    }
}
