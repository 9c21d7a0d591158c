//! Family A adapter: spiral-rack dispensers.
//!
//! The controller knows a single operation, rotating a cell motor. The
//! correlation key is dynamic (`rotate-<row>-<column>`) so distinct cells
//! can be in flight concurrently over the same line.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vendframe_core::{AdapterError, Call, ClientRegistry, Environment, SystemEnv, exchange};
use vendframe_proto::family_a;

/// Arguments for [`FamilyA::rotate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateArgs {
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

/// Operation surface for family A controllers.
pub struct FamilyA<E: Environment = SystemEnv> {
    clients: Arc<ClientRegistry>,
    env: E,
}

impl FamilyA<SystemEnv> {
    /// Adapter over the given client registry, using the system clock.
    #[must_use]
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self::with_env(clients, SystemEnv::new())
    }
}

impl<E: Environment> FamilyA<E> {
    /// Adapter with an explicit environment.
    pub fn with_env(clients: Arc<ClientRegistry>, env: E) -> Self {
        Self { clients, env }
    }

    /// Rotate the motor behind a cell.
    ///
    /// Returns `true` once the controller acknowledges the rotation.
    pub async fn rotate(&self, args: &RotateArgs) -> Result<bool, AdapterError> {
        let tag = family_a::frame_tag(self.env.seconds_into_hour());
        let frame = family_a::encode(family_a::FUNC_ROTATE, tag, &[args.row, args.column])?;
        let key = family_a::rotate_key(args.row, args.column);

        exchange(
            &self.env,
            &self.clients,
            Call::new(&args.client_id, &frame, &key).timeout(args.timeout),
        )
        .await?;
        Ok(true)
    }
}
