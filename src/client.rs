//! The cloud control plane, as seen by the reconciler.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::types::{Instance, Snapshot};

mod cloudapi;
mod memory;

pub use cloudapi::{CloudApiClient, CloudApiConfig};
pub use memory::{InMemoryClient, Mutation};

/// Compute API operations the reconciler needs.
///
/// Implementations are shared between concurrently reconciled instances, so
/// they must be `Send + Sync`.
#[async_trait]
pub trait CloudClient: Send + Sync {
    async fn list_instances(&self) -> Result<Vec<Instance>, ClientError>;

    async fn list_snapshots(&self, instance_id: &str) -> Result<Vec<Snapshot>, ClientError>;

    async fn create_snapshot(&self, instance_id: &str) -> Result<(), ClientError>;

    async fn delete_snapshot(&self, instance_id: &str, snapshot_name: &str)
    -> Result<(), ClientError>;
}
