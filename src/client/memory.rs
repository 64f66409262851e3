use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::error::ClientError;
use crate::types::{Instance, Operation, Snapshot};

use super::CloudClient;

/// A mutation issued against an [`InMemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { instance_id: String },
    Delete { instance_id: String, snapshot: String },
}

#[derive(Default)]
struct State {
    instances: Vec<Instance>,
    snapshots: BTreeMap<String, Vec<Snapshot>>,
    failures: HashMap<(Operation, String), ClientError>,
    mutations: Vec<Mutation>,
    listings: HashMap<String, usize>,
    created: usize,
}

/// A cloud that lives in process memory.
///
/// Records every mutation and how often each instance's snapshots were
/// listed, and can be told to fail specific operations.
pub struct InMemoryClient {
    state: Mutex<State>,
    clock: DateTime<Utc>,
}

impl Default for InMemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock: Utc::now(),
        }
    }

    /// Timestamp given to snapshots created through this client.
    pub fn with_clock(mut self, clock: DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_instance(self, instance: Instance, snapshots: Vec<Snapshot>) -> Self {
        {
            let mut state = self.lock();
            state.snapshots.insert(instance.id.clone(), snapshots);
            state.instances.push(instance);
        }
        self
    }

    /// Make `operation` on `instance_id` fail with `err`. Use an empty id for
    /// [`Operation::ListInstances`].
    pub fn with_failure(
        self,
        operation: Operation,
        instance_id: impl Into<String>,
        err: ClientError,
    ) -> Self {
        self.lock()
            .failures
            .insert((operation, instance_id.into()), err);
        self
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    pub fn listing_count(&self, instance_id: &str) -> usize {
        self.lock().listings.get(instance_id).copied().unwrap_or(0)
    }

    /// Current snapshot names for `instance_id`, sorted.
    pub fn snapshot_names(&self, instance_id: &str) -> Vec<String> {
        self.lock()
            .snapshots
            .get(instance_id)
            .map(|snaps| snaps.iter().map(|s| s.name.clone()).sorted().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected(state: &State, operation: Operation, instance_id: &str) -> Result<(), ClientError> {
        match state.failures.get(&(operation, instance_id.to_string())) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CloudClient for InMemoryClient {
    async fn list_instances(&self) -> Result<Vec<Instance>, ClientError> {
        let state = self.lock();
        Self::injected(&state, Operation::ListInstances, "")?;
        Ok(state.instances.clone())
    }

    async fn list_snapshots(&self, instance_id: &str) -> Result<Vec<Snapshot>, ClientError> {
        let mut state = self.lock();
        *state.listings.entry(instance_id.to_string()).or_default() += 1;
        Self::injected(&state, Operation::ListSnapshots, instance_id)?;
        state
            .snapshots
            .get(instance_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("instance {instance_id}")))
    }

    async fn create_snapshot(&self, instance_id: &str) -> Result<(), ClientError> {
        let mut state = self.lock();
        Self::injected(&state, Operation::CreateSnapshot, instance_id)?;

        state.created += 1;
        let name = format!("snapshot-{:04}", state.created);
        let snapshot = Snapshot::new(name, self.clock);
        state
            .snapshots
            .get_mut(instance_id)
            .ok_or_else(|| ClientError::NotFound(format!("instance {instance_id}")))?
            .push(snapshot);
        state.mutations.push(Mutation::Create {
            instance_id: instance_id.to_string(),
        });
        Ok(())
    }

    async fn delete_snapshot(
        &self,
        instance_id: &str,
        snapshot_name: &str,
    ) -> Result<(), ClientError> {
        let mut state = self.lock();
        Self::injected(&state, Operation::DeleteSnapshot, instance_id)?;

        let snapshots = state
            .snapshots
            .get_mut(instance_id)
            .ok_or_else(|| ClientError::NotFound(format!("instance {instance_id}")))?;
        let before = snapshots.len();
        snapshots.retain(|s| s.name != snapshot_name);
        if snapshots.len() == before {
            return Err(ClientError::NotFound(format!(
                "snapshot {snapshot_name} of {instance_id}"
            )));
        }
        state.mutations.push(Mutation::Delete {
            instance_id: instance_id.to_string(),
            snapshot: snapshot_name.to_string(),
        });
        Ok(())
    }
}
