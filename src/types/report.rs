//! What a reconciliation run did, per instance and overall.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, IntoStaticStr};

use crate::error::{ClientError, ErrorKind, FormatError};

use super::decision::Decision;
use super::policy::EffectivePolicy;

/// Cloud operations issued by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListInstances,
    ListSnapshots,
    CreateSnapshot,
    DeleteSnapshot,
}

impl Operation {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Operation::CreateSnapshot | Operation::DeleteSnapshot)
    }
}

/// A failed cloud operation, with enough context to diagnose it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Failure {
    pub operation: Operation,
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn from_client_error(operation: Operation, err: &ClientError) -> Self {
        Self {
            operation,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Whether this failure marks the run as failed.
    ///
    /// `NotFound` on a create or delete means the target disappeared between
    /// listing and mutation, which is a no-op. Any listing failure counts.
    pub fn fails_run(&self) -> bool {
        !(self.kind == ErrorKind::NotFound && self.operation.is_mutation())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Performed,
    /// Dry run: the action was decided but not issued.
    Planned,
    /// The target was already gone.
    Vanished,
    Failed,
}

/// A mutation decided for an instance and what became of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRecord {
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    pub outcome: ActionOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceReport {
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    pub snapshot_count: Option<usize>,
    pub policy: EffectivePolicy,
    /// `None` when the snapshot listing could not be fetched.
    pub decision: Option<Decision>,
    pub actions: Vec<ActionRecord>,
    pub warnings: Vec<FormatError>,
    pub failures: Vec<Failure>,
}

impl InstanceReport {
    pub fn new(instance_id: impl Into<String>, instance_name: Option<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            instance_name,
            snapshot_count: None,
            policy: EffectivePolicy::default(),
            decision: None,
            actions: Vec::new(),
            warnings: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.iter().all(|f| !f.fails_run())
    }

    fn performed(&self, operation: Operation) -> usize {
        self.actions
            .iter()
            .filter(|a| a.operation == operation && a.outcome == ActionOutcome::Performed)
            .count()
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub instances: Vec<InstanceReport>,
    /// Failures not tied to a single instance.
    pub failures: Vec<Failure>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            started_at,
            dry_run,
            instances: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when no operation failed; this is what the exit status reflects.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.instances.iter().all(InstanceReport::is_success)
    }

    pub fn created_count(&self) -> usize {
        self.instances
            .iter()
            .map(|i| i.performed(Operation::CreateSnapshot))
            .sum()
    }

    pub fn deleted_count(&self) -> usize {
        self.instances
            .iter()
            .map(|i| i.performed(Operation::DeleteSnapshot))
            .sum()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
            + self
                .instances
                .iter()
                .flat_map(|i| &i.failures)
                .filter(|f| f.fails_run())
                .count()
    }

    pub fn instance(&self, instance_id: &str) -> Option<&InstanceReport> {
        self.instances.iter().find(|i| i.instance_id == instance_id)
    }
}
