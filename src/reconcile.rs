//! One reconciliation pass over every instance.
//!
//! Instances are independent: each gets its own snapshot listing, evaluation
//! and mutations, and a failure on one never stops the others. Failures are
//! collected into the [`RunReport`] instead of being returned.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{error, info, warn};

use crate::client::CloudClient;
use crate::engine::DecisionEngine;
use crate::error::ClientError;
use crate::metrics::{InstancePhases, InstanceStats, MetricsSink, NoOpSink, RunStats, timed};
use crate::types::{
    ActionOutcome, ActionRecord, Failure, Instance, InstanceReport, Operation, RunReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Decide and report, but issue no create/delete calls.
    pub dry_run: bool,
    /// Instances reconciled at once; 1 processes them one after another.
    pub concurrency: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: 1,
        }
    }
}

enum Action<'a> {
    Create,
    Delete(&'a str),
}

impl Action<'_> {
    fn operation(&self) -> Operation {
        match self {
            Action::Create => Operation::CreateSnapshot,
            Action::Delete(_) => Operation::DeleteSnapshot,
        }
    }

    fn snapshot(&self) -> Option<&str> {
        match self {
            Action::Create => None,
            Action::Delete(name) => Some(*name),
        }
    }
}

pub struct Reconciler {
    client: Arc<dyn CloudClient>,
    engine: DecisionEngine,
    options: ReconcileOptions,
    sink: Arc<dyn MetricsSink>,
}

impl Reconciler {
    pub fn new(client: Arc<dyn CloudClient>, engine: DecisionEngine) -> Self {
        Self {
            client,
            engine,
            options: ReconcileOptions::default(),
            sink: Arc::new(NoOpSink),
        }
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub async fn run(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    /// Reconcile every instance, measuring snapshot ages against `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(now, self.options.dry_run);
        info!(
            event = "Run",
            phase = "Start",
            dry_run = self.options.dry_run,
            concurrency = self.options.concurrency
        );

        match self.client.list_instances().await {
            Ok(instances) => {
                info!(event = "Run", phase = "Instances", count = instances.len());
                report.instances = stream::iter(&instances)
                    .map(|instance| self.reconcile_instance(instance, now))
                    .buffer_unordered(self.options.concurrency.max(1))
                    .collect::<Vec<_>>()
                    .await
                    .into_iter()
                    .sorted_by(|a, b| a.instance_id.cmp(&b.instance_id))
                    .collect();
            }
            Err(err) => {
                error!(
                    event = "Run",
                    phase = "Instances",
                    operation = %Operation::ListInstances,
                    error = %err,
                    "failed to list instances"
                );
                report
                    .failures
                    .push(Failure::from_client_error(Operation::ListInstances, &err));
            }
        }

        let stats = RunStats {
            duration: started.elapsed(),
            instances: report.instances.len(),
            created: report.created_count(),
            deleted: report.deleted_count(),
            failures: report.failure_count(),
            success: report.is_success(),
        };
        info!(
            event = "Run",
            phase = "Done",
            instances = stats.instances,
            created = stats.created,
            deleted = stats.deleted,
            failures = stats.failures,
            success = stats.success,
            elapsed_ms = stats.duration.as_millis() as u64
        );
        self.sink.on_run(&stats);
        report
    }

    /// Reconcile a single instance from one fresh snapshot listing.
    pub async fn reconcile_instance(&self, instance: &Instance, now: DateTime<Utc>) -> InstanceReport {
        let mut report = InstanceReport::new(&instance.id, instance.name.clone());
        let mut phases = InstancePhases::default();

        let listing = timed(&mut phases.listing, self.client.list_snapshots(&instance.id)).await;
        let snapshots = match listing {
            Ok(snapshots) => snapshots,
            Err(err) => {
                record_failure(&mut report, instance, Operation::ListSnapshots, &err);
                self.emit_instance(&report, phases);
                return report;
            }
        };
        report.snapshot_count = Some(snapshots.len());

        let evaluation = timed(&mut phases.evaluation, async {
            self.engine.evaluate(instance, &snapshots, now)
        })
        .await;
        report.policy = evaluation.policy;
        report.warnings = evaluation.warnings;
        let decision = evaluation.decision;
        report.decision = Some(decision.clone());

        timed(&mut phases.dispatch, async {
            if decision.should_create {
                self.dispatch(instance, Action::Create, &mut report).await;
            }
            if let Some(name) = decision.delete.as_deref() {
                self.dispatch(instance, Action::Delete(name), &mut report).await;
            }
        })
        .await;

        self.emit_instance(&report, phases);
        report
    }

    async fn dispatch(&self, instance: &Instance, action: Action<'_>, report: &mut InstanceReport) {
        let operation = action.operation();
        let snapshot = action.snapshot().map(str::to_string);

        if self.options.dry_run {
            info!(
                event = "Dispatch",
                phase = "Planned",
                instance = %instance,
                operation = %operation,
                snapshot = ?snapshot,
                "dry run, not issuing"
            );
            report.actions.push(ActionRecord {
                operation,
                snapshot,
                outcome: ActionOutcome::Planned,
            });
            return;
        }

        let result = match action {
            Action::Create => self.client.create_snapshot(&instance.id).await,
            Action::Delete(name) => self.client.delete_snapshot(&instance.id, name).await,
        };

        let outcome = match result {
            Ok(()) => {
                info!(
                    event = "Dispatch",
                    phase = "Done",
                    instance = %instance,
                    operation = %operation,
                    snapshot = ?snapshot
                );
                ActionOutcome::Performed
            }
            Err(err) => {
                if record_failure(report, instance, operation, &err) {
                    ActionOutcome::Failed
                } else {
                    ActionOutcome::Vanished
                }
            }
        };
        report.actions.push(ActionRecord {
            operation,
            snapshot,
            outcome,
        });
    }

    fn emit_instance(&self, report: &InstanceReport, phases: InstancePhases) {
        let performed = |operation: Operation| {
            report
                .actions
                .iter()
                .any(|a| a.operation == operation && a.outcome == ActionOutcome::Performed)
        };
        self.sink.on_instance(&InstanceStats {
            instance_id: report.instance_id.clone(),
            snapshot_count: report.snapshot_count,
            created: performed(Operation::CreateSnapshot),
            deleted: performed(Operation::DeleteSnapshot),
            failures: report.failures.iter().filter(|f| f.fails_run()).count(),
            phases,
        });
    }
}

/// Log and record `err`; returns whether it fails the run.
fn record_failure(
    report: &mut InstanceReport,
    instance: &Instance,
    operation: Operation,
    err: &ClientError,
) -> bool {
    let failure = Failure::from_client_error(operation, err);
    let fails_run = failure.fails_run();
    if fails_run {
        error!(
            event = "Dispatch",
            phase = "Failed",
            instance = %instance,
            operation = %operation,
            error = %err
        );
    } else {
        warn!(
            event = "Dispatch",
            phase = "Vanished",
            instance = %instance,
            operation = %operation,
            error = %err,
            "target disappeared, nothing to do"
        );
    }
    report.failures.push(failure);
    fails_run
}
