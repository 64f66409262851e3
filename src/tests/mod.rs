//! End-to-end reconciliation runs against an in-memory cloud.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::client::InMemoryClient;
use crate::engine::DecisionEngine;
use crate::reconcile::{ReconcileOptions, Reconciler};
use crate::resolver::{FREQUENCY_KEY, MIN_SNAPSHOTS_KEY};
use crate::types::{Instance, RunReport, Snapshot};

mod scenarios;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn snap(name: &str, age: TimeDelta) -> Snapshot {
    Snapshot::new(name, now() - age)
}

/// Snapshots named `names`, each an hour older than the previous.
fn snaps_named(names: &[&str]) -> Vec<Snapshot> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| snap(name, TimeDelta::hours(i as i64 + 1)))
        .collect()
}

fn cloud() -> InMemoryClient {
    InMemoryClient::new().with_clock(now())
}

fn reconciler(client: &Arc<InMemoryClient>, options: ReconcileOptions) -> Reconciler {
    Reconciler::new(client.clone(), DecisionEngine::default()).with_options(options)
}

async fn run(client: &Arc<InMemoryClient>) -> RunReport {
    reconciler(client, ReconcileOptions::default())
        .run_at(now())
        .await
}

/// An instance that wants an hourly snapshot and keeps at least two.
fn hourly(id: &str) -> Instance {
    Instance::new(id)
        .with_tag(FREQUENCY_KEY, "1h")
        .with_tag(MIN_SNAPSHOTS_KEY, "2")
}
