//! Pluggable collection of reconciliation metrics.
//!
//! Implement [`MetricsSink`] to forward per-instance and per-run statistics
//! to whatever backend the deployment uses, and hand it to
//! [`crate::Reconciler::with_sink`]. Without one, a [`NoOpSink`] is used.
//!
//! ```ignore
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use snapkeeper::metrics::{InstanceStats, MetricsSink, RunStats};
//!
//! struct CreatedCounter(AtomicU64);
//!
//! impl MetricsSink for CreatedCounter {
//!     fn on_instance(&self, stats: &InstanceStats) {
//!         if stats.created {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn on_run(&self, _stats: &RunStats) {}
//! }
//! ```

use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Where the time went while reconciling one instance.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct InstancePhases {
    pub listing: Duration,
    pub evaluation: Duration,
    pub dispatch: Duration,
}

impl InstancePhases {
    pub fn total(&self) -> Duration {
        self.listing + self.evaluation + self.dispatch
    }
}

/// Await `fut`, adding its wall-clock time to one of the phase slots.
pub async fn timed<F: Future>(slot: &mut Duration, fut: F) -> F::Output {
    let start = Instant::now();
    let output = fut.await;
    *slot += start.elapsed();
    output
}

/// Emitted once per reconciled instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceStats {
    pub instance_id: String,
    pub snapshot_count: Option<usize>,
    /// A snapshot was created (not merely planned).
    pub created: bool,
    /// A snapshot was deleted (not merely planned).
    pub deleted: bool,
    pub failures: usize,
    pub phases: InstancePhases,
}

/// Emitted once at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub duration: Duration,
    pub instances: usize,
    pub created: usize,
    pub deleted: usize,
    pub failures: usize,
    pub success: bool,
}

/// Consumer of reconciliation metrics.
///
/// Called from concurrently running instance tasks, so implementations must
/// be thread-safe and should return quickly.
pub trait MetricsSink: Send + Sync {
    fn on_instance(&self, stats: &InstanceStats);

    fn on_run(&self, stats: &RunStats);
}

/// Drops everything.
#[derive(Debug, Default)]
pub struct NoOpSink;

impl MetricsSink for NoOpSink {
    fn on_instance(&self, _stats: &InstanceStats) {}
    fn on_run(&self, _stats: &RunStats) {}
}
