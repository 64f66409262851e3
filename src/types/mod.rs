//! Data model for a reconciliation run.
//!
//! - [`Instance`] and [`Snapshot`] are read-only views of cloud state, fetched
//!   fresh on every run.
//! - [`RawPolicy`] holds the resolved but uninterpreted policy strings;
//!   [`EffectivePolicy`] is their typed form.
//! - [`Decision`] is the per-instance outcome of the decision engine.
//! - [`RunReport`] and friends describe what a run did.

mod decision;
mod instance;
mod policy;
mod report;
mod snapshot;

pub use decision::Decision;
pub use instance::Instance;
pub use policy::{EffectivePolicy, RawPolicy};
pub use report::{ActionOutcome, ActionRecord, Failure, InstanceReport, Operation, RunReport};
pub use snapshot::Snapshot;
