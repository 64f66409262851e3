// src/lib.rs
pub use client::{CloudApiClient, CloudApiConfig, CloudClient, InMemoryClient, Mutation};
pub use config::Config;
pub use duration::{DurationParser, HumanDuration, parse_duration};
pub use engine::{DecisionEngine, Evaluation};
pub use error::{ClientError, ConfigError, ErrorKind, FormatError};
pub use reconcile::{ReconcileOptions, Reconciler};
pub use resolver::{FieldKeys, PolicyKeys, resolve, resolve_policy};
pub use types::*;

pub mod client;
pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod reconcile;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod tests;
