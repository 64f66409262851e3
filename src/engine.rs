use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::duration::{DurationParser, HumanDuration};
use crate::error::FormatError;
use crate::resolver::{PolicyKeys, resolve_policy};
use crate::types::{Decision, EffectivePolicy, Instance, RawPolicy, Snapshot};

/// Everything the engine concluded about one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub raw: RawPolicy,
    pub policy: EffectivePolicy,
    pub decision: Decision,
    pub warnings: Vec<FormatError>,
}

/// Resolves an instance's policy and decides what to do with its snapshots.
/// Cheap to clone and safe to share between concurrent instance tasks.
#[derive(Clone)]
pub struct DecisionEngine {
    keys: PolicyKeys,
    parser: Arc<dyn DurationParser>,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(PolicyKeys::default())
    }
}

impl DecisionEngine {
    pub fn new(keys: PolicyKeys) -> Self {
        Self {
            keys,
            parser: Arc::new(HumanDuration),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn DurationParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn keys(&self) -> &PolicyKeys {
        &self.keys
    }

    /// Evaluate one instance against a single snapshot listing.
    ///
    /// Both decisions are taken from the same `snapshots` slice.
    pub fn evaluate(
        &self,
        instance: &Instance,
        snapshots: &[Snapshot],
        now: DateTime<Utc>,
    ) -> Evaluation {
        let raw = resolve_policy(instance, &self.keys);
        debug!(
            event = "Evaluate",
            phase = "Resolved",
            instance = instance.id.as_str(),
            frequency = ?raw.frequency,
            min_snapshots = ?raw.min_snapshots
        );

        let (policy, warnings) = interpret(&raw, self.parser.as_ref());
        for warning in &warnings {
            warn!(
                event = "Evaluate",
                phase = "Policy",
                instance = instance.id.as_str(),
                error = %warning,
                "ignoring malformed policy value"
            );
        }

        let decision = decide(snapshots, &policy, now);
        debug!(
            event = "Evaluate",
            phase = "Decision",
            instance = instance.id.as_str(),
            snapshots = snapshots.len(),
            policy = %policy,
            decision = %decision
        );

        Evaluation {
            raw,
            policy,
            decision,
            warnings,
        }
    }
}

/// Turn resolved policy strings into typed values. A value that does not
/// parse leaves its field absent and is returned as a warning.
pub fn interpret(raw: &RawPolicy, parser: &dyn DurationParser) -> (EffectivePolicy, Vec<FormatError>) {
    let mut warnings = Vec::new();

    let min_interval = raw
        .frequency
        .as_deref()
        .and_then(|text| parser.parse(text).map_err(|e| warnings.push(e)).ok());
    let min_retained = raw
        .min_snapshots
        .as_deref()
        .and_then(|text| parse_count(text).map_err(|e| warnings.push(e)).ok());

    (
        EffectivePolicy {
            min_interval,
            min_retained,
        },
        warnings,
    )
}

pub fn parse_count(text: &str) -> Result<usize, FormatError> {
    text.trim()
        .parse::<usize>()
        .map_err(|e| FormatError::Count {
            input: text.to_string(),
            reason: e.to_string(),
        })
}

/// Time since the freshest snapshot, or `None` when there are none.
pub fn snapshot_age(snapshots: &[Snapshot], now: DateTime<Utc>) -> Option<TimeDelta> {
    snapshots
        .iter()
        .map(|s| s.created)
        .max()
        .map(|latest| now - latest)
}

/// Whether a new snapshot is due.
///
/// Without a configured interval nothing is ever created. With one, an
/// instance without snapshots always gets one, otherwise the freshest
/// snapshot must be strictly older than the interval.
pub fn decide_create(snapshots: &[Snapshot], policy: &EffectivePolicy, now: DateTime<Utc>) -> bool {
    let Some(min_interval) = policy.min_interval else {
        return false;
    };
    match snapshot_age(snapshots, now) {
        None => true,
        Some(age) => age > min_interval,
    }
}

/// The single snapshot to prune this run, if any.
///
/// Only the lexicographically first name is ever returned, however large the
/// excess over `min_retained` is.
pub fn decide_delete(snapshots: &[Snapshot], policy: &EffectivePolicy) -> Option<String> {
    let min_retained = policy.min_retained?;
    if snapshots.len() <= min_retained {
        return None;
    }
    snapshots
        .iter()
        .map(|s| s.name.as_str())
        .min()
        .map(str::to_string)
}

pub fn decide(snapshots: &[Snapshot], policy: &EffectivePolicy, now: DateTime<Utc>) -> Decision {
    Decision {
        should_create: decide_create(snapshots, policy, now),
        delete: decide_delete(snapshots, policy),
    }
}

#[cfg(test)]
mod tests;
