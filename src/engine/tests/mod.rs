use chrono::TimeZone;

use super::*;
use crate::resolver::{FREQUENCY_KEY, MIN_SNAPSHOTS_KEY};

mod delete;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A snapshot created `age` before [`now`].
fn snap(name: &str, age: TimeDelta) -> Snapshot {
    Snapshot::new(name, now() - age)
}

fn snaps_named(names: &[&str]) -> Vec<Snapshot> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| snap(name, TimeDelta::hours(i as i64 + 1)))
        .collect()
}

fn policy(interval: Option<TimeDelta>, retained: Option<usize>) -> EffectivePolicy {
    EffectivePolicy {
        min_interval: interval,
        min_retained: retained,
    }
}
