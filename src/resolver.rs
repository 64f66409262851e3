//! Merge snapshot policy from instance metadata and tags.
//!
//! Each policy field is looked up in both namespaces independently. When both
//! carry a value the tag wins; when neither does the field is absent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Instance, RawPolicy};

pub const FREQUENCY_KEY: &str = "edu.msu.matrix:snapshotfrequency";
pub const MIN_SNAPSHOTS_KEY: &str = "edu.msu.matrix:minsnapshots";

/// Where to look for one policy field in each namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldKeys {
    pub metadata: String,
    pub tag: String,
}

impl FieldKeys {
    /// Same key in both namespaces.
    pub fn same(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            metadata: key.clone(),
            tag: key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyKeys {
    pub frequency: FieldKeys,
    pub min_snapshots: FieldKeys,
}

impl Default for PolicyKeys {
    fn default() -> Self {
        Self {
            frequency: FieldKeys::same(FREQUENCY_KEY),
            min_snapshots: FieldKeys::same(MIN_SNAPSHOTS_KEY),
        }
    }
}

/// Look up one field, preferring the tag namespace.
///
/// Presence is all that matters here: an empty string is still a value.
pub fn resolve<'a>(
    metadata: &'a BTreeMap<String, String>,
    tags: &'a BTreeMap<String, String>,
    metadata_key: &str,
    tag_key: &str,
) -> Option<&'a str> {
    tags.get(tag_key)
        .or_else(|| metadata.get(metadata_key))
        .map(String::as_str)
}

/// Resolve every policy field for `instance`.
pub fn resolve_policy(instance: &Instance, keys: &PolicyKeys) -> RawPolicy {
    let field = |keys: &FieldKeys| {
        resolve(&instance.metadata, &instance.tags, &keys.metadata, &keys.tag).map(str::to_string)
    };
    RawPolicy {
        frequency: field(&keys.frequency),
        min_snapshots: field(&keys.min_snapshots),
    }
}
