//! Resolved snapshot policy, before and after interpretation.

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Policy strings after tag/metadata precedence has been applied, not yet parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawPolicy {
    pub frequency: Option<String>,
    pub min_snapshots: Option<String>,
}

impl RawPolicy {
    pub fn is_empty(&self) -> bool {
        self.frequency.is_none() && self.min_snapshots.is_none()
    }
}

/// Typed snapshot policy for one instance.
///
/// Absent fields mean "no constraint of that kind": no automatic creation
/// without `min_interval`, no pruning without `min_retained`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EffectivePolicy {
    #[serde(rename = "min_interval_ms", with = "opt_millis", default)]
    pub min_interval: Option<TimeDelta>,
    pub min_retained: Option<usize>,
}

impl EffectivePolicy {
    pub fn is_unconfigured(&self) -> bool {
        self.min_interval.is_none() && self.min_retained.is_none()
    }
}

impl Display for EffectivePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.min_interval {
            Some(interval) => write!(f, "interval={}s", interval.num_seconds())?,
            None => write!(f, "interval=none")?,
        }
        match self.min_retained {
            Some(count) => write!(f, " retain={count}"),
            None => write!(f, " retain=none"),
        }
    }
}

mod opt_millis {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<TimeDelta>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(delta) => s.serialize_some(&delta.num_milliseconds()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TimeDelta>, D::Error> {
        let millis = Option::<i64>::deserialize(d)?;
        Ok(millis.and_then(TimeDelta::try_milliseconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_policy_display() {
        let policy = EffectivePolicy {
            min_interval: Some(TimeDelta::hours(1)),
            min_retained: Some(3),
        };
        assert_eq!(policy.to_string(), "interval=3600s retain=3");
        assert_eq!(
            EffectivePolicy::default().to_string(),
            "interval=none retain=none"
        );
    }

    #[test]
    fn test_effective_policy_serialization() {
        let policy = EffectivePolicy {
            min_interval: Some(TimeDelta::minutes(90)),
            min_retained: None,
        };
        insta::assert_json_snapshot!(policy, @r#"
        {
          "min_interval_ms": 5400000,
          "min_retained": null
        }
        "#);

        let back: EffectivePolicy =
            serde_json::from_value(serde_json::to_value(policy).unwrap()).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_unconfigured() {
        assert!(EffectivePolicy::default().is_unconfigured());
        assert!(RawPolicy::default().is_empty());
        let raw = RawPolicy {
            frequency: None,
            min_snapshots: Some("2".into()),
        };
        assert!(!raw.is_empty());
    }
}
