//! Process configuration, loaded from the environment.

use std::env;
use std::time::Duration;

use crate::client::CloudApiConfig;
use crate::error::ConfigError;
use crate::reconcile::ReconcileOptions;
use crate::resolver::{FieldKeys, PolicyKeys};

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub cloudapi: CloudApiConfig,
    pub keys: PolicyKeys,
    pub dry_run: bool,
    pub concurrency: usize,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required Environment Variables
    /// - `TRITON_URL` (or `SDC_URL`) - CloudAPI base URL
    /// - `TRITON_ACCOUNT` (or `SDC_ACCOUNT`) - Account owning the instances
    ///
    /// # Optional Environment Variables
    /// - `TRITON_AUTH_TOKEN` - Bearer token forwarded on every request
    /// - `SNAPKEEPER_CONNECT_TIMEOUT_MS` - Connection timeout (default: 10000)
    /// - `SNAPKEEPER_REQUEST_TIMEOUT_MS` - Request timeout (default: 30000)
    /// - `SNAPKEEPER_FREQUENCY_KEY` - Metadata/tag key for the snapshot frequency
    /// - `SNAPKEEPER_MIN_SNAPSHOTS_KEY` - Metadata/tag key for the minimum count
    /// - `SNAPKEEPER_DRY_RUN` - Decide but do not mutate (default: false)
    /// - `SNAPKEEPER_CONCURRENCY` - Instances reconciled at once (default: 1)
    /// - `LOG_LEVEL` - Log filter when `RUST_LOG` is unset (default: "info")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|&key| lookup(key).filter(|v| !v.trim().is_empty()))
        };

        let url = first(&["TRITON_URL", "SDC_URL"])
            .ok_or_else(|| ConfigError::Missing("TRITON_URL (or SDC_URL) is required".into()))?;
        let account = first(&["TRITON_ACCOUNT", "SDC_ACCOUNT"]).ok_or_else(|| {
            ConfigError::Missing("TRITON_ACCOUNT (or SDC_ACCOUNT) is required".into())
        })?;
        let token = first(&["TRITON_AUTH_TOKEN"]);

        let connect_timeout_ms = parse_or(
            &lookup,
            "SNAPKEEPER_CONNECT_TIMEOUT_MS",
            DEFAULT_CONNECT_TIMEOUT_MS,
        )?;
        let request_timeout_ms = parse_or(
            &lookup,
            "SNAPKEEPER_REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT_MS,
        )?;

        let mut keys = PolicyKeys::default();
        if let Some(key) = first(&["SNAPKEEPER_FREQUENCY_KEY"]) {
            keys.frequency = FieldKeys::same(key);
        }
        if let Some(key) = first(&["SNAPKEEPER_MIN_SNAPSHOTS_KEY"]) {
            keys.min_snapshots = FieldKeys::same(key);
        }

        let dry_run = match lookup("SNAPKEEPER_DRY_RUN") {
            Some(v) => parse_bool("SNAPKEEPER_DRY_RUN", &v)?,
            None => false,
        };

        let concurrency: usize = parse_or(&lookup, "SNAPKEEPER_CONCURRENCY", 1)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid(
                "SNAPKEEPER_CONCURRENCY must be at least 1".into(),
            ));
        }

        let log_level = first(&["LOG_LEVEL"]).unwrap_or_else(|| "info".to_string());

        Ok(Self {
            cloudapi: CloudApiConfig {
                url,
                account,
                token,
                connect_timeout: Duration::from_millis(connect_timeout_ms),
                request_timeout: Duration::from_millis(request_timeout_ms),
            },
            keys,
            dry_run,
            concurrency,
            log_level,
        })
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            dry_run: self.dry_run,
            concurrency: self.concurrency,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid {key} '{v}': {e}"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid(format!("invalid {key} '{other}'"))),
    }
}
