//! HTTP client for a Triton-style CloudAPI.
//!
//! Request signing is not done here. A pre-issued bearer token is forwarded
//! when configured; otherwise the endpoint is expected to authenticate the
//! caller by other means (e.g. a signing proxy).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;
use crate::types::{Instance, Snapshot};

use super::CloudClient;

const PAGE_SIZE: usize = 1000;
const ACCEPT_VERSION: &str = "~9||~8";

#[derive(Debug, Clone)]
pub struct CloudApiConfig {
    /// Base URL, e.g. `https://us-east-1.api.example.com`.
    pub url: String,
    pub account: String,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

pub struct CloudApiClient {
    http: reqwest::Client,
    base: Url,
    account: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MachineWire {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
    #[serde(default)]
    tags: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SnapshotWire {
    name: String,
    created: DateTime<Utc>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Tag values may be strings, numbers or booleans; policy wants strings.
fn stringify_values(values: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    values
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k, s)),
            other => Some((k, other.to_string())),
        })
        .collect()
}

impl From<MachineWire> for Instance {
    fn from(m: MachineWire) -> Self {
        Instance {
            id: m.id,
            name: m.name,
            metadata: stringify_values(m.metadata),
            tags: stringify_values(m.tags),
        }
    }
}

impl From<SnapshotWire> for Snapshot {
    fn from(s: SnapshotWire) -> Self {
        Snapshot {
            name: s.name,
            created: s.created,
            state: s.state,
        }
    }
}

/// Map a non-success response onto the client error taxonomy.
pub(crate) fn error_from_response(status: StatusCode, body: &str) -> ClientError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let detail = if parsed.message.is_empty() {
        body.trim().to_string()
    } else {
        parsed.message
    };

    match parsed.code.as_str() {
        "ResourceNotFound" => ClientError::NotFound(detail),
        "QuotaExceeded" => ClientError::Quota(detail),
        _ if status == StatusCode::NOT_FOUND => ClientError::NotFound(detail),
        _ => ClientError::Transport(format!("HTTP {status}: {detail}")),
    }
}

impl CloudApiClient {
    pub fn new(config: &CloudApiConfig) -> Result<Self, ClientError> {
        let base = Url::parse(&config.url)
            .map_err(|e| ClientError::Transport(format!("invalid url '{}': {e}", config.url)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Transport(format!(
                "invalid url '{}': not a base url",
                config.url
            )));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base,
            account: config.account.clone(),
            token: config.token.clone(),
        })
    }

    /// `{base}/{account}/{segments...}` with every segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.account).extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self
            .http
            .request(method, url)
            .header("Accept", "application/json")
            .header("Accept-Version", ACCEPT_VERSION);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ClientError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }
}

#[async_trait]
impl CloudClient for CloudApiClient {
    async fn list_instances(&self) -> Result<Vec<Instance>, ClientError> {
        let mut instances = Vec::new();
        let mut offset = 0;
        loop {
            let mut url = self.endpoint(&["machines"]);
            url.query_pairs_mut()
                .append_pair("limit", &PAGE_SIZE.to_string())
                .append_pair("offset", &offset.to_string());

            let page: Vec<MachineWire> = self
                .send(self.request(Method::GET, url))
                .await?
                .json()
                .await?;
            let count = page.len();
            debug!(event = "CloudApi", phase = "ListInstances", offset, count);

            instances.extend(page.into_iter().map(Instance::from));
            if count < PAGE_SIZE {
                break;
            }
            offset += count;
        }
        Ok(instances)
    }

    async fn list_snapshots(&self, instance_id: &str) -> Result<Vec<Snapshot>, ClientError> {
        let url = self.endpoint(&["machines", instance_id, "snapshots"]);
        let snapshots: Vec<SnapshotWire> = self
            .send(self.request(Method::GET, url))
            .await?
            .json()
            .await?;
        Ok(snapshots.into_iter().map(Snapshot::from).collect())
    }

    async fn create_snapshot(&self, instance_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["machines", instance_id, "snapshots"]);
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }

    async fn delete_snapshot(
        &self,
        instance_id: &str,
        snapshot_name: &str,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["machines", instance_id, "snapshots", snapshot_name]);
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
