//! Consul agent connection and shared registry client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

use lanreg_core::RegistrationEntry;

use crate::wire::ServiceDefinition;

const TOKEN_HEADER: &str = "x-consul-token";

/// Errors from registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry client error: {0}")]
    Client(String),

    #[error("Registry request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Registry rejected {id}: HTTP {status}: {body}")]
    Rejected { id: String, status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for connecting to a Consul agent.
///
/// Loaded from the `[registry]` config section or `LANREG_REGISTRY__`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Agent address, e.g. `http://consul.local:8500`. A bare `host:port`
    /// is treated as plain HTTP.
    #[serde(default = "default_address")]
    pub address: String,

    /// ACL token sent with every request.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub datacenter: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_address() -> String {
    "http://127.0.0.1:8500".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            token: None,
            datacenter: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Consul agent client. Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    datacenter: Option<String>,
}

impl RegistryClient {
    /// Build a client for the given agent. No request is made until the
    /// first registration.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value =
                HeaderValue::from_str(token).map_err(|e| RegistryError::Client(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(TOKEN_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| RegistryError::Client(e.to_string()))?;

        let base_url = normalize_address(&config.address);
        tracing::info!(address = %base_url, datacenter = ?config.datacenter, "Registry client ready");

        Ok(Self {
            http,
            base_url,
            datacenter: config.datacenter.clone().filter(|dc| !dc.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upsert a service (and its check) on the local agent.
    ///
    /// Re-registering an existing id replaces it.
    pub async fn register_service(&self, entry: &RegistrationEntry) -> Result<(), RegistryError> {
        let url = format!("{}/v1/agent/service/register", self.base_url);
        let mut request = self.http.put(url).json(&ServiceDefinition::from(entry));
        if let Some(dc) = &self.datacenter {
            request = request.query(&[("dc", dc)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Rejected {
                id: entry.id.clone(),
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        tracing::debug!(service_id = %entry.id, "Service registered");
        Ok(())
    }
}

fn normalize_address(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
