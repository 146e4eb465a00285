//! Registry-bound service and health-check descriptions.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Consecutive failures before a check turns critical.
pub const FAILURES_BEFORE_CRITICAL: u32 = 3;

/// How long a critical service stays registered before the registry drops it.
pub const DEREGISTER_AFTER: Duration = Duration::from_secs(48 * 60 * 60);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CheckProtocol {
    Icmp,
    Tcp,
    Http,
}

impl CheckProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icmp => "icmp",
            Self::Tcp => "tcp",
            Self::Http => "http",
        }
    }
}

/// An active health check attached to a registration.
///
/// `target` is the bare address for ICMP, `address:port` for TCP and a full
/// URL for HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheck {
    pub id: String,
    pub name: String,
    pub protocol: CheckProtocol,
    pub target: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub failures_before_critical: u32,
    pub deregister_after: Duration,
}

/// One service registration, upserted by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub tags: Vec<String>,
    pub meta: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<HealthCheck>,
}
