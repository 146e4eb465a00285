//! Consul agent service-definition payload.
//!
//! Mirrors the JSON accepted by `PUT /v1/agent/service/register`. Built by
//! borrowing from a [`RegistrationEntry`]; nothing here is kept between calls.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use lanreg_core::{CheckProtocol, HealthCheck, RegistrationEntry};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDefinition<'a> {
    #[serde(rename = "ID")]
    pub id: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub tags: &'a [String],
    pub meta: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<AgentCheck<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentCheck<'a> {
    #[serde(rename = "CheckID")]
    pub check_id: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(rename = "TCP", skip_serializing_if = "Option::is_none")]
    pub tcp: Option<&'a str>,
    #[serde(rename = "HTTP", skip_serializing_if = "Option::is_none")]
    pub http: Option<&'a str>,
    pub interval: String,
    pub timeout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    pub failures_before_critical: u32,
    pub deregister_critical_service_after: String,
}

impl<'a> From<&'a RegistrationEntry> for ServiceDefinition<'a> {
    fn from(entry: &'a RegistrationEntry) -> Self {
        Self {
            id: &entry.id,
            name: &entry.name,
            address: entry.address.as_deref(),
            port: entry.port,
            tags: &entry.tags,
            meta: &entry.meta,
            check: entry.check.as_ref().map(AgentCheck::from),
        }
    }
}

impl<'a> From<&'a HealthCheck> for AgentCheck<'a> {
    fn from(check: &'a HealthCheck) -> Self {
        let (args, tcp, http, status) = match check.protocol {
            // Script check; starts passing so a fresh host is not critical
            // before its first interval elapses.
            CheckProtocol::Icmp => (
                vec!["ping".to_string(), "-c2".to_string(), check.target.clone()],
                None,
                None,
                Some("passing"),
            ),
            CheckProtocol::Tcp => (Vec::new(), Some(check.target.as_str()), None, None),
            CheckProtocol::Http => (Vec::new(), None, Some(check.target.as_str()), None),
        };

        Self {
            check_id: &check.id,
            name: &check.name,
            args,
            tcp,
            http,
            interval: consul_duration(check.interval),
            timeout: consul_duration(check.timeout),
            status,
            failures_before_critical: check.failures_before_critical,
            deregister_critical_service_after: consul_duration(check.deregister_after),
        }
    }
}

/// Render a duration in Consul notation using the largest whole unit.
pub fn consul_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if d.subsec_millis() != 0 {
        format!("{}ms", d.as_millis())
    } else if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanreg_core::registration::{DEREGISTER_AFTER, FAILURES_BEFORE_CRITICAL};
    use serde_json::{json, Value};

    fn check(protocol: CheckProtocol, target: &str) -> HealthCheck {
        HealthCheck {
            id: "check-1".to_string(),
            name: "Check one".to_string(),
            protocol,
            target: target.to_string(),
            interval: Duration::from_secs(300),
            timeout: Duration::from_secs(2),
            failures_before_critical: FAILURES_BEFORE_CRITICAL,
            deregister_after: DEREGISTER_AFTER,
        }
    }

    fn entry(check: Option<HealthCheck>) -> RegistrationEntry {
        RegistrationEntry {
            id: "svc-1".to_string(),
            name: "prometheus_svc".to_string(),
            address: None,
            port: None,
            tags: vec!["a".to_string(), "b".to_string()],
            meta: BTreeMap::from([("ip".to_string(), "10.0.0.5".to_string())]),
            check,
        }
    }

    fn to_json(entry: &RegistrationEntry) -> Value {
        serde_json::to_value(ServiceDefinition::from(entry)).unwrap()
    }

    #[test]
    fn test_consul_duration() {
        assert_eq!(consul_duration(Duration::from_secs(300)), "5m");
        assert_eq!(consul_duration(Duration::from_secs(2)), "2s");
        assert_eq!(consul_duration(Duration::from_secs(10)), "10s");
        assert_eq!(consul_duration(Duration::from_secs(48 * 3600)), "48h");
        assert_eq!(consul_duration(Duration::from_secs(90)), "90s");
        assert_eq!(consul_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(consul_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn test_icmp_check_is_ping_script() {
        let v = to_json(&entry(Some(check(CheckProtocol::Icmp, "10.0.0.5"))));
        let c = &v["Check"];
        assert_eq!(c["CheckID"], "check-1");
        assert_eq!(c["Args"], json!(["ping", "-c2", "10.0.0.5"]));
        assert_eq!(c["Status"], "passing");
        assert_eq!(c["Interval"], "5m");
        assert_eq!(c["Timeout"], "2s");
        assert_eq!(c["FailuresBeforeCritical"], 3);
        assert_eq!(c["DeregisterCriticalServiceAfter"], "48h");
        assert!(c.get("TCP").is_none());
        assert!(c.get("HTTP").is_none());
    }

    #[test]
    fn test_tcp_and_http_targets() {
        let tcp = to_json(&entry(Some(check(CheckProtocol::Tcp, "10.0.0.5:22"))));
        assert_eq!(tcp["Check"]["TCP"], "10.0.0.5:22");
        assert!(tcp["Check"].get("Args").is_none());
        assert!(tcp["Check"].get("Status").is_none());

        let http = to_json(&entry(Some(check(
            CheckProtocol::Http,
            "http://10.0.0.5:9100",
        ))));
        assert_eq!(http["Check"]["HTTP"], "http://10.0.0.5:9100");
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let v = to_json(&entry(None));
        assert_eq!(v["ID"], "svc-1");
        assert_eq!(v["Tags"], json!(["a", "b"]));
        assert_eq!(v["Meta"]["ip"], "10.0.0.5");
        assert!(v.get("Address").is_none());
        assert!(v.get("Port").is_none());
        assert!(v.get("Check").is_none());
    }

    #[test]
    fn test_bound_address_and_port() {
        let mut e = entry(None);
        e.address = Some("nas.hm.net".to_string());
        e.port = Some(9100);
        let v = to_json(&e);
        assert_eq!(v["Address"], "nas.hm.net");
        assert_eq!(v["Port"], 9100);
    }
}
