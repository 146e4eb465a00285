//! Map host records to service registrations.
//!
//! Every entry is built from scratch for the call that produces it; nothing
//! is shared or mutated between entries, hosts, or runs.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use lanreg_core::registration::{DEREGISTER_AFTER, FAILURES_BEFORE_CRITICAL};
use lanreg_core::{CheckProtocol, ExporterKind, HealthCheck, HostRecord, RegistrationEntry};

use crate::classify;

pub const CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const ICMP_TIMEOUT: Duration = Duration::from_secs(2);
pub const PORT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Registrations for one host, in emission order: ICMP, TCP ports, plain
/// HTTP ports, exporters.
pub fn build_registrations(record: &HostRecord) -> Vec<RegistrationEntry> {
    let mut entries = Vec::with_capacity(
        1 + record.tcp_open_ports.len() + record.http_open_ports.len(),
    );

    entries.push(icmp_entry(record));
    for &port in &record.tcp_open_ports {
        entries.push(port_entry(record, port, CheckProtocol::Tcp));
    }
    for port in record.generic_http_ports() {
        entries.push(port_entry(record, port, CheckProtocol::Http));
    }
    for (&kind, &port) in &record.exporters {
        entries.push(exporter_entry(record, kind, port));
    }

    entries
}

/// Registrations for a whole run. An id already emitted earlier in the run
/// is dropped.
pub fn build_all(records: &[HostRecord]) -> Vec<RegistrationEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for record in records {
        for entry in build_registrations(record) {
            if seen.insert(entry.id.clone()) {
                entries.push(entry);
            } else {
                tracing::debug!(service_id = %entry.id, address = %record.address, "Skipping duplicate registration");
            }
        }
    }

    entries
}

fn icmp_entry(record: &HostRecord) -> RegistrationEntry {
    let host = &record.classification.hostname;
    let address = record.address.to_string();

    RegistrationEntry {
        id: format!("icmp_{host}"),
        name: "prometheus_blackbox_icmp_exporter".to_string(),
        address: None,
        port: None,
        tags: vec![format!("icmp:{host}"), "prometheus-icmp".to_string()],
        meta: meta(record, "consul_blackbox_icmp_autodiscovery", "icmp-check"),
        check: Some(HealthCheck {
            id: format!("icmp_{host}"),
            name: format!("Ping test: {host}"),
            protocol: CheckProtocol::Icmp,
            target: address,
            interval: CHECK_INTERVAL,
            timeout: ICMP_TIMEOUT,
            failures_before_critical: FAILURES_BEFORE_CRITICAL,
            deregister_after: DEREGISTER_AFTER,
        }),
    }
}

/// Blackbox TCP or HTTP check for one port.
fn port_entry(record: &HostRecord, port: u16, protocol: CheckProtocol) -> RegistrationEntry {
    let host = &record.classification.hostname;
    let mode = protocol.as_str();
    let target = match protocol {
        CheckProtocol::Http => format!("http://{}:{port}", record.address),
        _ => format!("{}:{port}", record.address),
    };

    let check = (!classify::is_probe_averse(host)).then(|| HealthCheck {
        id: format!("{mode}_check_{host}_{port}"),
        name: format!("{} test: {host} [{port}]", mode.to_uppercase()),
        protocol,
        target,
        interval: CHECK_INTERVAL,
        timeout: PORT_CHECK_TIMEOUT,
        failures_before_critical: FAILURES_BEFORE_CRITICAL,
        deregister_after: DEREGISTER_AFTER,
    });

    RegistrationEntry {
        id: format!("{mode}_{host}_{port}"),
        name: format!("prometheus_blackbox_{mode}_exporter"),
        address: None,
        port: None,
        tags: vec![format!("{mode}:{host}:{port}"), format!("prometheus-{mode}")],
        meta: meta(
            record,
            &format!("consul_blackbox_{mode}_autodiscovery"),
            &format!("{mode}-check"),
        ),
        check,
    }
}

/// Directly scrapeable exporter: address and port are bound on the entry.
fn exporter_entry(record: &HostRecord, kind: ExporterKind, port: u16) -> RegistrationEntry {
    let host = &record.classification.hostname;
    let mode = kind.mode();

    RegistrationEntry {
        id: format!("{mode}_{host}"),
        name: format!("prometheus_{mode}"),
        address: Some(host.clone()),
        port: Some(port),
        tags: vec![mode.to_string(), format!("prometheus-{mode}")],
        meta: meta(record, &kind.job(), mode),
        check: Some(HealthCheck {
            id: format!("{mode}_check_{host}_{port}"),
            name: format!("{mode} test: {host} [{port}]"),
            protocol: CheckProtocol::Http,
            target: format!("http://{}:{port}", record.address),
            interval: CHECK_INTERVAL,
            timeout: PORT_CHECK_TIMEOUT,
            failures_before_critical: FAILURES_BEFORE_CRITICAL,
            deregister_after: DEREGISTER_AFTER,
        }),
    }
}

fn meta(record: &HostRecord, job: &str, service: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("job".to_string(), job.to_string()),
        ("service".to_string(), service.to_string()),
        (
            "location".to_string(),
            record.classification.location.clone(),
        ),
        ("group".to_string(), record.classification.group.clone()),
        ("ip".to_string(), record.address.to_string()),
    ])
}
