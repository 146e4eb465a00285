//! Core domain types for LAN host discovery.
//!
//! A [`Target`] is probed for liveness; every live target becomes a
//! [`HostRecord`] that accumulates [`ProbeResult`]s and is then annotated
//! with a [`Classification`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

// ── Targets ───────────────────────────────────────────────────────

/// A candidate host drawn from a CIDR range or a DNS zone dump.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Target {
    pub hostname: String,
    pub address: Ipv4Addr,
}

impl Target {
    pub fn new(hostname: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            hostname: hostname.into(),
            address,
        }
    }

    /// A target with no DNS name; the dotted address doubles as the hostname.
    pub fn from_address(address: Ipv4Addr) -> Self {
        Self {
            hostname: address.to_string(),
            address,
        }
    }
}

// ── Exporters ─────────────────────────────────────────────────────

/// Known monitoring agents that can be fingerprinted on an HTTP port.
///
/// Declaration order is the order exporter registrations are emitted in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExporterKind {
    #[serde(rename = "node_exporter")]
    Node,
    #[serde(rename = "process_exporter")]
    Process,
    #[serde(rename = "consul_exporter")]
    Consul,
    #[serde(rename = "ssl_exporter")]
    Ssl,
    #[serde(rename = "rabbitmq")]
    RabbitMq,
    #[serde(rename = "victoriametrics")]
    VictoriaMetrics,
}

impl ExporterKind {
    pub const ALL: [ExporterKind; 6] = [
        Self::Node,
        Self::Process,
        Self::Consul,
        Self::Ssl,
        Self::RabbitMq,
        Self::VictoriaMetrics,
    ];

    /// Identifier used in service ids, names, tags and job metadata.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Node => "node_exporter",
            Self::Process => "process_exporter",
            Self::Consul => "consul_exporter",
            Self::Ssl => "ssl_exporter",
            Self::RabbitMq => "rabbitmq",
            Self::VictoriaMetrics => "victoriametrics",
        }
    }

    /// Scrape job name written into registration metadata.
    pub fn job(&self) -> String {
        format!("consul_{}_autodiscovery", self.mode())
    }
}

impl fmt::Display for ExporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mode())
    }
}

// ── Probe results ─────────────────────────────────────────────────

/// Outcome of a single port/protocol check. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// Connection refused, timed out, or host unreachable.
    Closed,
    /// Port answered but carried no known signature.
    Open,
    /// Port answered and was identified as a monitoring exporter.
    Exporter(ExporterKind),
}

impl ProbeResult {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn exporter(&self) -> Option<ExporterKind> {
        match self {
            Self::Exporter(kind) => Some(*kind),
            _ => None,
        }
    }
}

// ── Classification ────────────────────────────────────────────────

pub const UNKNOWN_LOCATION: &str = "unknown";
pub const DEFAULT_GROUP: &str = "server";

/// Location and role tags derived from a host's name and address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    /// Name the host is registered under. Usually the DNS name, but some
    /// addresses are pinned to a fixed name.
    pub hostname: String,
    pub location: String,
    pub group: String,
}

impl Classification {
    pub fn unclassified(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            location: UNKNOWN_LOCATION.to_string(),
            group: DEFAULT_GROUP.to_string(),
        }
    }
}

// ── Host records ──────────────────────────────────────────────────

/// Everything learned about one live host during a discovery run.
///
/// Owned by the task probing that host until probing completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostRecord {
    pub hostname: String,
    pub address: Ipv4Addr,
    pub tcp_open_ports: Vec<u16>,
    pub http_open_ports: Vec<u16>,
    /// At most one port per exporter kind; a later match replaces an earlier one.
    pub exporters: BTreeMap<ExporterKind, u16>,
    /// Every port that resolved to an exporter kind, including replaced ones.
    pub exporter_ports: BTreeSet<u16>,
    pub classification: Classification,
}

impl HostRecord {
    pub fn new(target: Target) -> Self {
        let classification = Classification::unclassified(&target.hostname);
        Self {
            hostname: target.hostname,
            address: target.address,
            tcp_open_ports: Vec::new(),
            http_open_ports: Vec::new(),
            exporters: BTreeMap::new(),
            exporter_ports: BTreeSet::new(),
            classification,
        }
    }

    pub fn record_tcp(&mut self, port: u16, open: bool) {
        if open {
            self.tcp_open_ports.push(port);
        }
    }

    pub fn record_http(&mut self, port: u16, result: ProbeResult) {
        if !result.is_open() {
            return;
        }
        self.http_open_ports.push(port);
        if let Some(kind) = result.exporter() {
            self.exporter_ports.insert(port);
            self.exporters.insert(kind, port);
        }
    }

    /// HTTP ports that never resolved to an exporter kind.
    pub fn generic_http_ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.http_open_ports
            .iter()
            .copied()
            .filter(|port| !self.exporter_ports.contains(port))
    }
}
