//! Port → service-name labels for log output.
//!
//! Nothing here affects probing or registration; a failed lookup only
//! downgrades the label to `unknown`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const UNKNOWN_SERVICE: &str = "unknown";

/// Monitoring ports that local service databases rarely know about.
fn well_known(port: u16) -> Option<&'static str> {
    match port {
        3000 => Some("grafana-server"),
        8123 => Some("home-assistant"),
        15672 => Some("rabbitMQ"),
        9256 => Some("process_exporter"),
        9100 | 9200 => Some("node_exporter"),
        9107 => Some("consul_exporter"),
        9219 => Some("ssl_exporter"),
        _ => None,
    }
}

/// A services database loaded once per run.
#[derive(Debug, Default)]
pub struct ServiceNames {
    by_port: HashMap<(u16, String), String>,
}

impl ServiceNames {
    /// Load an `/etc/services`-style file. An unreadable file yields an empty
    /// table.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => {
                let names = Self::parse(&contents);
                tracing::debug!(path = %path.display(), entries = names.by_port.len(), "Loaded services database");
                names
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Services database unavailable");
                Self::default()
            }
        }
    }

    /// Parse `name port/proto [aliases...] [# comment]` lines. The first
    /// entry for a port/protocol pair wins.
    pub fn parse(contents: &str) -> Self {
        let mut by_port = HashMap::new();
        for line in contents.lines() {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            let (Some(name), Some(port_proto)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Some((port, proto)) = port_proto.split_once('/') else {
                continue;
            };
            let Ok(port) = port.parse::<u16>() else {
                continue;
            };
            by_port
                .entry((port, proto.to_string()))
                .or_insert_with(|| name.to_string());
        }
        Self { by_port }
    }

    /// Label for `port/proto`: the fixed monitoring table first, then the
    /// database, then `unknown`.
    pub fn lookup(&self, port: u16, proto: &str) -> &str {
        if let Some(name) = well_known(port) {
            return name;
        }
        self.by_port
            .get(&(port, proto.to_string()))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SERVICE)
    }
}
