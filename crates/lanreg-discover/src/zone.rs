//! DNS zone enumeration via an external zone-transfer tool.
//!
//! Runs `host -al -tA <domain>` as a child process via
//! `tokio::process::Command` and collects the A records it prints.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use tokio::process::Command;

use crate::error::{DiscoverError, Result};

/// Wrapper around the zone-transfer binary.
pub struct ZoneResolver {
    tool_path: String,
}

impl ZoneResolver {
    pub fn new(tool_path: &str) -> Self {
        Self {
            tool_path: tool_path.to_string(),
        }
    }

    /// Transfer `domain` and return its hostname → address map.
    pub async fn resolve(&self, domain: &str) -> Result<BTreeMap<String, Ipv4Addr>> {
        tracing::info!(domain = %domain, tool = %self.tool_path, "Requesting zone transfer");

        let output = Command::new(&self.tool_path)
            .arg("-al")
            .arg("-tA")
            .arg(domain)
            .output()
            .await
            .map_err(|e| DiscoverError::ZoneToolNotFound {
                path: format!("{}: {e}", self.tool_path),
            })?;

        if !output.status.success() {
            return Err(DiscoverError::ZoneTransferFailed {
                domain: domain.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let zone = parse_zone_listing(&String::from_utf8_lossy(&output.stdout));
        tracing::info!(domain = %domain, records = zone.len(), "Zone transfer complete");
        Ok(zone)
    }
}

/// Extract `<name>. <ttl> IN A <address>` records from a zone listing.
pub fn parse_zone_listing(listing: &str) -> BTreeMap<String, Ipv4Addr> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .filter_map(parse_a_record)
        .collect()
}

fn parse_a_record(line: &str) -> Option<(String, Ipv4Addr)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [name, .., rtype, address] = fields.as_slice() else {
        return None;
    };
    if fields.len() < 4 || *rtype != "A" {
        return None;
    }
    let address: Ipv4Addr = address.parse().ok()?;
    let name = name.trim_end_matches('.');
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), address))
}
