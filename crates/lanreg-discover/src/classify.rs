//! Site and role classification from hostname and address patterns.
//!
//! Pure functions: every call starts from the same defaults, so the result
//! for one host never depends on which host was classified before it.

use std::net::Ipv4Addr;

use lanreg_core::types::{DEFAULT_GROUP, UNKNOWN_LOCATION};
use lanreg_core::Classification;

/// /24 networks → site name.
const SITES: [([u8; 3], &str); 4] = [
    ([192, 168, 1], "himki"),
    ([192, 168, 2], "klin"),
    ([192, 168, 0], "nekrasovka"),
    ([192, 168, 3], "noginsk"),
];

/// Hostname substring → group. Evaluated top to bottom with no early exit:
/// the last matching pattern decides the group.
const GROUP_PATTERNS: [(&str, &str); 13] = [
    ("light", "light"),
    ("ipcam", "ipcam"),
    ("hs", "sockets"),
    ("mpwr", "sockets"),
    ("uc", "unicontroller"),
    ("vacuum", "vacuum"),
    ("gw", "netdevice"),
    ("mikrotik", "netdevice"),
    ("ha", "home-assistant"),
    ("qnap", "qnap"),
    ("mqtt", "mqtt-server"),
    ("printer", "printer"),
    ("openhab", "openhab"),
];

/// Addresses whose DNS name is replaced before classification.
const HOSTNAME_OVERRIDES: [(Ipv4Addr, &str); 2] = [
    (Ipv4Addr::new(192, 168, 1, 4), "ha.hm.net"),
    (Ipv4Addr::new(192, 168, 0, 4), "mqtt-nkr.hm.net"),
];

/// Hosts in this class reject repeated probes; they are registered without
/// active TCP checks.
const PROBE_AVERSE_PATTERN: &str = "mpwr";

pub fn classify(hostname: &str, address: Ipv4Addr) -> Classification {
    let hostname = effective_hostname(hostname, address);
    Classification {
        location: location(address).to_string(),
        group: group(&hostname).to_string(),
        hostname,
    }
}

pub fn effective_hostname(hostname: &str, address: Ipv4Addr) -> String {
    HOSTNAME_OVERRIDES
        .iter()
        .find(|(addr, _)| *addr == address)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| hostname.to_string())
}

pub fn location(address: Ipv4Addr) -> &'static str {
    let [a, b, c, _] = address.octets();
    SITES
        .iter()
        .find(|(prefix, _)| *prefix == [a, b, c])
        .map(|(_, site)| *site)
        .unwrap_or(UNKNOWN_LOCATION)
}

pub fn group(hostname: &str) -> &'static str {
    GROUP_PATTERNS
        .iter()
        .filter(|(pattern, _)| hostname.contains(pattern))
        .last()
        .map(|(_, group)| *group)
        .unwrap_or(DEFAULT_GROUP)
}

pub fn is_probe_averse(hostname: &str) -> bool {
    hostname.contains(PROBE_AVERSE_PATTERN)
}
