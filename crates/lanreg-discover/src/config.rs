//! Configuration for the lanreg-discover pipeline.

use std::time::Duration;

use serde::Deserialize;

use lanreg_registry::RegistryConfig;

use crate::error::Result;
use crate::fingerprint::Scheme;

/// Top-level discover configuration.
///
/// Loaded from `lanreg.toml` `[discover]` section or
/// `LANREG_DISCOVER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Maximum probes (ICMP, TCP or HTTP) in flight across all hosts.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Ports checked with a plain TCP connect.
    #[serde(default = "default_tcp_ports")]
    pub tcp_ports: Vec<u16>,

    /// Ports checked with an HTTP GET and exporter fingerprinting.
    #[serde(default = "default_http_ports")]
    pub http_ports: Vec<u16>,

    /// Timeout for a single TCP connect, HTTP request or ICMP echo.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// ICMP echoes sent per address.
    #[serde(default = "default_ping_count")]
    pub ping_count: u16,

    /// Services database in `/etc/services` format, used for log labels only.
    #[serde(default = "default_services_db")]
    pub services_db: String,

    /// Zone transfer tool invoked as `<tool> -al -tA <domain>`.
    #[serde(default = "default_zone_tool")]
    pub zone_tool: String,

    /// Scheme used for HTTP checks (`http` or `https`).
    #[serde(default)]
    pub scheme: Scheme,
}

impl DiscoverConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn default_concurrency() -> usize {
    14
}

/// FTP, SSH, MQTT, MySQL, PostgreSQL, Redis.
fn default_tcp_ports() -> Vec<u16> {
    vec![21, 22, 1883, 3306, 5432, 6379]
}

/// Web UIs plus every exporter port: node (9100, 9200), process (9256),
/// consul (9107), VictoriaMetrics (8428), ssl (9219), RabbitMQ (15672).
fn default_http_ports() -> Vec<u16> {
    vec![80, 9100, 9200, 8123, 3000, 9256, 9107, 8428, 9219, 15672]
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_ping_count() -> u16 {
    2
}

fn default_services_db() -> String {
    "/etc/services".to_string()
}

fn default_zone_tool() -> String {
    "host".to_string()
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            tcp_ports: default_tcp_ports(),
            http_ports: default_http_ports(),
            probe_timeout_ms: default_probe_timeout_ms(),
            ping_count: default_ping_count(),
            services_db: default_services_db(),
            zone_tool: default_zone_tool(),
            scheme: Scheme::default(),
        }
    }
}

/// Load the `[discover]` and `[registry]` sections.
///
/// Sources, lowest priority first: defaults, `<file_prefix>.toml` (optional),
/// `LANREG_*` environment variables with `__` as the section separator.
/// A missing section yields its defaults; a malformed one is an error.
pub fn load(file_prefix: &str) -> Result<(DiscoverConfig, RegistryConfig)> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("LANREG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let discover = section_or_default(&cfg, "discover")?;
    let registry = section_or_default(&cfg, "registry")?;
    Ok((discover, registry))
}

fn section_or_default<T>(cfg: &config::Config, key: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match cfg.get::<T>(key) {
        Ok(section) => Ok(section),
        Err(config::ConfigError::NotFound(_)) => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}
