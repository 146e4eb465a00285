//! Per-port TCP and HTTP checks with exporter fingerprinting.
//!
//! A TCP check is a bare connect. An HTTP check issues a single GET without
//! following redirects and matches the response body against a fixed,
//! ordered signature list; the first match wins.

use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::time::timeout;

use lanreg_core::{ExporterKind, ProbeResult, Target};

use crate::error::Result;
use crate::services::ServiceNames;

/// Body markers, in priority order.
const BODY_SIGNATURES: [(&str, ExporterKind); 4] = [
    ("Node Exporter", ExporterKind::Node),
    ("Consul Exporter", ExporterKind::Consul),
    ("Process Exporter", ExporterKind::Process),
    ("SSL Exporter", ExporterKind::Ssl),
];

/// Services identified by port alone, checked after every body marker.
const PORT_SIGNATURES: [(u16, ExporterKind); 2] = [
    (15672, ExporterKind::RabbitMq),
    (8428, ExporterKind::VictoriaMetrics),
];

/// First signature matching a response from `port`, if any.
pub fn match_signature(port: u16, body: &str) -> Option<ExporterKind> {
    BODY_SIGNATURES
        .iter()
        .find(|(marker, _)| body.contains(marker))
        .map(|(_, kind)| *kind)
        .or_else(|| {
            PORT_SIGNATURES
                .iter()
                .find(|(p, _)| *p == port)
                .map(|(_, kind)| *kind)
        })
}

/// URL scheme for HTTP checks; `https` only when configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Port-level checks against a single live host.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// `true` if a TCP connection to the port succeeds.
    async fn tcp_check(&self, target: &Target, port: u16) -> bool;

    /// Any HTTP response (redirects included) counts as open.
    async fn http_check(&self, target: &Target, port: u16) -> ProbeResult;
}

/// Network-backed [`PortProbe`].
pub struct NetProber {
    http: reqwest::Client,
    timeout: Duration,
    scheme: Scheme,
    services: Arc<ServiceNames>,
}

impl NetProber {
    pub fn new(timeout: Duration, scheme: Scheme, services: Arc<ServiceNames>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            timeout,
            scheme,
            services,
        })
    }

    fn url(&self, target: &Target, port: u16) -> String {
        format!("{}://{}:{}", self.scheme.as_str(), target.address, port)
    }

    fn log_found(&self, target: &Target, port: u16) {
        let service = self.services.lookup(port, "tcp");
        tracing::info!(
            service = %service.to_uppercase(),
            host = %target.hostname,
            port,
            "Service {} found on {}:{}",
            service,
            target.hostname,
            port
        );
    }
}

#[async_trait]
impl PortProbe for NetProber {
    async fn tcp_check(&self, target: &Target, port: u16) -> bool {
        let addr = SocketAddr::V4(SocketAddrV4::new(target.address, port));
        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => {
                self.log_found(target, port);
                true
            }
            Ok(Err(e)) => {
                tracing::debug!(host = %target.hostname, port, error = %e, "TCP connect failed");
                false
            }
            Err(_elapsed) => {
                tracing::debug!(host = %target.hostname, port, "TCP connect timed out");
                false
            }
        }
    }

    async fn http_check(&self, target: &Target, port: u16) -> ProbeResult {
        let url = self.url(target, port);
        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(host = %target.hostname, url = %url, error = %e, "HTTP probe failed");
                return ProbeResult::Closed;
            }
        };

        self.log_found(target, port);

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(host = %target.hostname, url = %url, error = %e, "Failed to read HTTP body");
                String::new()
            }
        };

        match match_signature(port, &body) {
            Some(kind) => {
                tracing::info!(host = %target.hostname, port, exporter = %kind, "Found exporter endpoint");
                ProbeResult::Exporter(kind)
            }
            None => {
                tracing::debug!(host = %target.hostname, port, status = status.as_u16(), "Plain HTTP endpoint");
                ProbeResult::Open
            }
        }
    }
}
