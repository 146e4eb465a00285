//! The registry write seam.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;

use lanreg_core::RegistrationEntry;

use crate::client::{RegistryClient, RegistryError};

/// Accepts registration entries and performs the registry write.
#[async_trait]
pub trait RegistryPublisher: Send + Sync {
    async fn register(&self, entry: &RegistrationEntry) -> Result<(), RegistryError>;
}

#[async_trait]
impl RegistryPublisher for RegistryClient {
    async fn register(&self, entry: &RegistrationEntry) -> Result<(), RegistryError> {
        self.register_service(entry).await
    }
}

/// Writes each entry as one JSON line instead of contacting a registry.
pub struct DryRunPublisher<W> {
    out: Mutex<W>,
}

impl DryRunPublisher<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> DryRunPublisher<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<W: Write + Send> RegistryPublisher for DryRunPublisher<W> {
    async fn register(&self, entry: &RegistrationEntry) -> Result<(), RegistryError> {
        let line = serde_json::to_string(entry)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| RegistryError::Client("dry-run output lock poisoned".to_string()))?;
        writeln!(out, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entry(id: &str) -> RegistrationEntry {
        RegistrationEntry {
            id: id.to_string(),
            name: "prometheus_blackbox_icmp_exporter".to_string(),
            address: None,
            port: None,
            tags: vec!["prometheus-icmp".to_string()],
            meta: BTreeMap::new(),
            check: None,
        }
    }

    #[tokio::test]
    async fn test_dry_run_writes_json_lines() {
        let publisher = DryRunPublisher::new(Vec::new());
        publisher.register(&entry("icmp_a")).await.unwrap();
        publisher.register(&entry("icmp_b")).await.unwrap();

        let out = String::from_utf8(publisher.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: RegistrationEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, entry("icmp_a"));
    }
}
