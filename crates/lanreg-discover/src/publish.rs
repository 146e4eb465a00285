//! Registry publishing: write every registration, best-effort.

use lanreg_core::RegistrationEntry;
use lanreg_registry::RegistryPublisher;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub registered: usize,
    pub failed: usize,
}

/// Publish entries one by one, in order.
///
/// A rejected entry is logged and skipped; it never stops the entries
/// after it.
pub async fn publish_all<P>(publisher: &P, entries: &[RegistrationEntry]) -> PublishSummary
where
    P: RegistryPublisher + ?Sized,
{
    let mut summary = PublishSummary::default();

    for entry in entries {
        match publisher.register(entry).await {
            Ok(()) => {
                summary.registered += 1;
                tracing::info!(service_id = %entry.id, service = %entry.name, "Registration OK");
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!(
                    service_id = %entry.id,
                    service = %entry.name,
                    address = entry.meta.get("ip").map(String::as_str).unwrap_or_default(),
                    error = %e,
                    "Registration failed"
                );
            }
        }
    }

    if summary.failed > 0 {
        tracing::warn!(registered = summary.registered, failed = summary.failed, "Some registrations failed");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use lanreg_registry::RegistryError;

    /// Rejects any id listed in `reject`, records the rest.
    #[derive(Default)]
    struct FlakyRegistry {
        reject: Vec<String>,
        accepted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RegistryPublisher for FlakyRegistry {
        async fn register(&self, entry: &RegistrationEntry) -> Result<(), RegistryError> {
            if self.reject.contains(&entry.id) {
                return Err(RegistryError::Rejected {
                    id: entry.id.clone(),
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.accepted.lock().unwrap().push(entry.id.clone());
            Ok(())
        }
    }

    fn entry(id: &str) -> RegistrationEntry {
        RegistrationEntry {
            id: id.to_string(),
            name: "prometheus_blackbox_tcp_exporter".to_string(),
            address: None,
            port: None,
            tags: Vec::new(),
            meta: BTreeMap::from([("ip".to_string(), "10.0.0.5".to_string())]),
            check: None,
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_remaining_entries() {
        let registry = FlakyRegistry {
            reject: vec!["b".to_string()],
            ..Default::default()
        };
        let entries = vec![entry("a"), entry("b"), entry("c")];

        let summary = publish_all(&registry, &entries).await;

        assert_eq!(summary, PublishSummary { registered: 2, failed: 1 });
        assert_eq!(*registry.accepted.lock().unwrap(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_publish_through_trait_object() {
        let registry: Box<dyn RegistryPublisher> = Box::new(FlakyRegistry::default());
        let summary = publish_all(registry.as_ref(), &[entry("a")]).await;
        assert_eq!(summary.registered, 1);
    }
}
