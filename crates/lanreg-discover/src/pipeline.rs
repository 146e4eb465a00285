//! A single discovery run: probe → classify → build → publish.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::Instrument;
use uuid::Uuid;

use lanreg_core::Target;
use lanreg_registry::RegistryPublisher;

use crate::fingerprint::PortProbe;
use crate::liveness::LivenessProbe;
use crate::orchestrator::Discovery;
use crate::publish::publish_all;
use crate::registration::build_all;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub targets: usize,
    pub alive: usize,
    pub entries: usize,
    pub registered: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Execute one full pass over `targets`. Probe and publish failures are
/// logged and counted, never returned. Every event of the pass, including
/// those from per-host tasks, is recorded inside a `run` span carrying the
/// run id.
pub async fn run_once<L, P, R>(
    discovery: &Discovery<L, P>,
    targets: Vec<Target>,
    publisher: &R,
) -> RunSummary
where
    L: LivenessProbe + 'static,
    P: PortProbe + 'static,
    R: RegistryPublisher + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", run_id = %run_id);
    run_inner(run_id, discovery, targets, publisher)
        .instrument(span)
        .await
}

async fn run_inner<L, P, R>(
    run_id: Uuid,
    discovery: &Discovery<L, P>,
    targets: Vec<Target>,
    publisher: &R,
) -> RunSummary
where
    L: LivenessProbe + 'static,
    P: PortProbe + 'static,
    R: RegistryPublisher + ?Sized,
{
    let started_at = Utc::now();
    let start = Instant::now();
    let target_count = targets.len();

    tracing::info!(run_id = %run_id, targets = target_count, "Discovery run started");

    let outcome = discovery.run(targets).await;
    let entries = build_all(&outcome.hosts);
    tracing::info!(
        run_id = %run_id,
        hosts = outcome.hosts.len(),
        entries = entries.len(),
        "Built service registrations"
    );

    let published = publish_all(publisher, &entries).await;

    let summary = RunSummary {
        run_id,
        started_at,
        targets: target_count,
        alive: outcome.hosts.len(),
        entries: entries.len(),
        registered: published.registered,
        failed: published.failed,
        elapsed: start.elapsed(),
    };

    tracing::info!(
        run_id = %summary.run_id,
        started_at = %summary.started_at.to_rfc3339(),
        targets = summary.targets,
        alive = summary.alive,
        entries = summary.entries,
        registered = summary.registered,
        failed = summary.failed,
        elapsed_secs = summary.elapsed.as_secs(),
        "Discovery run complete"
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    use async_trait::async_trait;
    use lanreg_core::{ProbeResult, RegistrationEntry};
    use lanreg_registry::RegistryError;
    use tracing_test::traced_test;

    use crate::orchestrator::ProbePlan;

    struct AlwaysAlive;

    #[async_trait]
    impl LivenessProbe for AlwaysAlive {
        async fn is_alive(&self, _address: Ipv4Addr) -> bool {
            true
        }
    }

    struct OnlySsh;

    #[async_trait]
    impl PortProbe for OnlySsh {
        async fn tcp_check(&self, _target: &Target, port: u16) -> bool {
            port == 22
        }

        async fn http_check(&self, _target: &Target, _port: u16) -> ProbeResult {
            ProbeResult::Closed
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl RegistryPublisher for AcceptAll {
        async fn register(&self, _entry: &RegistrationEntry) -> Result<(), RegistryError> {
            Ok(())
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_host_and_publish_events_carry_run_id() {
        let plan = ProbePlan {
            tcp_ports: vec![22],
            http_ports: vec![80],
        };
        let discovery = Discovery::new(AlwaysAlive, OnlySsh, plan, 2);
        let target = Target::from_address(Ipv4Addr::new(10, 0, 0, 7));

        let summary = run_once(&discovery, vec![target], &AcceptAll).await;
        assert_eq!(summary.registered, 2);

        let run_id = summary.run_id.to_string();
        logs_assert(|lines: &[&str]| {
            for message in ["Host is alive", "Registration OK"] {
                let tagged = lines
                    .iter()
                    .filter(|line| line.contains(message))
                    .all(|line| line.contains(&run_id));
                let present = lines.iter().any(|line| line.contains(message));
                if !(present && tagged) {
                    return Err(format!("'{message}' is missing run_id {run_id}"));
                }
            }
            Ok(())
        });
    }
}
