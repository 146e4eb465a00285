//! Bounded-concurrency discovery engine.
//!
//! Spawns one tokio task per target. A single semaphore caps the number of
//! network probes in flight across all tasks; each task pings its target,
//! then walks the configured port lists one probe at a time, folding results
//! into a [`HostRecord`] it owns exclusively.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::Instrument;

use lanreg_core::{HostRecord, Target};

use crate::classify;
use crate::fingerprint::PortProbe;
use crate::liveness::LivenessProbe;

/// Ports checked on every live host.
#[derive(Debug, Clone, Default)]
pub struct ProbePlan {
    pub tcp_ports: Vec<u16>,
    pub http_ports: Vec<u16>,
}

/// What a discovery pass produced.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    /// Live hosts, in target order.
    pub hosts: Vec<HostRecord>,
    /// Tasks that reported back (alive or not).
    pub probed: usize,
    /// Tasks that panicked; counted as unreachable.
    pub failed_tasks: usize,
}

pub struct Discovery<L, P> {
    liveness: Arc<L>,
    ports: Arc<P>,
    plan: Arc<ProbePlan>,
    permits: Arc<Semaphore>,
}

impl<L, P> Discovery<L, P>
where
    L: LivenessProbe + 'static,
    P: PortProbe + 'static,
{
    pub fn new(liveness: L, ports: P, plan: ProbePlan, concurrency: usize) -> Self {
        Self {
            liveness: Arc::new(liveness),
            ports: Arc::new(ports),
            plan: Arc::new(plan),
            permits: Arc::new(Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS))),
        }
    }

    /// Probe every target and wait for all of them to report.
    pub async fn run(&self, targets: Vec<Target>) -> DiscoveryOutcome {
        let mut handles = Vec::with_capacity(targets.len());

        for target in targets {
            let liveness = self.liveness.clone();
            let ports = self.ports.clone();
            let plan = self.plan.clone();
            let permits = self.permits.clone();

            handles.push(tokio::spawn(
                async move { probe_host(target, liveness, ports, plan, permits).await }
                    .instrument(tracing::Span::current()),
            ));
        }

        let launched = handles.len();
        tracing::info!(targets = launched, "Discovery started");

        let mut outcome = DiscoveryOutcome::default();
        for handle in handles {
            match handle.await {
                Ok(Some(record)) => outcome.hosts.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Host probe task panicked");
                    outcome.failed_tasks += 1;
                }
            }
            outcome.probed += 1;
        }

        debug_assert_eq!(outcome.probed, launched);
        tracing::info!(
            probed = outcome.probed,
            alive = outcome.hosts.len(),
            failed_tasks = outcome.failed_tasks,
            "Discovery complete"
        );
        outcome
    }
}

/// Liveness then fingerprinting for one target. Each probe holds one permit
/// for its own duration only.
async fn probe_host<L, P>(
    target: Target,
    liveness: Arc<L>,
    ports: Arc<P>,
    plan: Arc<ProbePlan>,
    permits: Arc<Semaphore>,
) -> Option<HostRecord>
where
    L: LivenessProbe + ?Sized,
    P: PortProbe + ?Sized,
{
    let alive = {
        let _permit = permits.acquire().await.ok()?;
        liveness.is_alive(target.address).await
    };

    if !alive {
        tracing::info!(host = %target.hostname, address = %target.address, "Host is not alive");
        return None;
    }
    tracing::info!(host = %target.hostname, address = %target.address, "Host is alive");

    let mut record = HostRecord::new(target.clone());

    for &port in &plan.tcp_ports {
        let open = {
            let _permit = permits.acquire().await.ok()?;
            ports.tcp_check(&target, port).await
        };
        record.record_tcp(port, open);
    }

    for &port in &plan.http_ports {
        let result = {
            let _permit = permits.acquire().await.ok()?;
            ports.http_check(&target, port).await
        };
        record.record_http(port, result);
    }

    record.classification = classify::classify(&record.hostname, record.address);
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use lanreg_core::{ExporterKind, ProbeResult};

    struct FakeLiveness {
        alive: HashSet<Ipv4Addr>,
    }

    #[async_trait]
    impl LivenessProbe for FakeLiveness {
        async fn is_alive(&self, address: Ipv4Addr) -> bool {
            self.alive.contains(&address)
        }
    }

    /// Records which hosts were fingerprinted and tracks peak concurrency.
    #[derive(Default)]
    struct FakePorts {
        seen: Mutex<Vec<Ipv4Addr>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakePorts {
        async fn enter(&self, address: Ipv4Addr) {
            self.seen.lock().unwrap().push(address);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PortProbe for FakePorts {
        async fn tcp_check(&self, target: &Target, port: u16) -> bool {
            self.enter(target.address).await;
            port == 22
        }

        async fn http_check(&self, target: &Target, port: u16) -> ProbeResult {
            self.enter(target.address).await;
            match port {
                9100 => ProbeResult::Exporter(ExporterKind::Node),
                80 => ProbeResult::Open,
                _ => ProbeResult::Closed,
            }
        }
    }

    fn plan() -> ProbePlan {
        ProbePlan {
            tcp_ports: vec![21, 22],
            http_ports: vec![80, 9100, 9256],
        }
    }

    fn targets(n: u8) -> Vec<Target> {
        (1..=n)
            .map(|i| Target::from_address(Ipv4Addr::new(10, 0, 0, i)))
            .collect()
    }

    #[tokio::test]
    async fn test_dead_hosts_are_never_fingerprinted() {
        let alive: HashSet<_> = [Ipv4Addr::new(10, 0, 0, 2)].into_iter().collect();
        let discovery = Discovery::new(FakeLiveness { alive }, FakePorts::default(), plan(), 4);

        let outcome = discovery.run(targets(5)).await;

        assert_eq!(outcome.probed, 5);
        assert_eq!(outcome.hosts.len(), 1);
        let seen = discovery.ports.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 5); // 2 TCP + 3 HTTP for the live host only
        assert!(seen.iter().all(|a| *a == Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[tokio::test]
    async fn test_results_fold_into_host_record() {
        let alive: HashSet<_> = [Ipv4Addr::new(10, 0, 0, 1)].into_iter().collect();
        let discovery = Discovery::new(FakeLiveness { alive }, FakePorts::default(), plan(), 2);

        let outcome = discovery.run(targets(1)).await;
        let host = &outcome.hosts[0];

        assert_eq!(host.tcp_open_ports, vec![22]);
        assert_eq!(host.http_open_ports, vec![80, 9100]);
        assert_eq!(host.exporters.get(&ExporterKind::Node), Some(&9100));
        assert_eq!(host.classification.location, "unknown");
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_global() {
        let alive: HashSet<_> = targets(20).into_iter().map(|t| t.address).collect();
        let discovery = Discovery::new(FakeLiveness { alive }, FakePorts::default(), plan(), 3);

        let outcome = discovery.run(targets(20)).await;

        assert_eq!(outcome.hosts.len(), 20);
        let peak = discovery.ports.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight probes {peak} exceeded limit");
        assert!(peak > 1, "probes for different hosts should overlap");
    }

    #[tokio::test]
    async fn test_hosts_keep_target_order() {
        let alive: HashSet<_> = targets(10).into_iter().map(|t| t.address).collect();
        let discovery = Discovery::new(FakeLiveness { alive }, FakePorts::default(), plan(), 8);

        let outcome = discovery.run(targets(10)).await;
        let order: Vec<_> = outcome.hosts.iter().map(|h| h.address.octets()[3]).collect();
        assert_eq!(order, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_oversized_concurrency_is_capped() {
        let alive: HashSet<_> = targets(2).into_iter().map(|t| t.address).collect();
        let discovery =
            Discovery::new(FakeLiveness { alive }, FakePorts::default(), plan(), usize::MAX);

        assert_eq!(discovery.permits.available_permits(), Semaphore::MAX_PERMITS);
        assert_eq!(discovery.run(targets(2)).await.hosts.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_makes_progress() {
        let alive: HashSet<_> = targets(2).into_iter().map(|t| t.address).collect();
        let discovery = Discovery::new(FakeLiveness { alive }, FakePorts::default(), plan(), 0);
        assert_eq!(discovery.run(targets(2)).await.hosts.len(), 2);
    }
}
