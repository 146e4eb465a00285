//! ICMP liveness checks.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, PingIdentifier, PingSequence};

/// Decides whether an address is worth fingerprinting.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_alive(&self, address: Ipv4Addr) -> bool;
}

/// Echo-request prober backed by a shared raw ICMP socket.
///
/// If the socket cannot be opened (usually missing `CAP_NET_RAW`), every
/// address is reported as not alive.
pub struct IcmpProber {
    client: Option<Client>,
    count: u16,
    timeout: Duration,
    next_ident: AtomicU16,
}

impl IcmpProber {
    /// Must be called from within a tokio runtime.
    pub fn new(count: u16, timeout: Duration) -> Self {
        let client = match Client::new(&Config::default()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot open ICMP socket, all hosts will be treated as down");
                None
            }
        };
        Self {
            client,
            count: count.max(1),
            timeout,
            next_ident: AtomicU16::new(std::process::id() as u16),
        }
    }
}

#[async_trait]
impl LivenessProbe for IcmpProber {
    async fn is_alive(&self, address: Ipv4Addr) -> bool {
        let Some(client) = &self.client else {
            return false;
        };

        let ident = PingIdentifier(self.next_ident.fetch_add(1, Ordering::Relaxed));
        let mut pinger = client.pinger(IpAddr::V4(address), ident).await;
        pinger.timeout(self.timeout);

        let payload = [0u8; 56];
        let mut replies = 0u16;
        for seq in 0..self.count {
            match pinger.ping(PingSequence(seq), &payload).await {
                Ok((_, rtt)) => {
                    replies += 1;
                    tracing::debug!(address = %address, seq, rtt_ms = rtt.as_millis() as u64, "Echo reply");
                }
                Err(e) => {
                    tracing::debug!(address = %address, seq, error = %e, "No echo reply");
                }
            }
        }

        replies > 0
    }
}
