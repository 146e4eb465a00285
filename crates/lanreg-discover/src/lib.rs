//! lanreg-discover: LAN host discovery for the Consul service registry.
//!
//! Pings every candidate address, fingerprints the open ports of live hosts,
//! classifies them by site and role, and publishes one registration per
//! check to Consul.

pub mod classify;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod liveness;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod publish;
pub mod registration;
pub mod services;
pub mod targets;
pub mod zone;
