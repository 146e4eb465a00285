//! lanreg-core: Shared types for the lanreg discovery pipeline.
//!
//! This crate provides the values that flow between pipeline stages:
//! - Probe targets and per-host probe results
//! - The fixed set of monitoring exporter kinds
//! - Host records with their location/group classification
//! - Registry-bound registration entries and health checks

pub mod registration;
pub mod types;

pub use registration::{CheckProtocol, HealthCheck, RegistrationEntry};
pub use types::{Classification, ExporterKind, HostRecord, ProbeResult, Target};
