//! lanreg-registry: Consul client for lanreg service registrations.
//!
//! Every registration the discovery pipeline produces is written through the
//! [`RegistryPublisher`] seam. [`RegistryClient`] talks to a Consul agent;
//! [`DryRunPublisher`] prints the entries instead.

pub mod client;
pub mod publisher;
pub mod wire;

pub use client::{RegistryClient, RegistryConfig, RegistryError};
pub use publisher::{DryRunPublisher, RegistryPublisher};
