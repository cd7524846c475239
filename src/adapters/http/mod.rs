//! HTTP adapters: outbound clients built on reqwest and the inbound callback API.

#[cfg(feature = "orchestrator")]
pub mod container_groups;
#[cfg(feature = "worker")]
pub mod reporter;
#[cfg(feature = "receiver")]
pub mod routes;
