//! Adapters - Concrete implementations of ports.

pub mod aws;
pub mod http;
pub mod memory;
#[cfg(any(feature = "orchestrator", feature = "receiver"))]
pub mod redis;
