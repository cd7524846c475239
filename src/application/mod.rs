//! Application layer - Generic services that use ports.

#[cfg(feature = "orchestrator")]
pub mod orchestrator;

#[cfg(feature = "receiver")]
pub mod receiver;

#[cfg(feature = "worker")]
pub mod worker;
