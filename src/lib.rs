//! Ladder - adaptive-bitrate transcode pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (events, dispatch, slots, renditions, hls, jobs)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (aws, http, redis, memory)
//! - application/: Generic services
//! - av/: Encoder process boundary
//! - config: Environment configuration
//!
//! # Features
//! - `orchestrator`: queue poller that dispatches compute slots
//! - `worker`: multi-resolution HLS encoder run inside a slot
//! - `receiver`: status callback API and real-time fan-out
//! - `full`: All features

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(feature = "worker")]
pub mod av;

#[cfg(feature = "orchestrator")]
pub use config::OrchestratorConfig;

#[cfg(feature = "receiver")]
pub use config::ReceiverConfig;

#[cfg(feature = "worker")]
pub use config::WorkerConfig;
