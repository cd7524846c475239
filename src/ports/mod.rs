//! Ports - Trait definitions for every external collaborator.

pub mod compute;
pub mod queue;
pub mod realtime;
pub mod reporter;
pub mod repository;
pub mod sequence;
pub mod storage;
