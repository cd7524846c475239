//! Domain layer - Pure business logic.

pub mod dispatch;
pub mod events;
pub mod hls;
pub mod jobs;
pub mod rendition;
pub mod slots;
