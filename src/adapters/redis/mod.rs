//! Redis adapters.
//!
//! - `RealtimePort` over PUBLISH, one channel per user id
//! - `SlotSequence` over INCR, shared by every orchestrator replica

mod error;
mod pool;
#[cfg(feature = "receiver")]
mod realtime;
#[cfg(feature = "orchestrator")]
mod sequence;

pub use error::RedisAdapterError;
pub use pool::RedisPool;
#[cfg(feature = "orchestrator")]
pub use sequence::{RedisSlotSequence, SLOT_COUNTER_KEY};
