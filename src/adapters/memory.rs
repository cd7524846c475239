//! In-process fallbacks for deployments without Redis.

use crate::ports::sequence::SlotSequence;
use async_trait::async_trait;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local slot counter. Restarts begin again at `start`.
#[derive(Debug)]
pub struct MemorySequence {
    value: AtomicU64,
}

impl MemorySequence {
    pub fn new(start: u64) -> Self {
        Self {
            value: AtomicU64::new(start),
        }
    }
}

#[async_trait]
impl SlotSequence for MemorySequence {
    async fn current(&self) -> Result<u64, Box<dyn Error + Send + Sync>> {
        Ok(self.value.load(Ordering::SeqCst))
    }

    async fn advance(&self) -> Result<u64, Box<dyn Error + Send + Sync>> {
        Ok(self.value.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
