use async_trait::async_trait;
use std::error::Error;

/// Monotonic counter used to name compute slots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlotSequence: Send + Sync {
    async fn current(&self) -> Result<u64, Box<dyn Error + Send + Sync>>;

    /// Move to the next value and return it.
    async fn advance(&self) -> Result<u64, Box<dyn Error + Send + Sync>>;
}
