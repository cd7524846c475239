use crate::domain::slots::{SlotSpec, SlotStatus};
use async_trait::async_trait;
use std::error::Error;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComputePort: Send + Sync {
    /// Current state of a slot; `Absent` when the compute layer does not know it.
    async fn slot_status(&self, slot_name: &str)
        -> Result<SlotStatus, Box<dyn Error + Send + Sync>>;

    /// Create or replace the slot described by `spec`. Returns once the slot
    /// is deployed, or errors if deployment fails.
    async fn dispatch(&self, spec: &SlotSpec) -> Result<(), Box<dyn Error + Send + Sync>>;
}
