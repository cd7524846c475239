use crate::domain::jobs::StatusReport;
use async_trait::async_trait;
use std::error::Error;

/// How the status callback answered a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    /// The callback answered with a non-2xx status. The report reached it, so
    /// resending the same report cannot change the answer.
    Rejected { status: u16, body: String },
}

/// Delivers the worker's outcome to the status callback. `Err` means the
/// callback was never reached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn send(&self, report: &StatusReport) -> Result<Delivery, Box<dyn Error + Send + Sync>>;
}
