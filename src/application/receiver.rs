//! Status Receiver & fan-out.
//!
//! Turns one worker report into a persisted terminal status and a real-time
//! notification for the job's owner. Each call stands alone; replaying a
//! report converges on the same status and publishes again.

use crate::domain::jobs::{JobStatus, Notification, StatusReport};
use crate::ports::realtime::RealtimePort;
use crate::ports::repository::{JobRepository, NotificationRepository};
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// Event name on the real-time channel.
pub const STATUS_EVENT: &str = "statusUpdate";
pub const FALLBACK_MESSAGE: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("invalid report: {0}")]
    InvalidBody(String),
    #[error("failed to update job {unique_id}: {reason}")]
    UpdateFailed { unique_id: String, reason: String },
    #[error("no job matches uniqueId {0}")]
    JobNotFound(String),
    #[error("job {0} has no owner")]
    OwnerUnresolved(String),
    #[error("failed to notify user {user_id}: {reason}")]
    PublishFailed { user_id: String, reason: String },
}

impl ReceiverError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, ReceiverError::InvalidBody(_))
    }
}

/// What happened to the best-effort failure notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    Published { user_id: String },
    PublishFailed { user_id: String },
    /// No user was resolved, so there is no channel to publish on.
    Unroutable,
}

/// Validates a raw callback body and returns the typed report together with
/// the received payload, which is forwarded unchanged.
pub fn parse_report(body: &[u8]) -> Result<(StatusReport, Value), ReceiverError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| ReceiverError::InvalidBody(format!("body is not JSON: {}", e)))?;

    let missing: Vec<&str> = [
        ("success", payload.get("success")),
        ("message", payload.get("message")),
        ("data", payload.get("data")),
        ("data.uniqueId", payload.pointer("/data/uniqueId")),
        ("data.transcodedVideo", payload.pointer("/data/transcodedVideo")),
    ]
    .into_iter()
    .filter(|(_, v)| v.map_or(true, Value::is_null))
    .map(|(name, _)| name)
    .collect();

    if !missing.is_empty() {
        return Err(ReceiverError::InvalidBody(format!(
            "missing {}",
            missing.join(", ")
        )));
    }

    let report: StatusReport = serde_json::from_value(payload.clone())
        .map_err(|e| ReceiverError::InvalidBody(e.to_string()))?;
    Ok((report, payload))
}

pub struct StatusReceiver<J, N, P> {
    jobs: J,
    notifications: N,
    realtime: P,
}

impl<J, N, P> StatusReceiver<J, N, P>
where
    J: JobRepository,
    N: NotificationRepository,
    P: RealtimePort,
{
    pub fn new(jobs: J, notifications: N, realtime: P) -> Self {
        Self {
            jobs,
            notifications,
            realtime,
        }
    }

    /// Handles one callback body end to end.
    pub async fn handle(&self, body: &[u8]) -> Result<String, ReceiverError> {
        let (report, payload) = parse_report(body)?;

        let mut resolved_user: Option<String> = None;
        let result = self.apply(&report, &payload, &mut resolved_user).await;

        match &result {
            Ok(user_id) => {
                info!(%user_id, success = report.success, "status delivered");
            }
            // An unknown job never notifies anyone.
            Err(e @ ReceiverError::JobNotFound(_)) => warn!(error = %e, "status rejected"),
            Err(e) => {
                error!(error = %e, "status handling failed");
                self.fallback(resolved_user.as_deref(), &payload).await;
            }
        }
        result
    }

    async fn apply(
        &self,
        report: &StatusReport,
        payload: &Value,
        resolved_user: &mut Option<String>,
    ) -> Result<String, ReceiverError> {
        let unique_id = report
            .data
            .unique_id
            .as_deref()
            .ok_or_else(|| ReceiverError::InvalidBody("missing data.uniqueId".to_string()))?;

        let status = JobStatus::from_success(report.success);
        let video = &report.data.transcoded_video;
        let rendition = (report.success && !video.url.is_empty()).then_some(video);

        let record = self
            .jobs
            .update_status(unique_id, status, rendition)
            .await
            .map_err(|e| ReceiverError::UpdateFailed {
                unique_id: unique_id.to_string(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| ReceiverError::JobNotFound(unique_id.to_string()))?;

        let user_id = record
            .owner_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ReceiverError::OwnerUnresolved(unique_id.to_string()))?;
        *resolved_user = Some(user_id.clone());

        let notification = Notification::for_record(&user_id, &record);
        if let Err(e) = self.notifications.append(&notification).await {
            warn!(%user_id, %unique_id, error = %e, "failed to record notification history");
        }

        self.realtime
            .publish(&user_id, STATUS_EVENT, payload)
            .await
            .map_err(|e| ReceiverError::PublishFailed {
                user_id: user_id.clone(),
                reason: e.to_string(),
            })?;

        Ok(user_id)
    }

    /// Best-effort failure notice so the client is not left waiting.
    pub async fn fallback(&self, user_id: Option<&str>, payload: &Value) -> Fallback {
        let notice = json!({
            "success": false,
            "message": FALLBACK_MESSAGE,
            "data": payload.get("data").cloned().unwrap_or(Value::Null),
        });

        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            error!(target: "dead_letter", payload = %notice, "failure notice has no recipient");
            return Fallback::Unroutable;
        };

        match self.realtime.publish(user_id, STATUS_EVENT, &notice).await {
            Ok(()) => Fallback::Published {
                user_id: user_id.to_string(),
            },
            Err(e) => {
                error!(%user_id, error = %e, "failure notice could not be published");
                Fallback::PublishFailed {
                    user_id: user_id.to_string(),
                }
            }
        }
    }
}
