//! Inbound HTTP surface of the status receiver.

use crate::application::receiver::StatusReceiver;
use crate::ports::realtime::RealtimePort;
use crate::ports::repository::{JobRepository, NotificationRepository};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const UPDATE_STATUS_PATH: &str = "/api/webhooks/update-status";

pub fn router<J, N, P>(receiver: Arc<StatusReceiver<J, N, P>>) -> Router
where
    J: JobRepository + 'static,
    N: NotificationRepository + 'static,
    P: RealtimePort + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route(UPDATE_STATUS_PATH, post(update_status::<J, N, P>))
        .with_state(receiver)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn update_status<J, N, P>(
    State(receiver): State<Arc<StatusReceiver<J, N, P>>>,
    body: Bytes,
) -> (StatusCode, Json<Value>)
where
    J: JobRepository,
    N: NotificationRepository,
    P: RealtimePort,
{
    match receiver.handle(&body).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Status updated successfully" })),
        ),
        Err(e) if e.is_client_error() => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": e.to_string() })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Internal server error" })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::receiver::tests::{success_body, FakeJobs};
    use crate::domain::jobs::{JobStatus, StatusReport};
    use crate::ports::realtime::MockRealtimePort;
    use crate::ports::repository::MockNotificationRepository;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(jobs: FakeJobs, realtime: MockRealtimePort) -> Router {
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_append().returning(|_| Ok(()));
        router(Arc::new(StatusReceiver::new(jobs, notifications, realtime)))
    }

    fn post_status(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(UPDATE_STATUS_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_update_status_ok() {
        let jobs = FakeJobs::with_job("U1", Some("user-7"));
        let mut realtime = MockRealtimePort::new();
        realtime.expect_publish().times(1).returning(|_, _, _| Ok(()));

        let response = app(jobs.clone(), realtime)
            .oneshot(post_status(success_body("U1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "message": "Status updated successfully" })
        );
        assert_eq!(jobs.status_of("U1"), Some(JobStatus::Finished));
    }

    #[tokio::test]
    async fn test_missing_transcoded_video_is_bad_request() {
        let jobs = FakeJobs::with_job("U1", Some("user-7"));
        let mut realtime = MockRealtimePort::new();
        realtime.expect_publish().never();

        let body = br#"{"success":true,"message":"ok","data":{"uniqueId":"U1"}}"#.to_vec();
        let response = app(jobs.clone(), realtime)
            .oneshot(post_status(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(jobs.status_of("U1"), Some(JobStatus::Pending));
    }

    #[tokio::test]
    async fn test_failure_report_without_unique_id_is_bad_request() {
        let mut realtime = MockRealtimePort::new();
        realtime.expect_publish().never();

        let report = StatusReport::failed(
            None,
            "clip".to_string(),
            "source clip.mp4 has no uniqueId metadata",
        );
        let response = app(FakeJobs::default(), realtime)
            .oneshot(post_status(serde_json::to_vec(&report).unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = json_body(response).await["message"].to_string();
        assert!(message.contains("data.uniqueId"));
    }

    #[tokio::test]
    async fn test_unknown_job_is_server_error() {
        let mut realtime = MockRealtimePort::new();
        realtime.expect_publish().never();

        let response = app(FakeJobs::default(), realtime)
            .oneshot(post_status(success_body("U404")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "message": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(FakeJobs::default(), MockRealtimePort::new())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
