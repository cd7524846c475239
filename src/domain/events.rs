//! Upload events carried on the queue.
//!
//! Messages are Event Grid `BlobCreated` events, base64 encoded, as a storage
//! queue subscription delivers them. When the queue is SQS, something upstream
//! has to forward those events onto it unchanged; native S3 notifications do
//! not match this format and are discarded or skipped.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event type emitted by the artifact store when a blob is created.
pub const BLOB_CREATED: &str = "Microsoft.Storage.BlobCreated";

/// Number of leading `/`-separated subject segments that precede the blob path.
pub const SUBJECT_PREFIX_SEGMENTS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvent {
    pub event_type: String,
    #[serde(default)]
    pub subject: Option<String>,
}

/// A message leased from the queue for one poll iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    /// Opaque token required to delete or extend the lease.
    pub pop_receipt: String,
    /// Base64 encoded JSON body.
    pub body: String,
    pub visibility_timeout_secs: u32,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message body is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("message body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("message body is not an upload event: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueMessage {
    pub fn decode(&self) -> Result<UploadEvent, DecodeError> {
        UploadEvent::decode(&self.body)
    }
}

impl UploadEvent {
    /// Decodes a queue body: base64, then UTF-8 JSON.
    pub fn decode(body: &str) -> Result<Self, DecodeError> {
        let raw = STANDARD.decode(body.trim())?;
        let text = String::from_utf8(raw)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Inverse of [`UploadEvent::decode`].
    pub fn encode(&self) -> String {
        // Serialising a struct of plain strings cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    pub fn is_blob_created(&self) -> bool {
        self.event_type == BLOB_CREATED
    }

    /// Blob path recovered from the subject, if the subject is present and
    /// long enough to name one.
    pub fn blob_name(&self) -> Option<String> {
        self.subject.as_deref().and_then(blob_name_from_subject)
    }
}

pub fn blob_name_from_subject(subject: &str) -> Option<String> {
    let parts: Vec<&str> = subject.trim_start_matches('/').split('/').collect();
    if parts.len() <= SUBJECT_PREFIX_SEGMENTS {
        return None;
    }
    let name = parts[SUBJECT_PREFIX_SEGMENTS..].join("/");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
