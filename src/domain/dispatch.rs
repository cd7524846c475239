//! Dispatch decision for a single poll iteration.
//!
//! Queue redelivery after the visibility timeout is the only retry mechanism,
//! so every outcome here is either "act and delete" or "leave the message to
//! come back later". Keeping that decision pure lets the loop be tested
//! without a queue or a compute API.

use super::events::{QueueMessage, UploadEvent};
use super::slots::SlotStatus;

#[derive(Debug, Clone, Default)]
pub struct DispatchPolicy {
    /// Delete decodable messages that carry a foreign event type instead of
    /// letting them redeliver forever.
    pub discard_foreign_events: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Undecodable(String),
    ForeignEvent(String),
    MissingSubject,
    SlotBusy(SlotStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Dispatch { blob_name: String },
    /// Leave the message on the queue; it becomes visible again later.
    SkipKeep(SkipReason),
    /// Drop the message without dispatching.
    SkipDelete(SkipReason),
}

/// First half of the decision, made before the slot is inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Triage {
    Candidate { event: UploadEvent, blob_name: String },
    Skip(Action),
}

pub fn triage(message: &QueueMessage, policy: &DispatchPolicy) -> Triage {
    let event = match message.decode() {
        Ok(event) => event,
        Err(e) => return Triage::Skip(Action::SkipKeep(SkipReason::Undecodable(e.to_string()))),
    };

    if !event.is_blob_created() {
        let reason = SkipReason::ForeignEvent(event.event_type.clone());
        return Triage::Skip(if policy.discard_foreign_events {
            Action::SkipDelete(reason)
        } else {
            Action::SkipKeep(reason)
        });
    }

    match event.blob_name() {
        Some(blob_name) => Triage::Candidate { event, blob_name },
        None => Triage::Skip(Action::SkipKeep(SkipReason::MissingSubject)),
    }
}

/// Second half: a candidate is dispatched only onto a free slot.
pub fn for_slot(blob_name: String, slot: SlotStatus) -> Action {
    if slot.is_busy() {
        Action::SkipKeep(SkipReason::SlotBusy(slot))
    } else {
        Action::Dispatch { blob_name }
    }
}

/// `(QueueMessage, SlotStatus) -> Action`.
pub fn plan(message: &QueueMessage, slot: SlotStatus, policy: &DispatchPolicy) -> Action {
    match triage(message, policy) {
        Triage::Skip(action) => action,
        Triage::Candidate { blob_name, .. } => for_slot(blob_name, slot),
    }
}
