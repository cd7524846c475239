//! Compute slots: ephemeral container groups that run one worker each.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a compute slot as reported by the compute layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Absent,
    /// Provisioning, no container state reported yet.
    Starting,
    Running,
    Waiting,
    Terminated,
}

impl SlotStatus {
    /// Maps a container `currentState.state` string. A known slot without a
    /// reported state is still provisioning.
    pub fn from_container_state(state: Option<&str>) -> Self {
        match state {
            Some(s) if s.eq_ignore_ascii_case("running") => SlotStatus::Running,
            Some(s) if s.eq_ignore_ascii_case("waiting") => SlotStatus::Waiting,
            Some(s) if s.eq_ignore_ascii_case("terminated") => SlotStatus::Terminated,
            _ => SlotStatus::Starting,
        }
    }

    /// A busy slot already has a dispatch in flight and must not be targeted again.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            SlotStatus::Starting | SlotStatus::Running | SlotStatus::Waiting
        )
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotStatus::Absent => "absent",
            SlotStatus::Starting => "starting",
            SlotStatus::Running => "running",
            SlotStatus::Waiting => "waiting",
            SlotStatus::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

pub fn slot_name(group_prefix: &str, counter: u64) -> String {
    format!("{}-{}", group_prefix, counter)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
    /// Sent as a secure value, hidden from slot inspection.
    pub secure: bool,
}

impl EnvVar {
    pub fn plain(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            secure: false,
        }
    }

    pub fn secure(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            secure: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub server: String,
    pub username: String,
    pub password: String,
}

/// Everything the compute layer needs to create or replace one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSpec {
    pub slot_name: String,
    pub container_name: String,
    pub image: String,
    pub location: String,
    pub cpu: f64,
    pub memory_gb: f64,
    pub env: Vec<EnvVar>,
    pub registry: Option<RegistryCredentials>,
}

impl SlotSpec {
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_state_mapping() {
        assert_eq!(
            SlotStatus::from_container_state(Some("Running")),
            SlotStatus::Running
        );
        assert_eq!(
            SlotStatus::from_container_state(Some("Waiting")),
            SlotStatus::Waiting
        );
        assert_eq!(
            SlotStatus::from_container_state(Some("Terminated")),
            SlotStatus::Terminated
        );
        assert_eq!(SlotStatus::from_container_state(None), SlotStatus::Starting);
    }

    #[test]
    fn test_busy_states() {
        assert!(SlotStatus::Running.is_busy());
        assert!(SlotStatus::Waiting.is_busy());
        assert!(SlotStatus::Starting.is_busy());
        assert!(!SlotStatus::Absent.is_busy());
        assert!(!SlotStatus::Terminated.is_busy());
    }

    #[test]
    fn test_slot_name() {
        assert_eq!(slot_name("group", 5), "group-5");
    }
}
