//! # Status Conditions

use serde::{Deserialize, Serialize};

/// Condition type reported by both resources
pub const READY: &str = "Ready";

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time (RFC3339)
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    /// `Ready` condition stamped with the current time
    #[must_use]
    pub fn ready(ready: bool, reason: &str, message: impl Into<String>) -> Self {
        Self {
            r#type: READY.to_string(),
            status: if ready { "True" } else { "False" }.to_string(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
            reason: Some(reason.to_string()),
            message: Some(message.into()),
        }
    }

    /// Keep the previous transition time when the status did not change
    #[must_use]
    pub fn since(mut self, previous: &[Condition]) -> Self {
        if let Some(prev) = previous
            .iter()
            .find(|c| c.r#type == self.r#type && c.status == self.status)
        {
            self.last_transition_time.clone_from(&prev.last_transition_time);
        }
        self
    }
}
