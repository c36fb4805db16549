//! # PostgreSql Status
//!
//! Status types for tracking the provisioning phase and instance outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the PostgreSql resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostgreSqlStatus {
    /// Current phase of the provisioning state machine
    /// Absent status is treated as `Initializing`
    #[serde(default)]
    pub phase: Option<Phase>,
    /// Human-readable description of current state
    /// Examples: "Provisioning state bucket", "terraform apply failed: ..."
    #[serde(default)]
    pub description: Option<String>,
    /// Connection details read back from terraform outputs
    #[serde(default)]
    pub output: InstanceOutput,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Observed generation
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last reconciliation time (RFC3339)
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
}

/// Provisioning phase
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum Phase {
    /// Credentials resolved, manifests staged, state bucket being provisioned
    Initializing,
    /// Instance manifests being applied
    Applying,
    /// Instance provisioned and outputs recorded
    Running,
    /// Last pass failed on an external dependency; retried after a fixed delay
    Failed,
    /// Teardown in progress
    Destroying,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Initializing => "Initializing",
            Phase::Applying => "Applying",
            Phase::Running => "Running",
            Phase::Failed => "Failed",
            Phase::Destroying => "Destroying",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Instance connection details
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct InstanceOutput {
    /// `project:region:instance` connection name
    #[serde(default, rename = "connectionName")]
    pub connection_name: String,
    /// Private IP address, `<pending>` until the first successful apply
    #[serde(default = "default_pending_address", rename = "connectionIPAddress")]
    pub connection_ip_address: String,
}

impl Default for InstanceOutput {
    fn default() -> Self {
        Self {
            connection_name: String::new(),
            connection_ip_address: default_pending_address(),
        }
    }
}

fn default_pending_address() -> String {
    crate::constants::PENDING_ADDRESS.to_string()
}

/// Condition type
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl PostgreSqlStatus {
    /// Phase with the absent-status rule applied
    pub fn effective_phase(status: Option<&Self>) -> Phase {
        status
            .and_then(|s| s.phase)
            .unwrap_or(Phase::Initializing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_status_is_initializing() {
        assert_eq!(PostgreSqlStatus::effective_phase(None), Phase::Initializing);
        assert_eq!(
            PostgreSqlStatus::effective_phase(Some(&PostgreSqlStatus::default())),
            Phase::Initializing
        );
    }

    #[test]
    fn test_output_defaults_to_pending_address() {
        let status: PostgreSqlStatus = serde_json::from_str(r#"{"phase":"Applying"}"#).unwrap();
        assert_eq!(status.phase, Some(Phase::Applying));
        assert_eq!(status.output.connection_ip_address, "<pending>");
    }

    #[test]
    fn test_output_uses_external_field_names() {
        let output = InstanceOutput {
            connection_name: "p:r:i".to_string(),
            connection_ip_address: "10.0.0.3".to_string(),
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["connectionName"], "p:r:i");
        assert_eq!(value["connectionIPAddress"], "10.0.0.3");
    }
}
