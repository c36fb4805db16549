//! # SQL Instance Spec
//!
//! Cloud SQL instance descriptor and its per-instance settings.

use crate::crd::spec::default_true;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cloud SQL database instance
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SqlInstanceSpec {
    /// One of POSTGRES_9_6, POSTGRES_10, POSTGRES_11, POSTGRES_12
    pub database_version: String,
    /// Forced off so the controller can always tear the instance down
    #[serde(default)]
    pub deletion_protection: bool,
    /// Instance name
    /// Default: the resource name
    #[serde(default)]
    pub name: String,
    /// Default: `project.name`
    #[serde(default)]
    pub project: String,
    /// Default: "europe-west1"
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub settings: Vec<InstanceSettings>,
}

/// Per-instance settings block
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSettings {
    /// Machine tier
    /// Default: "db-f1-micro"
    #[serde(default)]
    pub machine_type: String,
    /// ZONAL or REGIONAL
    /// Default: "ZONAL"
    #[serde(default)]
    pub availability_type: String,
    #[serde(default = "default_true")]
    pub disk_autoresize: bool,
    /// Default: "PD_SSD"
    #[serde(default)]
    pub disk_type: String,
    /// Default: "ALWAYS"
    #[serde(default)]
    pub activation_policy: String,
    /// User labels attached to the instance
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub database_flags: Vec<DatabaseFlag>,
    #[serde(default)]
    pub ip_configuration: IpConfiguration,
    #[serde(default)]
    pub backup_configuration: BackupConfiguration,
    #[serde(default)]
    pub location_preference: LocationPreference,
    #[serde(default)]
    pub maintenance_window: MaintenanceWindow,
}

/// Database engine flag
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct DatabaseFlag {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    /// Public IPv4 address
    #[serde(default)]
    pub ipv4_enabled: bool,
    /// VPC network self link for private IP
    #[serde(default)]
    pub private_network: String,
    #[serde(default, rename = "requireSSL")]
    pub require_ssl: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfiguration {
    #[serde(default)]
    pub enabled: bool,
    /// HH:MM in UTC
    #[serde(default)]
    pub start_time: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationPreference {
    #[serde(default)]
    pub follow_gae_application: String,
    /// Default: "europe-west1-b"
    #[serde(default)]
    pub zone: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct MaintenanceWindow {
    /// Day of week (1-7, starting Monday)
    #[serde(default)]
    pub day: i64,
    /// Hour of day (0-23, UTC)
    #[serde(default)]
    pub hour: i64,
}
