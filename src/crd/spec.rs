//! # PostgreSql Spec
//!
//! Main CRD specification types and default values.

use crate::crd::{DatabaseSpec, SqlInstanceSpec, UserSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// PostgreSql Custom Resource Definition
///
/// Declares a Cloud SQL PostgreSQL instance together with its databases, users,
/// and the storage bucket holding the Terraform remote state.
///
/// # Example
///
/// ```yaml
/// apiVersion: sql.octopilot.io/v1alpha1
/// kind: PostgreSql
/// metadata:
///   name: my-instance
///   namespace: default
/// spec:
///   project:
///     name: my-project
///   remoteState:
///     bucketName: my-project-tfstate
///     bucketPrefix: sql/my-instance
///   sqlInstance:
///     databaseVersion: POSTGRES_12
///     settings:
///       - ipConfiguration:
///           privateNetwork: projects/my-project/global/networks/default
///         backupConfiguration:
///           enabled: true
///           startTime: "02:00"
///         maintenanceWindow:
///           day: 7
///           hour: 3
///   databases:
///     - name: app
///   users:
///     - name: app
///       password:
///         secretKeyRef:
///           name: app-db-credentials
///           key: app-password
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "PostgreSql",
    group = "sql.octopilot.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::PostgreSqlStatus",
    shortname = "pg",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"DatabaseVersion", "type":"string", "jsonPath":".spec.sqlInstance.databaseVersion"}, {"name":"InstanceIP", "type":"string", "jsonPath":".status.output.connectionIPAddress"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PostgreSqlSpec {
    /// Google Cloud project the provider is configured for
    pub project: ProjectSpec,
    /// Location of the Terraform remote state for the instance
    pub remote_state: RemoteStateSpec,
    /// Storage bucket holding the remote state
    /// Missing fields are derived from `remoteState` and `project`
    #[serde(default)]
    pub bucket_config: BucketSpec,
    /// The Cloud SQL instance itself
    pub sql_instance: SqlInstanceSpec,
    /// Logical databases created on the instance, in order
    #[serde(default)]
    pub databases: Vec<DatabaseSpec>,
    /// Database users created on the instance, in order
    #[serde(default)]
    pub users: Vec<UserSpec>,
}

/// Google provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// Project ID
    pub name: String,
    /// Default region
    /// Default: "europe-west1"
    #[serde(default)]
    pub region: String,
    /// Default zone
    /// Default: "europe-west1-b"
    #[serde(default)]
    pub zone: String,
}

/// GCS backend for the instance state
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStateSpec {
    /// Bucket holding the state (created by the controller)
    pub bucket_name: String,
    /// Object prefix of the state inside the bucket
    #[serde(default)]
    pub bucket_prefix: String,
}

/// Storage bucket created for the remote state
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    /// Default: `remoteState.bucketName`
    #[serde(default)]
    pub name: String,
    /// Default: `project.name`
    #[serde(default)]
    pub project: String,
    /// Default: "europe-west1"
    #[serde(default)]
    pub location: String,
    /// Delete all objects when the bucket is destroyed
    /// Always forced on so teardown can remove the bucket
    #[serde(default = "default_true")]
    pub destroy: bool,
    /// Default: "STANDARD"
    #[serde(default)]
    pub storage_class: String,
    /// Object lifecycle rule
    /// Default: delete objects older than 3 days
    #[serde(default)]
    pub lifecycle_rule: LifecycleRule,
}

/// Bucket lifecycle rule
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRule {
    #[serde(default)]
    pub action: BTreeMap<String, String>,
    #[serde(default)]
    pub condition: BTreeMap<String, i64>,
}

/// Default value for boolean true
pub fn default_true() -> bool {
    true
}
