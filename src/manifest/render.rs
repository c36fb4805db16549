//! # Manifest Renderer
//!
//! Pure translation of spec values into Terraform JSON fragments. Every spec
//! type carries its field table here: which declared field maps to which
//! tool-facing name, and which fields are emitted even when zero.

use crate::crd::{
    BackupConfiguration, BucketSpec, DatabaseFlag, DatabaseSpec, InstanceSettings,
    IpConfiguration, LifecycleRule, LocationPreference, MaintenanceWindow, ProjectSpec,
    RemoteStateSpec, SqlInstanceSpec, UserSpec,
};
use crate::manifest::fields::{sorted_object, FieldMap};
use serde_json::{json, Value};

pub const PROVIDER_NAME: &str = "google";
pub const PROVIDER_SOURCE: &str = "hashicorp/google";
pub const PROVIDER_VERSION: &str = "3.5.0";
pub const BACKEND_TYPE: &str = "gcs";

pub const DATABASE_RESOURCE: &str = "google_sql_database";
pub const INSTANCE_RESOURCE: &str = "google_sql_database_instance";
pub const USER_RESOURCE: &str = "google_sql_user";
pub const BUCKET_RESOURCE: &str = "google_storage_bucket";

/// Local label of the instance resource users depend on
pub const INSTANCE_LABEL: &str = "instance";
/// Local label of the bucket resource
pub const BUCKET_LABEL: &str = "bucket";

/// A spec type with a tool-facing representation
pub trait ToManifest {
    fn to_manifest(&self) -> Value;
}

impl ToManifest for ProjectSpec {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .field("project", self.name.as_str())
            .field("region", self.region.as_str())
            .field("zone", self.zone.as_str())
            .into_value()
    }
}

impl ToManifest for RemoteStateSpec {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .field("bucket", self.bucket_name.as_str())
            .field("prefix", self.bucket_prefix.as_str())
            .into_value()
    }
}

impl ToManifest for BucketSpec {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .field("name", self.name.as_str())
            .field("project", self.project.as_str())
            .field("location", self.location.as_str())
            .always("force_destroy", self.destroy)
            .field("storage_class", self.storage_class.as_str())
            .field("lifecycle_rule", self.lifecycle_rule.to_manifest())
            .into_value()
    }
}

impl ToManifest for LifecycleRule {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .field("action", sorted_object(self.action.clone()))
            .field("condition", sorted_object(self.condition.clone()))
            .into_value()
    }
}

impl ToManifest for SqlInstanceSpec {
    fn to_manifest(&self) -> Value {
        let settings: Vec<Value> = self.settings.iter().map(ToManifest::to_manifest).collect();
        FieldMap::new()
            .field("database_version", self.database_version.as_str())
            .always("deletion_protection", self.deletion_protection)
            .field("name", self.name.as_str())
            .field("project", self.project.as_str())
            .field("region", self.region.as_str())
            .field("settings", settings)
            .into_value()
    }
}

impl ToManifest for InstanceSettings {
    fn to_manifest(&self) -> Value {
        let flags: Vec<Value> = self
            .database_flags
            .iter()
            .map(ToManifest::to_manifest)
            .collect();
        FieldMap::new()
            .field("tier", self.machine_type.as_str())
            .field("availability_type", self.availability_type.as_str())
            .always("disk_autoresize", self.disk_autoresize)
            .field("disk_type", self.disk_type.as_str())
            .field("activation_policy", self.activation_policy.as_str())
            .field("user_labels", sorted_object(self.labels.clone()))
            .field("database_flags", flags)
            .field("ip_configuration", self.ip_configuration.to_manifest())
            .field("backup_configuration", self.backup_configuration.to_manifest())
            .field("location_preference", self.location_preference.to_manifest())
            .field("maintenance_window", self.maintenance_window.to_manifest())
            .into_value()
    }
}

impl ToManifest for DatabaseFlag {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .field("name", self.name.as_str())
            .field("value", self.value.as_str())
            .into_value()
    }
}

impl ToManifest for IpConfiguration {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .always("ipv4_enabled", self.ipv4_enabled)
            .field("private_network", self.private_network.as_str())
            .field("require_ssl", self.require_ssl)
            .into_value()
    }
}

impl ToManifest for BackupConfiguration {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .always("enabled", self.enabled)
            .field("start_time", self.start_time.as_str())
            .into_value()
    }
}

impl ToManifest for LocationPreference {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .field("follow_gae_application", self.follow_gae_application.as_str())
            .field("zone", self.zone.as_str())
            .into_value()
    }
}

impl ToManifest for MaintenanceWindow {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .always("day", self.day)
            .always("hour", self.hour)
            .into_value()
    }
}

impl ToManifest for DatabaseSpec {
    fn to_manifest(&self) -> Value {
        FieldMap::new()
            .field("name", self.name.as_str())
            .field("project", self.project.as_str())
            .field("charset", self.charset.as_str())
            .field("collation", self.collation.as_str())
            .field("instance", self.instance.as_str())
            .into_value()
    }
}

/// Render a user with its resolved password and the dependency on the instance
///
/// The password is required; the composer looks it up before calling this.
pub fn render_user(user: &UserSpec, password: &str) -> Value {
    FieldMap::new()
        .field("name", user.name.as_str())
        .field("project", user.project.as_str())
        .field("instance", user.instance.as_str())
        .always("password", password)
        .always(
            "depends_on",
            vec![Value::from(format!("{INSTANCE_RESOURCE}.{INSTANCE_LABEL}"))],
        )
        .into_value()
}

/// Provider document: provider configuration and the pinned provider source
pub fn render_provider(project: &ProjectSpec) -> Value {
    json!({
        "provider": { PROVIDER_NAME: project.to_manifest() },
        "terraform": {
            "required_providers": {
                PROVIDER_NAME: { "source": PROVIDER_SOURCE, "version": PROVIDER_VERSION }
            }
        }
    })
}

/// Backend document pointing the instance state at the bucket
pub fn render_backend(remote_state: &RemoteStateSpec) -> Value {
    json!({
        "terraform": { "backend": { BACKEND_TYPE: remote_state.to_manifest() } }
    })
}

/// Bucket document
pub fn render_bucket(bucket: &BucketSpec) -> Value {
    json!({
        "resource": { BUCKET_RESOURCE: { BUCKET_LABEL: bucket.to_manifest() } }
    })
}

/// Fixed output declarations read back after apply
pub fn render_outputs() -> String {
    format!(
        "output \"connectionName\" {{\n  value = {INSTANCE_RESOURCE}.{INSTANCE_LABEL}.connection_name\n}}\n\n\
         output \"connectionIPAddress\" {{\n  value = {INSTANCE_RESOURCE}.{INSTANCE_LABEL}.private_ip_address\n}}\n"
    )
}
