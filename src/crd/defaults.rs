//! # Spec Defaults
//!
//! Fills in the fields a declaration may leave out. Rendering always works on the
//! defaulted copy; the stored resource is never mutated.

use crate::crd::{
    BucketSpec, DatabaseSpec, InstanceSettings, LifecycleRule, PostgreSqlSpec, SqlInstanceSpec,
    UserSpec,
};

pub const DEFAULT_REGION: &str = "europe-west1";
pub const DEFAULT_ZONE: &str = "europe-west1-b";
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";
pub const DEFAULT_CHARSET: &str = "UTF8";
pub const DEFAULT_COLLATION: &str = "en_US.UTF8";
pub const DEFAULT_AVAILABILITY_TYPE: &str = "ZONAL";
pub const DEFAULT_DISK_TYPE: &str = "PD_SSD";
pub const DEFAULT_ACTIVATION_POLICY: &str = "ALWAYS";
pub const DEFAULT_MACHINE_TYPE: &str = "db-f1-micro";
pub const DEFAULT_LIFECYCLE_AGE_DAYS: i64 = 3;

impl PostgreSqlSpec {
    /// Return a copy with every omitted field defaulted
    ///
    /// `resource_name` is the `metadata.name` of the PostgreSql resource; it names
    /// the instance and is the instance databases and users attach to.
    #[must_use]
    pub fn with_defaults(&self, resource_name: &str) -> Self {
        let mut spec = self.clone();
        let project = spec.project.name.clone();

        or_default(&mut spec.project.region, DEFAULT_REGION);
        or_default(&mut spec.project.zone, DEFAULT_ZONE);

        let bucket_name = spec.remote_state.bucket_name.clone();
        spec.bucket_config.apply_defaults(&bucket_name, &project);
        spec.sql_instance.apply_defaults(resource_name, &project);
        for database in &mut spec.databases {
            database.apply_defaults(resource_name, &project);
        }
        for user in &mut spec.users {
            user.apply_defaults(resource_name, &project);
        }
        spec
    }

    /// Effective Cloud SQL instance name
    pub fn instance_name<'a>(&'a self, resource_name: &'a str) -> &'a str {
        if self.sql_instance.name.is_empty() {
            resource_name
        } else {
            &self.sql_instance.name
        }
    }
}

impl BucketSpec {
    fn apply_defaults(&mut self, bucket_name: &str, project: &str) {
        or_default(&mut self.name, bucket_name);
        or_default(&mut self.project, project);
        or_default(&mut self.location, DEFAULT_REGION);
        or_default(&mut self.storage_class, DEFAULT_STORAGE_CLASS);
        self.destroy = true;
        self.lifecycle_rule.apply_defaults();
    }
}

impl LifecycleRule {
    fn apply_defaults(&mut self) {
        if self.action.is_empty() {
            self.action.insert("type".to_string(), "Delete".to_string());
        }
        if self.condition.is_empty() {
            self.condition.insert("age".to_string(), DEFAULT_LIFECYCLE_AGE_DAYS);
        }
    }
}

impl SqlInstanceSpec {
    fn apply_defaults(&mut self, resource_name: &str, project: &str) {
        or_default(&mut self.region, DEFAULT_REGION);
        or_default(&mut self.project, project);
        or_default(&mut self.name, resource_name);
        self.deletion_protection = false;
        for settings in &mut self.settings {
            settings.apply_defaults();
        }
    }
}

impl InstanceSettings {
    fn apply_defaults(&mut self) {
        or_default(&mut self.availability_type, DEFAULT_AVAILABILITY_TYPE);
        or_default(&mut self.disk_type, DEFAULT_DISK_TYPE);
        or_default(&mut self.activation_policy, DEFAULT_ACTIVATION_POLICY);
        or_default(&mut self.machine_type, DEFAULT_MACHINE_TYPE);
        or_default(&mut self.location_preference.zone, DEFAULT_ZONE);
    }
}

impl DatabaseSpec {
    fn apply_defaults(&mut self, resource_name: &str, project: &str) {
        or_default(&mut self.instance, resource_name);
        or_default(&mut self.project, project);
        or_default(&mut self.charset, DEFAULT_CHARSET);
        or_default(&mut self.collation, DEFAULT_COLLATION);
    }
}

impl UserSpec {
    fn apply_defaults(&mut self, resource_name: &str, project: &str) {
        or_default(&mut self.instance, resource_name);
        or_default(&mut self.project, project);
    }
}

fn or_default(field: &mut String, default: &str) {
    if field.is_empty() {
        *field = default.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ProjectSpec, RemoteStateSpec};

    fn minimal_spec() -> PostgreSqlSpec {
        PostgreSqlSpec {
            project: ProjectSpec {
                name: "my-project".to_string(),
                ..Default::default()
            },
            remote_state: RemoteStateSpec {
                bucket_name: "my-bucket".to_string(),
                bucket_prefix: "sql/state".to_string(),
            },
            sql_instance: SqlInstanceSpec {
                database_version: "POSTGRES_12".to_string(),
                settings: vec![InstanceSettings::default()],
                ..Default::default()
            },
            databases: vec![DatabaseSpec {
                name: "db".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_fill_empty_fields() {
        let spec = minimal_spec().with_defaults("my-instance");

        assert_eq!(spec.project.region, "europe-west1");
        assert_eq!(spec.project.zone, "europe-west1-b");
        assert_eq!(spec.bucket_config.name, "my-bucket");
        assert_eq!(spec.bucket_config.project, "my-project");
        assert_eq!(spec.bucket_config.storage_class, "STANDARD");
        assert!(spec.bucket_config.destroy);
        assert_eq!(
            spec.bucket_config.lifecycle_rule.condition.get("age"),
            Some(&3)
        );
        assert_eq!(spec.sql_instance.name, "my-instance");
        assert_eq!(spec.sql_instance.project, "my-project");
        assert_eq!(spec.sql_instance.settings[0].machine_type, "db-f1-micro");
        assert_eq!(
            spec.sql_instance.settings[0].location_preference.zone,
            "europe-west1-b"
        );
        assert_eq!(spec.databases[0].instance, "my-instance");
        assert_eq!(spec.databases[0].charset, "UTF8");
        assert_eq!(spec.databases[0].collation, "en_US.UTF8");
    }

    #[test]
    fn test_defaults_keep_declared_values() {
        let mut spec = minimal_spec();
        spec.project.region = "us-central1".to_string();
        spec.sql_instance.name = "explicit".to_string();
        spec.sql_instance.deletion_protection = true;
        spec.bucket_config.destroy = false;

        let spec = spec.with_defaults("my-instance");

        assert_eq!(spec.project.region, "us-central1");
        assert_eq!(spec.sql_instance.name, "explicit");
        // Teardown must always be possible
        assert!(!spec.sql_instance.deletion_protection);
        assert!(spec.bucket_config.destroy);
    }

    #[test]
    fn test_instance_name_falls_back_to_resource_name() {
        let spec = minimal_spec();
        assert_eq!(spec.instance_name("my-instance"), "my-instance");
    }
}
