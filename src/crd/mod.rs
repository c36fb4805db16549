//! # Custom Resource Definitions
//!
//! CRD types for the SQL Instance Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - Main CRD specification, provider, backend and bucket types
//! - `instance.rs` - Cloud SQL instance and settings
//! - `database.rs` - Databases and users
//! - `defaults.rs` - Defaulting of omitted fields
//! - `status.rs` - Status types for tracking reconciliation state

mod database;
mod defaults;
mod instance;
mod spec;
mod status;

// Re-export all public types
pub use database::{DatabaseSpec, PasswordSource, SecretKeyRef, UserSpec};
pub use defaults::{DEFAULT_REGION, DEFAULT_ZONE};
pub use instance::{
    BackupConfiguration, DatabaseFlag, InstanceSettings, IpConfiguration, LocationPreference,
    MaintenanceWindow, SqlInstanceSpec,
};
pub use spec::{
    BucketSpec, LifecycleRule, PostgreSql, PostgreSqlSpec, ProjectSpec, RemoteStateSpec,
    default_true,
};
pub use status::{Condition, InstanceOutput, Phase, PostgreSqlStatus};
