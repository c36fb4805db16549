//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use sql_instance_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (PostgreSql, PostgreSqlSpec, PostgreSqlStatus, etc.)
//! - The collaborator traits (SecretStore, InstanceStore, Provisioner)
//! - Reconciler types (Reconciler, ReconcilerError, etc.)
//! - Config types (ControllerConfig, ServerConfig)

// CRD types - most commonly used
pub use crate::crd::*;

// Collaborator traits - implemented by the Kubernetes/terraform backends and by test fakes
pub use crate::controller::reconciler::{InstanceEvent, InstanceStore};
pub use crate::credentials::SecretStore;
pub use crate::provisioner::{Operation, ProvisionError, Provisioner, Workspace};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    reconcile, BackoffState, Reconciler, ReconcilerError, TriggerSource,
};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, ServerConfig};

// Manifest rendering
pub use crate::manifest::{compose, ManifestError, ManifestSet, StagingArea};
pub use crate::credentials::{CredentialError, CredentialMap};
