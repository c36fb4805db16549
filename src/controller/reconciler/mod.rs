//! # Reconciler
//!
//! Core reconciliation logic for `PostgreSql` resources.
//!
//! The reconciler:
//! - Validates the declaration and adds the finalizer
//! - Resolves user passwords and the service-account key from namespace Secrets
//! - Stages Terraform manifests for the state bucket and the instance
//! - Drives `terraform` through init, apply and output
//! - Tears everything down when the resource is deleted
//!
//! ## Reconciliation Flow
//!
//! 1. Deletion requested: destroy instance, then bucket, then release the finalizer
//! 2. Validate the spec and persist the finalizer
//! 3. Resolve credentials
//! 4. Render and stage manifests
//! 5. `Initializing`: provision the state bucket, initialize the instance backend
//! 6. `Applying`: apply the instance set
//! 7. `Running`: record connection name and IP address

pub mod deletion;
pub mod handle;
pub mod reconcile;
pub mod store;
pub mod trigger;
pub mod types;
pub mod validation;

// Re-export public API
pub use handle::InstanceHandle;
pub use reconcile::reconcile;
pub use store::{EventKind, InstanceEvent, InstanceStore, KubeInstanceStore};
pub use trigger::{classify, Decision};
pub use types::{BackoffState, Reconciler, ReconcilerError, TriggerSource};
pub use validation::{validate_spec, ValidationError};
