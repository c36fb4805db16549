//! # CRD Generator
//!
//! Generates the Kubernetes CustomResourceDefinition (CRD) YAML for the
//! `PostgreSql` resource from the Rust type definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/postgresql.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```
//!
//! The generated CRD includes:
//! - OpenAPI schema validation
//! - Print columns (Phase, DatabaseVersion, InstanceIP, Age)
//! - Status subresource

use kube::core::CustomResourceExt;
use sql_instance_controller::crd::PostgreSql;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&PostgreSql::crd())?);
    Ok(())
}
