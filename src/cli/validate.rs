//! # Validate Command
//!
//! Offline validation of a `PostgreSql` manifest.

use anyhow::{Context, Result};
use sql_instance_controller::controller::reconciler::validate_spec;
use sql_instance_controller::crd::PostgreSql;
use std::path::Path;

/// Read a `PostgreSql` resource from a YAML file
pub fn load_resource(file: &Path) -> Result<PostgreSql> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("{} is not a valid PostgreSql resource", file.display()))
}

pub fn resource_name(instance: &PostgreSql) -> Result<&str> {
    instance
        .metadata
        .name
        .as_deref()
        .context("PostgreSql resource has no metadata.name")
}

/// Validate a `PostgreSql` manifest without contacting the cluster
pub fn validate_command(file: &Path) -> Result<()> {
    let instance = load_resource(file)?;
    let name = resource_name(&instance)?;

    validate_spec(&instance.spec, name)?;

    let spec = instance.spec.with_defaults(name);
    println!("✔ {} is valid", file.display());
    println!("  Instance: {}", spec.sql_instance.name);
    println!("  Database version: {}", spec.sql_instance.database_version);
    println!("  Databases: {}", spec.databases.len());
    println!("  Users: {}", spec.users.len());
    Ok(())
}
