//! # Status Command
//!
//! Shows the status of a PostgreSql resource.

use anyhow::{Context, Result};
use kube::{api::Api, Client};
use sql_instance_controller::crd::{PostgreSql, PostgreSqlStatus};

pub async fn status_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    let api: Api<PostgreSql> = Api::namespaced(client, ns);

    let instance = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get PostgreSql '{ns}/{name}'"))?;
    let status = instance.status.clone().unwrap_or_default();

    println!("Status for PostgreSql '{ns}/{name}'");
    println!();
    println!(
        "  Phase: {}",
        PostgreSqlStatus::effective_phase(instance.status.as_ref())
    );
    println!(
        "  Description: {}",
        status.description.as_deref().unwrap_or("<none>")
    );
    println!(
        "  Database version: {}",
        instance.spec.sql_instance.database_version
    );
    println!("  Connection name: {}", status.output.connection_name);
    println!("  Connection IP: {}", status.output.connection_ip_address);
    if let Some(time) = &status.last_reconcile_time {
        println!("  Last reconcile: {time}");
    }
    for condition in &status.conditions {
        println!(
            "  Condition {}: {} ({})",
            condition.r#type,
            condition.status,
            condition.reason.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<PostgreSql> = match namespace.as_deref() {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };
    let list = api
        .list(&Default::default())
        .await
        .context("Failed to list PostgreSql resources")?;

    println!(
        "{:<20} {:<30} {:<14} {:<16} {}",
        "NAMESPACE", "NAME", "PHASE", "VERSION", "IP"
    );
    for item in &list.items {
        let status = item.status.clone().unwrap_or_default();
        println!(
            "{:<20} {:<30} {:<14} {:<16} {}",
            item.metadata.namespace.as_deref().unwrap_or("-"),
            item.metadata.name.as_deref().unwrap_or("-"),
            PostgreSqlStatus::effective_phase(item.status.as_ref()),
            item.spec.sql_instance.database_version,
            status.output.connection_ip_address
        );
    }
    Ok(())
}
