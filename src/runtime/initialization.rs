//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::PostgreSql;
use crate::observability;
use anyhow::{anyhow, Result};
use kube::{api::Api, api::ListParams, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// API for PostgreSql resources in all namespaces
    pub instances: Api<PostgreSql>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
/// - Startup summary of existing resources
pub async fn initialize() -> Result<InitializationResult> {
    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow!("Failed to install rustls crypto provider"));
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sql_instance_controller=info".into()),
        )
        .init();

    info!("Starting SQL Instance Controller v{}", env!("CARGO_PKG_VERSION"));

    observability::metrics::register_metrics()?;

    let controller_config = ControllerConfig::from_env();
    let server_config = ServerConfig::from_env();
    info!(
        staging_root = %controller_config.staging_root.display(),
        terraform_binary = %controller_config.terraform_binary.display(),
        retry_delay_secs = controller_config.retry_delay_secs,
        max_concurrent_reconciliations = controller_config.max_concurrent_reconciliations,
        "Loaded controller configuration"
    );

    let server_state = Arc::new(ServerState::new());

    // Start the server in the background but wait for it to bind before proceeding
    let server_state_clone = server_state.clone();
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default().await?;

    // Watch all namespaces
    let instances: Api<PostgreSql> = Api::all(client.clone());

    let reconciler = Arc::new(Reconciler::from_client(client.clone(), controller_config));

    let startup_span = tracing::info_span!(
        "controller.startup.existing_resources",
        operation = "log_existing_resources"
    );
    log_existing_resources(&instances)
        .instrument(startup_span)
        .await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        instances,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Log the PostgreSql resources that exist at startup
///
/// The controller's initial list hands every one of them to the reconciler,
/// so nothing is reconciled here.
async fn log_existing_resources(instances: &Api<PostgreSql>) {
    let list = match instances.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
            return;
        }
    };

    if list.items.is_empty() {
        info!("No existing PostgreSql resources found, watch will pick up new resources");
        return;
    }

    let resources_by_namespace = group_by_namespace(&list.items);

    info!("SQL Instance Controller - Startup Resource Summary");
    info!("Resource Kind: PostgreSql");
    info!("Total Resources: {}", list.items.len());
    info!("Namespaces: {}", resources_by_namespace.len());

    for (namespace, resources) in &resources_by_namespace {
        info!("Namespace: {}", namespace);
        info!("  Resources ({}): {}", resources.len(), abbreviate(resources));
    }
}

/// Resource names per namespace, both sorted
fn group_by_namespace(items: &[PostgreSql]) -> BTreeMap<&str, Vec<&str>> {
    let mut resources_by_namespace: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for item in items {
        resources_by_namespace
            .entry(item.metadata.namespace.as_deref().unwrap_or("default"))
            .or_default()
            .push(item.metadata.name.as_deref().unwrap_or("unknown"));
    }
    for resources in resources_by_namespace.values_mut() {
        resources.sort_unstable();
    }
    resources_by_namespace
}

/// First three names, then the total
fn abbreviate(names: &[&str]) -> String {
    if names.len() <= 3 {
        names.join(", ")
    } else {
        format!("{}, ... ({} total)", names[..3].join(", "), names.len())
    }
}
