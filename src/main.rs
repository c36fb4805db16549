//! # SQL Instance Controller
//!
//! A Kubernetes controller that provisions Cloud SQL PostgreSQL instances from
//! `PostgreSql` custom resources.
//!
//! ## Overview
//!
//! For every `PostgreSql` resource the controller:
//!
//! 1. **Resolves credentials** - user passwords and the GCP service-account key from Secrets in the resource's namespace
//! 2. **Renders manifests** - Terraform JSON for the state bucket, the instance, its databases and users
//! 3. **Provisions** - runs `terraform init`/`apply` for the bucket, then for the instance
//! 4. **Reports** - writes phase, connection name and private IP address to the resource status
//! 5. **Tears down** - on deletion destroys the instance, then the bucket, before releasing the finalizer
//!
//! ## Configuration
//!
//! Environment variables, see `config::ControllerConfig` and `config::ServerConfig`.

use anyhow::Result;
use sql_instance_controller::runtime::initialization::initialize;
use sql_instance_controller::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(init.instances, init.reconciler, init.server_state).await
}
