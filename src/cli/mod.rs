//! # SQLCTL CLI
//!
//! Command-line interface for the SQL Instance Controller.
//!
//! ## Usage
//!
//! ```bash
//! # Validate a PostgreSql manifest
//! sqlctl validate --file postgresql.yaml
//!
//! # Render main.tf.json to stdout
//! sqlctl render --file postgresql.yaml --password user-1=jEnv2000!
//!
//! # Render every manifest into a directory
//! sqlctl render --file postgresql.yaml --password user-1=jEnv2000! --out ./staging
//!
//! # List PostgreSql resources
//! sqlctl list
//!
//! # Show status of a PostgreSql resource
//! sqlctl status my-instance --namespace databases
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;
use std::path::PathBuf;

mod render;
mod status;
mod validate;

/// SQL Instance Controller CLI
#[derive(Parser)]
#[command(name = "sqlctl")]
#[command(
    about = "SQL Instance Controller CLI",
    long_about = None,
    after_help = "\
Examples:
  sqlctl validate --file postgresql.yaml
  sqlctl render --file postgresql.yaml --password user-1=jEnv2000!
  sqlctl status my-instance --namespace default
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to all namespaces for list, 'default' otherwise)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a PostgreSql manifest offline
    Validate {
        /// PostgreSql resource YAML
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Render the Terraform manifests of a PostgreSql manifest offline
    Render {
        /// PostgreSql resource YAML
        #[arg(short, long)]
        file: PathBuf,

        /// Password for a referenced secret key, as key=value (repeatable)
        #[arg(short, long = "password", value_name = "KEY=VALUE")]
        passwords: Vec<String>,

        /// Write bucket/ and instance/ manifests into this directory
        /// instead of printing main.tf.json
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List PostgreSql resources
    List,
    /// Show status of a PostgreSql resource
    Status {
        /// Name of the PostgreSql resource
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => validate::validate_command(&file),
        Commands::Render {
            file,
            passwords,
            out,
        } => render::render_command(&file, &passwords, out),
        Commands::List => status::list_command(client().await?, cli.namespace).await,
        Commands::Status { name } => {
            status::status_command(client().await?, name, cli.namespace).await
        }
    }
}

async fn client() -> Result<Client> {
    // Required for rustls 0.23+ when no default provider is set via features
    let _ = rustls::crypto::ring::default_provider().install_default();
    Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")
}
