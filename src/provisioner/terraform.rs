//! # Terraform
//!
//! Runs the `terraform` CLI as a child process.
//!
//! Commands:
//! - `init -reconfigure -input=false`
//! - `apply -input=false -auto-approve -lock=false`
//! - `output -json`
//! - `destroy -input=false -auto-approve`
//!
//! The service-account key location is set as `GOOGLE_APPLICATION_CREDENTIALS`
//! on the child only. Each invocation is bounded by a timeout; the child is
//! killed when the timeout fires.

use crate::constants::{CREDENTIALS_ENV_VAR, PENDING_ADDRESS};
use crate::crd::InstanceOutput;
use crate::observability::metrics;
use crate::provisioner::{Operation, ProvisionError, Provisioner, Workspace};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, error, info, Instrument};

/// `terraform` CLI driver
#[derive(Debug, Clone)]
pub struct Terraform {
    binary: PathBuf,
    timeout: Duration,
}

impl Terraform {
    pub fn new(binary: PathBuf, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    fn args(operation: Operation) -> &'static [&'static str] {
        match operation {
            Operation::Init => &["init", "-reconfigure", "-input=false", "-no-color"],
            Operation::Apply => &[
                "apply",
                "-input=false",
                "-auto-approve",
                "-lock=false",
                "-no-color",
            ],
            Operation::Output => &["output", "-json", "-no-color"],
            Operation::Destroy => &["destroy", "-input=false", "-auto-approve", "-no-color"],
        }
    }

    /// Run one command and return its stdout
    async fn run(
        &self,
        operation: Operation,
        workspace: &Workspace,
    ) -> Result<Vec<u8>, ProvisionError> {
        let span = tracing::info_span!(
            "terraform",
            operation = operation.as_str(),
            dir = %workspace.dir.display()
        );

        async {
            let start = Instant::now();
            info!("Running terraform {}", operation);

            let mut command = Command::new(&self.binary);
            command
                .args(Self::args(operation))
                .current_dir(&workspace.dir)
                .env(CREDENTIALS_ENV_VAR, &workspace.credentials_file)
                .env("TF_IN_AUTOMATION", "1")
                .env("TF_INPUT", "0")
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let result = match tokio::time::timeout(self.timeout, command.output()).await {
                Err(_) => Err(ProvisionError::Timeout {
                    operation,
                    timeout_secs: self.timeout.as_secs(),
                }),
                Ok(Err(source)) => Err(ProvisionError::Spawn { operation, source }),
                Ok(Ok(output)) if output.status.success() => Ok(output.stdout),
                Ok(Ok(output)) => Err(ProvisionError::Failed {
                    operation,
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                }),
            };

            let elapsed = start.elapsed().as_secs_f64();
            metrics::observe_terraform_operation_duration(operation.as_str(), elapsed);
            match &result {
                Ok(_) => {
                    metrics::increment_terraform_operations(operation.as_str(), "success");
                    debug!(duration_secs = elapsed, "terraform {} succeeded", operation);
                }
                Err(e) => {
                    metrics::increment_terraform_operations(operation.as_str(), "failure");
                    error!(duration_secs = elapsed, error = %e, "terraform {} failed", operation);
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl Provisioner for Terraform {
    async fn init(&self, workspace: &Workspace) -> Result<(), ProvisionError> {
        self.run(Operation::Init, workspace).await.map(|_| ())
    }

    async fn apply(&self, workspace: &Workspace) -> Result<(), ProvisionError> {
        self.run(Operation::Apply, workspace).await.map(|_| ())
    }

    async fn output(&self, workspace: &Workspace) -> Result<InstanceOutput, ProvisionError> {
        let stdout = self.run(Operation::Output, workspace).await?;
        parse_outputs(&stdout)
    }

    async fn destroy(&self, workspace: &Workspace) -> Result<(), ProvisionError> {
        self.run(Operation::Destroy, workspace).await.map(|_| ())
    }
}

/// Parse `terraform output -json`
///
/// The document maps output names to `{ "value": ..., "type": ..., "sensitive": ... }`.
/// `connectionName` is required; a missing or empty `connectionIPAddress` keeps
/// the pending placeholder.
pub fn parse_outputs(stdout: &[u8]) -> Result<InstanceOutput, ProvisionError> {
    let document: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| ProvisionError::OutputParse(e.to_string()))?;

    let value_of = |name: &str| {
        document
            .get(name)
            .and_then(|o| o.get("value"))
            .and_then(serde_json::Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let connection_name = value_of("connectionName")
        .ok_or_else(|| ProvisionError::OutputParse("connectionName is missing".to_string()))?;
    let connection_ip_address =
        value_of("connectionIPAddress").unwrap_or_else(|| PENDING_ADDRESS.to_string());

    Ok(InstanceOutput {
        connection_name,
        connection_ip_address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outputs() {
        let stdout = br#"{
            "connectionIPAddress": {"sensitive": false, "type": "string", "value": "10.20.0.3"},
            "connectionName": {"sensitive": false, "type": "string", "value": "my-project:region-1:my-instance"}
        }"#;

        let output = parse_outputs(stdout).unwrap();

        assert_eq!(output.connection_name, "my-project:region-1:my-instance");
        assert_eq!(output.connection_ip_address, "10.20.0.3");
    }

    #[test]
    fn test_missing_address_stays_pending() {
        let stdout = br#"{"connectionName": {"value": "p:r:i"}, "connectionIPAddress": {"value": ""}}"#;

        let output = parse_outputs(stdout).unwrap();

        assert_eq!(output.connection_ip_address, "<pending>");
    }

    #[test]
    fn test_missing_connection_name_is_an_error() {
        let err = parse_outputs(b"{}").unwrap_err();
        assert!(matches!(err, ProvisionError::OutputParse(_)));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(parse_outputs(b"not json").is_err());
    }

    #[test]
    fn test_destroy_never_locks_interactively() {
        let args = Terraform::args(Operation::Destroy);
        assert!(args.contains(&"-auto-approve"));
        assert!(args.contains(&"-input=false"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_a_failure() {
        // `false` exits non-zero without output
        let terraform = Terraform::new(PathBuf::from("false"), Duration::from_secs(5));
        let tmp = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(tmp.path().to_path_buf(), tmp.path().join("sa.json"));

        let err = terraform.init(&workspace).await.unwrap_err();

        assert!(matches!(err, ProvisionError::Failed { operation: Operation::Init, .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let terraform = Terraform::new(
            PathBuf::from("/nonexistent/terraform-binary"),
            Duration::from_secs(5),
        );
        let tmp = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(tmp.path().to_path_buf(), tmp.path().join("sa.json"));

        let err = terraform.apply(&workspace).await.unwrap_err();

        assert!(matches!(err, ProvisionError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_command() {
        // `sh apply ...` reads the script named after the subcommand from the workspace
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("apply"), "sleep 5\n").unwrap();
        let terraform = Terraform::new(PathBuf::from("/bin/sh"), Duration::from_millis(100));
        let workspace = Workspace::new(tmp.path().to_path_buf(), tmp.path().join("sa.json"));

        let err = terraform.apply(&workspace).await.unwrap_err();

        assert!(matches!(err, ProvisionError::Timeout { operation: Operation::Apply, .. }));
    }
}
