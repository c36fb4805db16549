//! # Provisioner
//!
//! Abstraction over the infrastructure tool that turns staged manifests into
//! cloud resources. The state machine only sees this trait; [`Terraform`] is the
//! implementation used in production.
//!
//! Every call runs against one working directory and receives the location of
//! the service-account key through [`Workspace`]. Nothing is read from or
//! written to the controller's own environment.

mod terraform;

pub use terraform::{parse_outputs, Terraform};

use crate::crd::InstanceOutput;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// Working directory of one provisioning call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Directory holding the manifests
    pub dir: PathBuf,
    /// Service-account key file handed to the tool
    pub credentials_file: PathBuf,
}

impl Workspace {
    pub fn new(dir: PathBuf, credentials_file: PathBuf) -> Self {
        Self {
            dir,
            credentials_file,
        }
    }
}

/// Provisioning operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Init,
    Apply,
    Output,
    Destroy,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::Apply => "apply",
            Operation::Output => "output",
            Operation::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to start terraform {operation}: {source}")]
    Spawn {
        operation: Operation,
        #[source]
        source: std::io::Error,
    },

    #[error("terraform {operation} exited with {status}: {stderr}")]
    Failed {
        operation: Operation,
        status: String,
        stderr: String,
    },

    #[error("terraform {operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: Operation,
        timeout_secs: u64,
    },

    #[error("failed to parse terraform outputs: {0}")]
    OutputParse(String),
}

impl ProvisionError {
    pub fn operation(&self) -> Operation {
        match self {
            ProvisionError::Spawn { operation, .. }
            | ProvisionError::Failed { operation, .. }
            | ProvisionError::Timeout { operation, .. } => *operation,
            ProvisionError::OutputParse(_) => Operation::Output,
        }
    }

    /// Short reason used for events
    pub fn reason(&self) -> &'static str {
        match self.operation() {
            Operation::Init => "InitFailed",
            Operation::Apply => "ApplyFailed",
            Operation::Output => "OutputFailed",
            Operation::Destroy => "DestroyFailed",
        }
    }
}

/// Infrastructure tool driven by the reconciler
///
/// All operations are idempotent from the caller's point of view: re-running
/// any of them against the same workspace converges on the same result.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Prepare the working directory (providers, backend)
    async fn init(&self, workspace: &Workspace) -> Result<(), ProvisionError>;

    /// Converge real resources on the manifests
    async fn apply(&self, workspace: &Workspace) -> Result<(), ProvisionError>;

    /// Read connection details of the applied instance
    async fn output(&self, workspace: &Workspace) -> Result<InstanceOutput, ProvisionError>;

    /// Delete everything the manifests describe
    async fn destroy(&self, workspace: &Workspace) -> Result<(), ProvisionError>;
}
