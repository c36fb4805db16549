//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::store::{InstanceStore, KubeInstanceStore};
use crate::controller::reconciler::validation::ValidationError;
use crate::credentials::{CredentialResolver, KubeSecretStore, SecretStore};
use crate::manifest::ManifestError;
use crate::provisioner::{Provisioner, Terraform};
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

/// Errors handed to the error policy
///
/// External-dependency failures never end up here: they move the resource to
/// `Failed` and requeue after the fixed retry delay instead.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("resource has no {0}")]
    MissingMetadata(&'static str),

    #[error("invalid spec: {0}")]
    InvalidSpec(#[from] ValidationError),

    #[error("failed to stage manifests: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Kubernetes API call failed: {0}")]
    Api(#[from] anyhow::Error),
}

/// Why a pass runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// Spec generation differs from the observed generation
    SpecChange,
    /// Deletion timestamp set
    Deletion,
    /// Fixed retry delay after a failed pass has elapsed
    RetryAfterFailure,
    /// A previous pass stopped before reaching `Running`
    Resume,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::SpecChange => "spec-change",
            TriggerSource::Deletion => "deletion",
            TriggerSource::RetryAfterFailure => "retry-after-failure",
            TriggerSource::Resume => "resume",
        }
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared reconciliation context
#[derive(Clone)]
pub struct Reconciler {
    pub instances: Arc<dyn InstanceStore>,
    pub credentials: CredentialResolver,
    pub provisioner: Arc<dyn Provisioner>,
    pub config: ControllerConfig,
    // Backoff state per resource (namespace/name), driven by the error policy
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    // One lock per resource (namespace/name); passes for it never overlap,
    // whoever drives them
    pub pass_locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        instances: Arc<dyn InstanceStore>,
        secrets: Arc<dyn SecretStore>,
        provisioner: Arc<dyn Provisioner>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            instances,
            credentials: CredentialResolver::new(secrets),
            provisioner,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            pass_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Reconciler wired to the cluster and the terraform CLI
    pub fn from_client(client: Client, config: ControllerConfig) -> Self {
        let provisioner = Terraform::new(config.terraform_binary.clone(), config.terraform_timeout());
        Self::new(
            Arc::new(KubeInstanceStore::new(client.clone())),
            Arc::new(KubeSecretStore::new(client)),
            Arc::new(provisioner),
            config,
        )
    }

    /// Get or create the pass lock of a resource
    pub fn pass_lock(&self, namespace: &str, name: &str) -> Arc<AsyncMutex<()>> {
        let resource_key = resource_key(namespace, name);
        let mut locks = self
            .pass_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(resource_key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Forget accumulated errors after a successful pass
    ///
    /// Returns whether the resource was backing off.
    pub fn reset_backoff(&self, namespace: &str, name: &str) -> bool {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match states.get_mut(&resource_key(namespace, name)) {
            Some(state) => {
                let had_errors = state.error_count > 0;
                state.reset();
                had_errors
            }
            None => false,
        }
    }

    /// Drop per-resource bookkeeping once the resource is gone
    pub fn forget(&self, namespace: &str, name: &str) {
        let key = resource_key(namespace, name);
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        self.pass_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }
}

pub(crate) fn resource_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}
