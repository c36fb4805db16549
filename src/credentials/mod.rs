//! # Credential Resolver
//!
//! Resolves everything secret a pass needs from the Secrets of the resource
//! namespace:
//!
//! - user passwords, looked up through each user's `secretKeyRef` and checked
//!   against the password policy
//! - the Google service-account key Terraform authenticates with, staged as an
//!   owner-only file in the staging area
//!
//! The result lives for one pass only. Passwords are zeroized on drop and never
//! appear in `Debug` output.

pub mod policy;
pub mod store;

pub use policy::{check_password, PolicyViolation};
pub use store::{KubeSecretStore, SecretStore};

use crate::crd::UserSpec;
use crate::manifest::{ManifestError, StagingArea};
use k8s_openapi::api::core::v1::Secret;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Passwords keyed by secret key name
#[derive(Default, Clone)]
pub struct CredentialMap {
    entries: BTreeMap<String, Zeroizing<String>>,
}

impl CredentialMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, password: impl Into<String>) {
        self.entries.insert(key.into(), Zeroizing::new(password.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CredentialMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.keys().map(|k| (k, "<redacted>")))
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CredentialMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, password) in iter {
            map.insert(key, password);
        }
        map
    }
}

/// Service-account key found in the namespace
pub struct ServiceAccountKey {
    /// Secret the key was found in
    pub secret: String,
    /// Secret key name, reused as the staged file name
    pub file_name: String,
    contents: Zeroizing<Vec<u8>>,
}

impl ServiceAccountKey {
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("secret", &self.secret)
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

/// Credentials resolved for one pass
#[derive(Debug)]
pub struct ResolvedCredentials {
    pub passwords: CredentialMap,
    /// Staged service-account key handed to terraform
    pub service_account_key: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to list secrets in namespace {namespace}: {message}")]
    Store { namespace: String, message: String },

    #[error("secret {secret:?} not found in namespace {namespace}")]
    SecretNotFound { secret: String, namespace: String },

    #[error("key {key:?} not found in secret {secret:?}")]
    KeyNotFound { secret: String, key: String },

    #[error("key {key:?} in secret {secret:?} is not valid UTF-8")]
    InvalidEncoding { secret: String, key: String },

    #[error("password in key {key:?} of secret {secret:?} is too weak: {violation}")]
    WeakPassword {
        secret: String,
        key: String,
        violation: PolicyViolation,
    },

    #[error("no service-account key (*.json with type service_account) found in namespace {namespace}")]
    ServiceAccountKeyNotFound { namespace: String },

    #[error("failed to stage service-account key: {0}")]
    Staging(#[from] ManifestError),
}

impl CredentialError {
    /// Short reason used for events and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            CredentialError::Store { .. } => "SecretListFailed",
            CredentialError::SecretNotFound { .. } => "SecretNotFound",
            CredentialError::KeyNotFound { .. } => "KeyNotFound",
            CredentialError::InvalidEncoding { .. } => "InvalidSecretEncoding",
            CredentialError::WeakPassword { .. } => "WeakPassword",
            CredentialError::ServiceAccountKeyNotFound { .. } => "ServiceAccountKeyNotFound",
            CredentialError::Staging(_) => "CredentialStagingFailed",
        }
    }
}

/// Resolves passwords and the service-account key from a [`SecretStore`]
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn SecretStore>,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver").finish_non_exhaustive()
    }
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Resolve every credential of one pass
    ///
    /// Any failure aborts the whole resolution. The service-account key is
    /// written into `staging` only once all passwords resolved.
    pub async fn resolve(
        &self,
        namespace: &str,
        users: &[UserSpec],
        staging: &StagingArea,
    ) -> Result<ResolvedCredentials, CredentialError> {
        let secrets =
            self.store
                .list_secrets(namespace)
                .await
                .map_err(|e| CredentialError::Store {
                    namespace: namespace.to_string(),
                    message: format!("{e:#}"),
                })?;

        let passwords = resolve_passwords(namespace, &secrets, users)?;

        let key = find_service_account_key(&secrets).ok_or_else(|| {
            CredentialError::ServiceAccountKeyNotFound {
                namespace: namespace.to_string(),
            }
        })?;
        let service_account_key = staging.write_secret_file(&key.file_name, key.contents())?;

        info!(
            namespace = namespace,
            passwords = passwords.len(),
            service_account_secret = key.secret.as_str(),
            "Resolved credentials"
        );

        Ok(ResolvedCredentials {
            passwords,
            service_account_key,
        })
    }
}

/// Required keys grouped by secret name
pub fn required_keys(users: &[UserSpec]) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut required: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for user in users {
        let key_ref = user.secret_key_ref();
        required
            .entry(key_ref.name.as_str())
            .or_default()
            .insert(key_ref.key.as_str());
    }
    required
}

/// Look up and validate every password the users reference
pub fn resolve_passwords(
    namespace: &str,
    secrets: &[Secret],
    users: &[UserSpec],
) -> Result<CredentialMap, CredentialError> {
    let mut passwords = CredentialMap::new();

    for (secret_name, keys) in required_keys(users) {
        let secret = secrets
            .iter()
            .find(|s| s.metadata.name.as_deref() == Some(secret_name))
            .ok_or_else(|| CredentialError::SecretNotFound {
                secret: secret_name.to_string(),
                namespace: namespace.to_string(),
            })?;

        for key in keys {
            let bytes = secret_value(secret, key).ok_or_else(|| CredentialError::KeyNotFound {
                secret: secret_name.to_string(),
                key: key.to_string(),
            })?;
            let password = std::str::from_utf8(&bytes).map_err(|_| {
                CredentialError::InvalidEncoding {
                    secret: secret_name.to_string(),
                    key: key.to_string(),
                }
            })?;
            check_password(password).map_err(|violation| CredentialError::WeakPassword {
                secret: secret_name.to_string(),
                key: key.to_string(),
                violation,
            })?;
            debug!(secret = secret_name, key = key, "Password accepted");
            passwords.insert(key, password);
        }
    }

    Ok(passwords)
}

/// First `*.json` key holding a Google service-account key, scanning secrets and keys in name order
pub fn find_service_account_key(secrets: &[Secret]) -> Option<ServiceAccountKey> {
    let mut sorted: Vec<&Secret> = secrets.iter().collect();
    sorted.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));

    for secret in sorted {
        let secret_name = secret.metadata.name.clone().unwrap_or_default();
        for (key, bytes) in secret_entries(secret) {
            if key.ends_with(".json") && is_service_account_key(&bytes) {
                return Some(ServiceAccountKey {
                    secret: secret_name,
                    file_name: key,
                    contents: bytes,
                });
            }
        }
    }
    None
}

fn is_service_account_key(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|v| v.get("type").and_then(|t| t.as_str()) == Some("service_account"))
        .unwrap_or(false)
}

/// Value of `key`, preferring `data` over `stringData`
fn secret_value(secret: &Secret, key: &str) -> Option<Zeroizing<Vec<u8>>> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|v| Zeroizing::new(v.0.clone()))
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(key))
                .map(|v| Zeroizing::new(v.as_bytes().to_vec()))
        })
}

/// All entries of a secret in key order
fn secret_entries(secret: &Secret) -> BTreeMap<String, Zeroizing<Vec<u8>>> {
    let mut entries = BTreeMap::new();
    if let Some(data) = &secret.string_data {
        for (key, value) in data {
            entries.insert(key.clone(), Zeroizing::new(value.as_bytes().to_vec()));
        }
    }
    if let Some(data) = &secret.data {
        for (key, value) in data {
            entries.insert(key.clone(), Zeroizing::new(value.0.clone()));
        }
    }
    entries
}
