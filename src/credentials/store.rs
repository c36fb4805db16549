//! # Secret Store
//!
//! Read access to the Secrets of a namespace.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams};
use kube::Client;

/// Source of namespace Secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// List all Secrets in `namespace`
    async fn list_secrets(&self, namespace: &str) -> anyhow::Result<Vec<Secret>>;
}

/// Secret store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn list_secrets(&self, namespace: &str) -> anyhow::Result<Vec<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secrets = api.list(&ListParams::default()).await?;
        Ok(secrets.items)
    }
}
