//! # Instance Store
//!
//! Reads and writes the reconciler makes against `PostgreSql` resources:
//! the current object, status, finalizers and events. The Kubernetes implementation is used in production;
//! tests substitute an in-memory one.

use crate::constants::FIELD_MANAGER;
use crate::crd::{PostgreSql, PostgreSqlStatus};
use anyhow::Context;
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};
use serde_json::json;
use tracing::warn;

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Normal,
    Warning,
}

/// Kubernetes Event about one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceEvent {
    pub kind: EventKind,
    /// Machine-readable reason, e.g. `BucketProvisioned`
    pub reason: &'static str,
    /// Action the controller was taking
    pub action: &'static str,
    pub note: String,
}

impl InstanceEvent {
    pub fn normal(reason: &'static str, action: &'static str, note: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Normal,
            reason,
            action,
            note: note.into(),
        }
    }

    pub fn warning(reason: &'static str, action: &'static str, note: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Warning,
            reason,
            action,
            note: note.into(),
        }
    }
}

/// Persistence of reconciler-owned state on `PostgreSql` resources
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Current server-side copy, `None` once the resource is gone
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<PostgreSql>>;

    /// Replace the status subresource, returning the updated resource
    async fn patch_status(
        &self,
        instance: &PostgreSql,
        status: &PostgreSqlStatus,
    ) -> anyhow::Result<PostgreSql>;

    /// Replace the finalizer list, returning the updated resource
    ///
    /// The write is conditional on the resource version of `instance`.
    async fn set_finalizers(
        &self,
        instance: &PostgreSql,
        finalizers: Vec<String>,
    ) -> anyhow::Result<PostgreSql>;

    /// Publish an event; failures are logged and otherwise ignored
    async fn publish_event(&self, instance: &PostgreSql, event: InstanceEvent);
}

/// Instance store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeInstanceStore {
    client: Client,
    recorder: Recorder,
}

impl std::fmt::Debug for KubeInstanceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeInstanceStore").finish_non_exhaustive()
    }
}

impl KubeInstanceStore {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: FIELD_MANAGER.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client.clone(), reporter),
            client,
        }
    }

    fn api(&self, instance: &PostgreSql) -> anyhow::Result<(Api<PostgreSql>, String)> {
        let namespace = instance
            .metadata
            .namespace
            .as_deref()
            .context("PostgreSql resource has no namespace")?;
        let name = instance
            .metadata
            .name
            .clone()
            .context("PostgreSql resource has no name")?;
        Ok((Api::namespaced(self.client.clone(), namespace), name))
    }
}

#[async_trait]
impl InstanceStore for KubeInstanceStore {
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<PostgreSql>> {
        let api: Api<PostgreSql> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .with_context(|| format!("failed to read {namespace}/{name}"))
    }

    async fn patch_status(
        &self,
        instance: &PostgreSql,
        status: &PostgreSqlStatus,
    ) -> anyhow::Result<PostgreSql> {
        let (api, name) = self.api(instance)?;
        let patch = json!({ "status": status });
        let updated = api
            .patch_status(
                &name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(patch),
            )
            .await
            .with_context(|| format!("failed to patch status of {name}"))?;
        Ok(updated)
    }

    async fn set_finalizers(
        &self,
        instance: &PostgreSql,
        finalizers: Vec<String>,
    ) -> anyhow::Result<PostgreSql> {
        let (api, name) = self.api(instance)?;
        let patch = json!({
            "metadata": {
                "finalizers": finalizers,
                "resourceVersion": instance.metadata.resource_version,
            }
        });
        let updated = api
            .patch(&name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .with_context(|| format!("failed to patch finalizers of {name}"))?;
        Ok(updated)
    }

    async fn publish_event(&self, instance: &PostgreSql, event: InstanceEvent) {
        let type_ = match event.kind {
            EventKind::Normal => EventType::Normal,
            EventKind::Warning => EventType::Warning,
        };
        let reference = instance.object_ref(&());
        let result = self
            .recorder
            .publish(
                &Event {
                    type_,
                    reason: event.reason.to_string(),
                    note: Some(event.note),
                    action: event.action.to_string(),
                    secondary: None,
                },
                &reference,
            )
            .await;
        if let Err(e) = result {
            warn!(reason = event.reason, error = %e, "Failed to publish event");
        }
    }
}
