//! Common test utilities
//!
//! In-memory stand-ins for the reconciler's collaborators: the namespace
//! Secrets, the `PostgreSql` API and the terraform CLI. They record every call
//! so tests can assert on ordering.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use sql_instance_controller::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NAMESPACE: &str = "databases";
pub const NAME: &str = "my-instance";
pub const PASSWORD_SECRET: &str = "db-credentials";
pub const PASSWORD_KEY: &str = "user-1-password";
pub const PASSWORD: &str = "jEnv2000!";
pub const SA_SECRET: &str = "gcp-service-account";
pub const SA_KEY_FILE: &str = "sa.json";
pub const SA_KEY: &str = r#"{"type":"service_account","project_id":"my-project"}"#;

/// Spec with one database and one user, as used throughout the tests
pub fn spec() -> PostgreSqlSpec {
    serde_json::from_value(serde_json::json!({
        "project": { "name": "my-project", "region": "region-1", "zone": "zone-1" },
        "remoteState": { "bucketName": "my-project-tfstate", "bucketPrefix": "sql/my-instance" },
        "sqlInstance": {
            "databaseVersion": "POSTGRES_12",
            "region": "region-1",
            "settings": [{
                "machineType": "db-custom-1-3840",
                "ipConfiguration": {
                    "ipv4Enabled": true,
                    "privateNetwork": "projects/my-project/global/networks/default"
                }
            }]
        },
        "databases": [{ "name": "db" }],
        "users": [{
            "name": "user-1",
            "password": { "secretKeyRef": { "name": PASSWORD_SECRET, "key": PASSWORD_KEY } }
        }]
    }))
    .expect("test spec is valid")
}

/// Freshly created resource: generation 1, no status, no finalizer
pub fn instance(spec: PostgreSqlSpec) -> PostgreSql {
    let mut instance = PostgreSql::new(NAME, spec);
    instance.metadata.namespace = Some(NAMESPACE.to_string());
    instance.metadata.generation = Some(1);
    instance.metadata.resource_version = Some("1".to_string());
    instance.metadata.uid = Some("5f0c7a3e-0000-4000-8000-000000000001".to_string());
    instance
}

/// Mark `instance` for deletion
pub fn mark_deleted(instance: &mut PostgreSql) {
    instance.metadata.deletion_timestamp = Some(
        serde_json::from_value(serde_json::json!("2024-05-01T12:00:00Z"))
            .expect("valid timestamp"),
    );
}

/// Secret with string entries under `data`
pub fn secret(name: &str, entries: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        data: Some(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    }
}

/// Password secret and service-account key secret
pub fn default_secrets() -> Vec<Secret> {
    vec![
        secret(PASSWORD_SECRET, &[(PASSWORD_KEY, PASSWORD)]),
        secret(SA_SECRET, &[(SA_KEY_FILE, SA_KEY)]),
    ]
}

pub struct FakeSecretStore {
    secrets: Vec<Secret>,
}

impl FakeSecretStore {
    pub fn new(secrets: Vec<Secret>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn list_secrets(&self, namespace: &str) -> anyhow::Result<Vec<Secret>> {
        Ok(self
            .secrets
            .iter()
            .filter(|s| s.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }
}

/// Write recorded by [`FakeInstanceStore`]
#[derive(Debug, Clone)]
pub enum StoreCall {
    Status(PostgreSqlStatus),
    Finalizers(Vec<String>),
    Event(InstanceEvent),
}

/// In-memory `PostgreSql` API
///
/// Keeps the server-side copies by name, bumps the resource version on every
/// write and rejects finalizer writes carrying a stale resource version.
pub struct FakeInstanceStore {
    objects: Mutex<BTreeMap<String, PostgreSql>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl FakeInstanceStore {
    pub fn new(instance: PostgreSql) -> Self {
        let store = Self {
            objects: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
        };
        store.replace(instance);
        store
    }

    /// Server-side copy of [`NAME`], as the next watch event would deliver it
    pub fn current(&self) -> PostgreSql {
        self.named(NAME)
    }

    /// Server-side copy of another resource in the store
    pub fn named(&self, name: &str) -> PostgreSql {
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no resource named {name}"))
    }

    /// Add or replace a server-side copy, e.g. to simulate a user edit
    pub fn replace(&self, instance: PostgreSql) {
        let name = instance.metadata.name.clone().expect("resource has a name");
        self.objects.lock().unwrap().insert(name, instance);
    }

    /// Drop a resource, as the API server does once its finalizers are gone
    pub fn remove(&self, name: &str) {
        self.objects.lock().unwrap().remove(name);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Status(status) => status.phase,
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<InstanceEvent> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Event(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn event_reasons(&self) -> Vec<&'static str> {
        self.events().into_iter().map(|e| e.reason).collect()
    }

    pub fn finalizers(&self) -> Vec<String> {
        self.current().metadata.finalizers.unwrap_or_default()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Apply `write` to the stored copy of `instance` and return the result
    fn update(
        &self,
        instance: &PostgreSql,
        write: impl FnOnce(&mut PostgreSql) -> anyhow::Result<()>,
    ) -> anyhow::Result<PostgreSql> {
        let name = instance.metadata.name.as_deref().unwrap_or_default();
        let mut objects = self.objects.lock().unwrap();
        let Some(current) = objects.get_mut(name) else {
            anyhow::bail!("not found: {name}");
        };
        write(current)?;
        bump_resource_version(current);
        Ok(current.clone())
    }
}

fn bump_resource_version(instance: &mut PostgreSql) {
    let next = instance
        .metadata
        .resource_version
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    instance.metadata.resource_version = Some(next.to_string());
}

#[async_trait]
impl InstanceStore for FakeInstanceStore {
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<PostgreSql>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(name)
            .filter(|o| o.metadata.namespace.as_deref() == Some(namespace))
            .cloned())
    }

    async fn patch_status(
        &self,
        instance: &PostgreSql,
        status: &PostgreSqlStatus,
    ) -> anyhow::Result<PostgreSql> {
        self.record(StoreCall::Status(status.clone()));
        self.update(instance, |current| {
            current.status = Some(status.clone());
            Ok(())
        })
    }

    async fn set_finalizers(
        &self,
        instance: &PostgreSql,
        finalizers: Vec<String>,
    ) -> anyhow::Result<PostgreSql> {
        self.update(instance, |current| {
            if current.metadata.resource_version != instance.metadata.resource_version {
                anyhow::bail!(
                    "conflict: resource version {:?} is stale (current {:?})",
                    instance.metadata.resource_version,
                    current.metadata.resource_version
                );
            }
            self.record(StoreCall::Finalizers(finalizers.clone()));
            current.metadata.finalizers = Some(finalizers);
            Ok(())
        })
    }

    async fn publish_event(&self, _instance: &PostgreSql, event: InstanceEvent) {
        self.record(StoreCall::Event(event));
    }
}

/// Which staging subdirectory a provisioner call ran in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Set {
    Bucket,
    Instance,
}

fn set_of(dir: &Path) -> Set {
    if dir.ends_with("bucket") {
        Set::Bucket
    } else {
        Set::Instance
    }
}

/// Recording terraform stand-in
///
/// `init` creates the `.terraform` directory like the real tool does.
pub struct FakeProvisioner {
    calls: Mutex<Vec<(Operation, Set)>>,
    credentials: Mutex<Vec<PathBuf>>,
    failure: Mutex<Option<(Operation, Set)>>,
    output: InstanceOutput,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            credentials: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            output: InstanceOutput {
                connection_name: "my-project:region-1:my-instance".to_string(),
                connection_ip_address: "10.1.2.3".to_string(),
            },
            delay: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Make every call take `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Most calls that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Make `operation` on `set` fail until cleared
    pub fn fail_on(&self, operation: Operation, set: Set) {
        *self.failure.lock().unwrap() = Some((operation, set));
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<(Operation, Set)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Credential files every call was handed
    pub fn credentials(&self) -> Vec<PathBuf> {
        self.credentials.lock().unwrap().clone()
    }

    pub fn output(&self) -> InstanceOutput {
        self.output.clone()
    }

    async fn run(&self, operation: Operation, workspace: &Workspace) -> Result<(), ProvisionError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record(operation, workspace)
    }

    fn record(&self, operation: Operation, workspace: &Workspace) -> Result<(), ProvisionError> {
        let set = set_of(&workspace.dir);
        self.calls.lock().unwrap().push((operation, set));
        self.credentials
            .lock()
            .unwrap()
            .push(workspace.credentials_file.clone());
        if *self.failure.lock().unwrap() == Some((operation, set)) {
            return Err(ProvisionError::Failed {
                operation,
                status: "exit status: 1".to_string(),
                stderr: "Error: googleapi: Error 403: insufficient permissions".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn init(&self, workspace: &Workspace) -> Result<(), ProvisionError> {
        self.run(Operation::Init, workspace).await?;
        std::fs::create_dir_all(workspace.dir.join(".terraform"))
            .expect("create .terraform directory");
        Ok(())
    }

    async fn apply(&self, workspace: &Workspace) -> Result<(), ProvisionError> {
        self.run(Operation::Apply, workspace).await
    }

    async fn output(&self, workspace: &Workspace) -> Result<InstanceOutput, ProvisionError> {
        self.run(Operation::Output, workspace).await?;
        Ok(self.output.clone())
    }

    async fn destroy(&self, workspace: &Workspace) -> Result<(), ProvisionError> {
        self.run(Operation::Destroy, workspace).await
    }
}

/// Reconciler wired to the fakes with a temporary staging root
pub struct Harness {
    pub store: Arc<FakeInstanceStore>,
    pub provisioner: Arc<FakeProvisioner>,
    pub reconciler: Arc<Reconciler>,
    pub staging_root: tempfile::TempDir,
}

impl Harness {
    pub fn new(instance: PostgreSql, secrets: Vec<Secret>) -> Self {
        let staging_root = tempfile::tempdir().expect("create staging root");
        let store = Arc::new(FakeInstanceStore::new(instance));
        let provisioner = Arc::new(FakeProvisioner::new());
        let config = ControllerConfig {
            staging_root: staging_root.path().to_path_buf(),
            ..ControllerConfig::default()
        };
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            Arc::new(FakeSecretStore::new(secrets)),
            provisioner.clone(),
            config,
        ));
        Self {
            store,
            provisioner,
            reconciler,
            staging_root,
        }
    }

    pub fn staging(&self) -> StagingArea {
        StagingArea::for_resource(self.staging_root.path(), NAMESPACE, NAME)
    }

    /// Run one pass on the server-side copy
    pub async fn reconcile(
        &self,
        trigger: TriggerSource,
    ) -> Result<kube_runtime::controller::Action, ReconcilerError> {
        reconcile(Arc::new(self.store.current()), self.reconciler.clone(), trigger).await
    }
}
