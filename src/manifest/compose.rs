//! # Manifest Composer
//!
//! Orders rendered fragments into the documents Terraform reads from the two
//! working directories.
//!
//! The instance document lists its resources as an array of single-resource
//! objects under one `resource` key: databases first, then users, then the
//! instance. Terraform's JSON syntax accepts an array wherever a block is
//! expected, so the order survives serialization.

use crate::credentials::CredentialMap;
use crate::crd::PostgreSqlSpec;
use crate::manifest::render::{
    render_backend, render_bucket, render_outputs, render_provider, render_user, ToManifest,
    DATABASE_RESOURCE, INSTANCE_LABEL, INSTANCE_RESOURCE, USER_RESOURCE,
};
use crate::manifest::ManifestError;
use serde_json::{json, Value};

/// Local label of the first database
pub const PRIMARY_DATABASE_LABEL: &str = "database";
/// Local label of every database after the first
pub const ADDITIONAL_DATABASE_LABEL: &str = "additional_databases";
/// Local label of the first user
pub const PRIMARY_USER_LABEL: &str = "default";
/// Local label of every user after the first
pub const ADDITIONAL_USER_LABEL: &str = "additional_users";

/// Documents for one resource, ready to be serialized
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestSet {
    /// `provider.tf.json`, written to both working directories
    pub provider: Value,
    /// `backend.tf.json` in the instance directory
    pub backend: Value,
    /// `bucket.tf.json` in the bucket directory
    pub bucket: Value,
    /// `main.tf.json` in the instance directory
    pub instance: Value,
    /// `output.tf` in the instance directory
    pub outputs: String,
}

impl ManifestSet {
    /// Serialize one document the way it is written to disk
    pub fn to_bytes(document: &Value) -> Result<Vec<u8>, ManifestError> {
        let mut bytes = serde_json::to_vec_pretty(document)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Compose every document for a defaulted spec
///
/// Fails when a user references a password key missing from `credentials`.
pub fn compose(
    spec: &PostgreSqlSpec,
    credentials: &CredentialMap,
) -> Result<ManifestSet, ManifestError> {
    Ok(ManifestSet {
        provider: render_provider(&spec.project),
        backend: render_backend(&spec.remote_state),
        bucket: render_bucket(&spec.bucket_config),
        instance: compose_instance(spec, credentials)?,
        outputs: render_outputs(),
    })
}

/// Instance document: databases, then users, then the instance
pub fn compose_instance(
    spec: &PostgreSqlSpec,
    credentials: &CredentialMap,
) -> Result<Value, ManifestError> {
    let mut resources = Vec::with_capacity(spec.databases.len() + spec.users.len() + 1);

    for (index, database) in spec.databases.iter().enumerate() {
        let label = cardinality_label(index, PRIMARY_DATABASE_LABEL, ADDITIONAL_DATABASE_LABEL);
        resources.push(resource(DATABASE_RESOURCE, label, database.to_manifest()));
    }

    for (index, user) in spec.users.iter().enumerate() {
        let key_ref = user.secret_key_ref();
        let password =
            credentials
                .get(&key_ref.key)
                .ok_or_else(|| ManifestError::MissingCredential {
                    user: user.name.clone(),
                    key: key_ref.key.clone(),
                })?;
        let label = cardinality_label(index, PRIMARY_USER_LABEL, ADDITIONAL_USER_LABEL);
        resources.push(resource(USER_RESOURCE, label, render_user(user, password)));
    }

    resources.push(resource(
        INSTANCE_RESOURCE,
        INSTANCE_LABEL,
        spec.sql_instance.to_manifest(),
    ));

    Ok(json!({ "resource": resources }))
}

/// Label for the entry at `index`: the first entry gets `primary`, the rest share `additional`
///
/// Three or more entries therefore reuse the same additional label.
pub fn cardinality_label(
    index: usize,
    primary: &'static str,
    additional: &'static str,
) -> &'static str {
    if index == 0 {
        primary
    } else {
        additional
    }
}

fn resource(kind: &str, label: &str, body: Value) -> Value {
    json!({ kind: { label: body } })
}
