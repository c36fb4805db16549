//! # Databases and Users
//!
//! Logical databases and database users created on the instance.

use serde::{Deserialize, Serialize};

/// Logical database
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    pub name: String,
    /// Default: `project.name`
    #[serde(default)]
    pub project: String,
    /// Default: "UTF8"
    #[serde(default)]
    pub charset: String,
    /// Default: "en_US.UTF8"
    #[serde(default)]
    pub collation: String,
    /// Default: the resource name
    #[serde(default)]
    pub instance: String,
}

/// Database user whose password lives in a Kubernetes Secret
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    pub name: String,
    /// Default: `project.name`
    #[serde(default)]
    pub project: String,
    /// Default: the resource name
    #[serde(default)]
    pub instance: String,
    pub password: PasswordSource,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordSource {
    pub secret_key_ref: SecretKeyRef,
}

/// Reference to one key of a Secret in the resource namespace
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

impl UserSpec {
    /// Secret and key holding this user's password
    pub fn secret_key_ref(&self) -> &SecretKeyRef {
        &self.password.secret_key_ref
    }
}
