//! # Manifests
//!
//! Rendering of PostgreSql specs into Terraform JSON and staging of the
//! resulting documents.
//!
//! - `fields.rs` - Field table builder with omit-if-empty semantics
//! - `render.rs` - Per-type field tables and single-document renderers
//! - `compose.rs` - Ordering and merging into the instance document
//! - `staging.rs` - Per-resource working directories

pub mod compose;
pub mod fields;
pub mod render;
pub mod staging;

pub use compose::{compose, ManifestSet};
pub use staging::StagingArea;

use std::path::PathBuf;

/// Errors raised while rendering or staging manifests
///
/// All of them are input or local filesystem defects; retrying with the same
/// spec does not help.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("user {user:?} references password key {key:?} that was not resolved")]
    MissingCredential { user: String, key: String },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
