//! # Staging Directory
//!
//! Per-resource working directories Terraform runs in:
//!
//! ```text
//! <staging root>/<namespace>_<name>/
//!   <service-account key>.json
//!   bucket/    provider.tf.json bucket.tf.json
//!   instance/  provider.tf.json backend.tf.json main.tf.json output.tf
//! ```
//!
//! Files are written through a temporary file in the same directory and renamed
//! into place, so Terraform never reads a partially written document.

use crate::constants::{
    BACKEND_FILE, BUCKET_DIR, BUCKET_FILE, INSTANCE_DIR, MAIN_FILE, OUTPUT_FILE, PROVIDER_FILE,
};
use crate::manifest::{ManifestError, ManifestSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Staging area of one resource identity
    pub fn for_resource(staging_root: &Path, namespace: &str, name: &str) -> Self {
        Self {
            root: staging_root.join(format!("{namespace}_{name}")),
        }
    }

    /// Staging area rooted at an arbitrary directory
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(BUCKET_DIR)
    }

    pub fn instance_dir(&self) -> PathBuf {
        self.root.join(INSTANCE_DIR)
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Whether `terraform init` has run in `dir`
    pub fn is_initialized(dir: &Path) -> bool {
        dir.join(".terraform").is_dir()
    }

    /// Write every document into the two working directories
    pub fn write_manifests(&self, manifests: &ManifestSet) -> Result<(), ManifestError> {
        let bucket_dir = self.bucket_dir();
        let instance_dir = self.instance_dir();
        create_dir(&bucket_dir)?;
        create_dir(&instance_dir)?;

        let provider = ManifestSet::to_bytes(&manifests.provider)?;
        write_atomic(&bucket_dir.join(PROVIDER_FILE), &provider)?;
        write_atomic(
            &bucket_dir.join(BUCKET_FILE),
            &ManifestSet::to_bytes(&manifests.bucket)?,
        )?;

        write_atomic(&instance_dir.join(PROVIDER_FILE), &provider)?;
        write_atomic(
            &instance_dir.join(BACKEND_FILE),
            &ManifestSet::to_bytes(&manifests.backend)?,
        )?;
        write_atomic(
            &instance_dir.join(MAIN_FILE),
            &ManifestSet::to_bytes(&manifests.instance)?,
        )?;
        write_atomic(&instance_dir.join(OUTPUT_FILE), manifests.outputs.as_bytes())?;

        debug!(staging = %self.root.display(), "Staged terraform manifests");
        Ok(())
    }

    /// Write a secret file readable by the owner only
    pub fn write_secret_file(
        &self,
        file_name: &str,
        contents: &[u8],
    ) -> Result<PathBuf, ManifestError> {
        create_dir(&self.root)?;
        let path = self.root.join(file_name);
        // Temporary files are created with mode 0600 and keep it across the rename
        write_atomic(&path, contents)?;
        Ok(path)
    }

    /// Service-account key staged by an earlier pass, if any
    ///
    /// The key is the only regular `.json` file at the root of the area.
    pub fn staged_credentials_file(&self) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(&self.root)
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }

    /// Remove the staging area, including staged credentials
    pub fn remove(&self) -> Result<(), ManifestError> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ManifestError::Io {
                path: self.root.clone(),
                source,
            }),
        }
    }
}

fn create_dir(dir: &Path) -> Result<(), ManifestError> {
    std::fs::create_dir_all(dir).map_err(|source| ManifestError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ManifestError> {
    let io_err = |source: std::io::Error| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    file.write_all(contents).map_err(io_err)?;
    file.as_file().sync_all().map_err(io_err)?;
    file.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifests() -> ManifestSet {
        ManifestSet {
            provider: json!({"provider": {}}),
            backend: json!({"terraform": {}}),
            bucket: json!({"resource": {}}),
            instance: json!({"resource": []}),
            outputs: "output \"x\" {}\n".to_string(),
        }
    }

    #[test]
    fn test_staging_path_is_namespaced_by_identity() {
        let area = StagingArea::for_resource(Path::new("/tmp/stage"), "team-a", "orders");
        assert_eq!(area.root(), Path::new("/tmp/stage/team-a_orders"));
        assert_eq!(area.bucket_dir(), Path::new("/tmp/stage/team-a_orders/bucket"));
        assert_eq!(
            area.instance_dir(),
            Path::new("/tmp/stage/team-a_orders/instance")
        );
    }

    #[test]
    fn test_write_manifests_lays_out_both_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::for_resource(tmp.path(), "ns", "pg");

        area.write_manifests(&manifests()).unwrap();

        for file in [PROVIDER_FILE, BUCKET_FILE] {
            assert!(area.bucket_dir().join(file).is_file(), "missing bucket/{file}");
        }
        for file in [PROVIDER_FILE, BACKEND_FILE, MAIN_FILE, OUTPUT_FILE] {
            assert!(
                area.instance_dir().join(file).is_file(),
                "missing instance/{file}"
            );
        }
        assert!(!StagingArea::is_initialized(&area.instance_dir()));
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::for_resource(tmp.path(), "ns", "pg");

        area.write_manifests(&manifests()).unwrap();
        let first = std::fs::read(area.instance_dir().join(MAIN_FILE)).unwrap();
        area.write_manifests(&manifests()).unwrap();
        let second = std::fs::read(area.instance_dir().join(MAIN_FILE)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_staged_credentials_file_ignores_manifests() {
        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::for_resource(tmp.path(), "ns", "pg");
        assert_eq!(area.staged_credentials_file(), None);

        area.write_manifests(&manifests()).unwrap();
        assert_eq!(area.staged_credentials_file(), None);

        let key = area.write_secret_file("sa.json", b"{}").unwrap();
        assert_eq!(area.staged_credentials_file(), Some(key));
    }

    #[cfg(unix)]
    #[test]
    fn test_secret_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::for_resource(tmp.path(), "ns", "pg");

        let path = area.write_secret_file("sa.json", b"{}").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::for_resource(tmp.path(), "ns", "pg");
        area.write_manifests(&manifests()).unwrap();

        area.remove().unwrap();
        assert!(!area.exists());
        area.remove().unwrap();
    }
}
