//! Server-side storage of uploaded artifacts.
//!
//! A client uploads every binary parameter before invoking, under a name
//! produced by [`artifact_name`]. The invoke call then carries only that
//! name; [`UploadStore::rehydrate`] swaps it back for the stored file, and
//! [`UploadStore::discard`] deletes it once the call has been answered.

use bytes::Bytes;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::envelope::Fault;
use crate::params::{Param, Params};

static ARTIFACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^upload-[0-9a-f]{32}-([^/\\]+)$").expect("artifact pattern is valid")
});

/// Unique artifact name for a client-side file called `file_name`.
#[must_use]
pub fn artifact_name(file_name: &str) -> String {
    format!("upload-{}-{}", Uuid::new_v4().simple(), clean_file_name(file_name))
}

/// `name` with path separators and control characters replaced by `_`.
pub(crate) fn clean_file_name(name: &str) -> String {
    let clean: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    if clean.is_empty() || clean == "." || clean == ".." {
        "file".to_string()
    } else {
        clean
    }
}

/// Returns `true` if `name` was produced by [`artifact_name`].
#[must_use]
pub fn is_artifact_name(name: &str) -> bool {
    ARTIFACT.is_match(name)
}

/// Client-side file name embedded in an artifact name.
#[must_use]
pub fn original_name(name: &str) -> Option<&str> {
    ARTIFACT
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Directory of uploaded artifacts.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Stores artifacts under `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `data` into artifact `name` at byte `offset`.
    ///
    /// Chunks may arrive in any order; each one lands at its own offset.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidParameter`] for names not produced by
    /// [`artifact_name`], or an internal fault on I/O failure.
    pub async fn write(&self, name: &str, offset: u64, data: Bytes) -> Result<(), Fault> {
        let path = self.path_of(name)?;
        fs::create_dir_all(&self.dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .await?;
        file.seek(std::io::SeekFrom::Start(offset)).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        debug!(artifact = %name, offset, len = data.len(), "Stored upload chunk");
        Ok(())
    }

    /// Replaces every string parameter naming a stored artifact with its file.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidParameter`] when an artifact name points at a
    /// file that was never uploaded.
    pub async fn rehydrate(&self, params: Params) -> Result<Params, Fault> {
        let mut out = Params::new();
        for (key, param) in params {
            let param = match param.as_str() {
                Some(name) if is_artifact_name(name) => {
                    let path = self.dir.join(name);
                    if !fs::try_exists(&path).await.unwrap_or(false) {
                        return Err(Fault::invalid_parameter(
                            key,
                            format!("upload {name} was not received"),
                        ));
                    }
                    Param::File(path)
                }
                _ => param,
            };
            out.insert(key, param);
        }
        Ok(out)
    }

    /// Stored artifacts referenced by `params` after [`rehydrate`](Self::rehydrate).
    #[must_use]
    pub fn artifacts(&self, params: &Params) -> Vec<PathBuf> {
        params
            .iter()
            .filter_map(|(_, param)| match param {
                Param::File(path) if self.holds(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Deletes consumed artifacts. Failures are logged and skipped.
    pub async fn discard(&self, paths: Vec<PathBuf>) {
        for path in paths {
            match fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Discarded upload"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to discard upload"),
            }
        }
    }

    fn holds(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path())
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_artifact_name)
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, Fault> {
        if !is_artifact_name(name) {
            return Err(Fault::invalid_parameter(
                "name",
                format!("not an upload artifact: {name}"),
            ));
        }
        Ok(self.dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn artifact_names_are_unique_and_recognised() {
        let a = artifact_name("report.pdf");
        let b = artifact_name("report.pdf");
        assert_ne!(a, b);
        assert!(is_artifact_name(&a));
        assert_eq!(original_name(&a), Some("report.pdf"));
        assert!(!is_artifact_name("report.pdf"));
    }

    #[test]
    fn artifact_name_strips_path_separators() {
        let name = artifact_name("../etc/passwd");
        assert!(is_artifact_name(&name));
        assert_eq!(original_name(&name), Some(".._etc_passwd"));
        assert_eq!(original_name(&artifact_name("")), Some("file"));
    }

    #[tokio::test]
    async fn out_of_order_chunks_assemble() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"));
        let name = artifact_name("data.bin");

        store.write(&name, 4, Bytes::from_static(b"5678")).await.unwrap();
        store.write(&name, 0, Bytes::from_static(b"1234")).await.unwrap();

        let stored = std::fs::read(dir.path().join("uploads").join(&name)).unwrap();
        assert_eq!(stored, b"12345678");
    }

    #[tokio::test]
    async fn write_rejects_foreign_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let err = store
            .write("../escape", 0, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.parameter(), Some("name"));
    }

    #[tokio::test]
    async fn rehydrate_swaps_names_for_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let name = artifact_name("a.txt");
        store.write(&name, 0, Bytes::from_static(b"hi")).await.unwrap();

        let params = Params::new()
            .with("file", name.as_str())
            .with("note", "plain")
            .with("n", Value::from(3));
        let out = store.rehydrate(params).await.unwrap();

        assert_eq!(out.get_file("file"), Some(dir.path().join(&name).as_path()));
        assert_eq!(out.get_str("note"), Some("plain"));
        assert_eq!(out.get("n"), Some(&Param::Value(Value::from(3))));
    }

    #[tokio::test]
    async fn discard_removes_consumed_artifacts_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let name = artifact_name("a.txt");
        store.write(&name, 0, Bytes::from_static(b"hi")).await.unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"mine").unwrap();

        let params = Params::new()
            .with("file", name.as_str())
            .with("other", outside.clone());
        let params = store.rehydrate(params).await.unwrap();
        let artifacts = store.artifacts(&params);
        assert_eq!(artifacts, vec![dir.path().join(&name)]);

        store.discard(artifacts.clone()).await;
        store.discard(artifacts).await;

        assert!(!dir.path().join(&name).exists());
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn rehydrate_missing_upload_is_invalid_parameter() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let params = Params::new().with("file", artifact_name("lost.txt"));

        let err = store.rehydrate(params).await.unwrap_err();
        assert_eq!(err.parameter(), Some("file"));
    }
}
