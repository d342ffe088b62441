use crate::error::SyncError;
use crate::store::FileStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Filesystem-backed file store rooted at one directory, with logical paths
/// like `imports/catalog.csv` and `exports/2025-08-29.csv` mapped to files
/// under the root.
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a logical name, rejecting absolute paths and `..` segments
    /// so locators can never escape the root.
    fn resolve(&self, name: &str) -> Result<PathBuf, SyncError> {
        let rel = Path::new(name);
        let escapes = rel.components().any(|c| {
            !matches!(c, Component::Normal(_) | Component::CurDir)
        });
        if name.trim().is_empty() || escapes {
            return Err(SyncError::MissingInput(format!(
                "invalid file locator {name:?}"
            )));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl FileStore for FsFileStore {
    async fn store(&self, name: &str, bytes: Bytes) -> Result<String, SyncError> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        debug!(locator = name, bytes = bytes.len(), "stored file");
        Ok(name.to_string())
    }

    async fn retrieve(&self, locator: &str) -> Result<Bytes, SyncError> {
        let path = self.resolve(locator)?;
        // A missing file is a caller-input problem here; the Export stage
        // re-wraps it as an unavailable artifact.
        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyncError::MissingInput(format!("no file at {locator}"))
            } else {
                SyncError::Io(e)
            }
        })?;
        Ok(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> FsFileStore {
        let dir = std::env::temp_dir().join(format!("shopsync-fs-{tag}-{}", std::process::id()));
        FsFileStore::new(dir)
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips() {
        let store = temp_store("roundtrip");
        let locator = store
            .store("imports/sample.csv", Bytes::from_static(b"SKU\nW-1\n"))
            .await
            .unwrap();
        let back = store.retrieve(&locator).await.unwrap();
        assert_eq!(&back[..], b"SKU\nW-1\n");
    }

    #[tokio::test]
    async fn retrieve_of_absent_locator_is_missing_input() {
        let store = temp_store("absent");
        let err = store.retrieve("exports/nope.csv").await.unwrap_err();
        assert!(matches!(err, SyncError::MissingInput(_)));
    }

    #[tokio::test]
    async fn locators_cannot_escape_the_root() {
        let store = temp_store("escape");
        assert!(store.retrieve("../outside.csv").await.is_err());
        assert!(store.retrieve("/etc/passwd").await.is_err());
        assert!(store
            .store("", Bytes::from_static(b"x"))
            .await
            .is_err());
    }
}
