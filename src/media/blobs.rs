//! Filesystem object store
//!
//! Blobs live under `<data_dir>/objects/<path>` and are addressed by
//! `file://` URLs, so the renderer can load them straight from disk.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::backend::{BackendResult, ObjectStore};
use crate::error::BackendError;

const FILE_SCHEME: &str = "file://";

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Store rooted at `<data_dir>/objects`, created if missing
    pub fn open(data_dir: &Path) -> BackendResult<Self> {
        let root = data_dir.join("objects");
        std::fs::create_dir_all(&root)?;
        // Canonical root so URLs are absolute and stable
        let root = root.canonicalize()?;
        info!("📦 Object store at: {}", root.display());
        Ok(Self { root })
    }

    /// Map an object path onto the filesystem, refusing anything that
    /// would escape the root
    fn resolve(&self, path: &str) -> BackendResult<PathBuf> {
        let relative = Path::new(path);
        let clean = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(BackendError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Map a `file://` URL issued by this store back to a file
    fn resolve_url(&self, url: &str) -> BackendResult<PathBuf> {
        let file = url
            .strip_prefix(FILE_SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| BackendError::InvalidPath(url.to_string()))?;
        let relative = file
            .strip_prefix(&self.root)
            .map_err(|_| BackendError::PermissionDenied(url.to_string()))?;
        self.resolve(&relative.to_string_lossy())
    }
}

/// Local file behind a `file://` URL, if it is one
pub fn file_url_path(url: &str) -> Option<PathBuf> {
    url.strip_prefix(FILE_SCHEME).map(PathBuf::from)
}

#[async_trait]
impl ObjectStore for BlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: Option<&str>) -> BackendResult<()> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = bytes.len();
        tokio::fs::write(&file, bytes).await?;
        debug!(
            "💾 Wrote {} ({} bytes, {})",
            path,
            size,
            content_type.unwrap_or("unknown type")
        );
        Ok(())
    }

    async fn url(&self, path: &str) -> BackendResult<String> {
        let file = self.resolve(path)?;
        if !tokio::fs::try_exists(&file).await? {
            return Err(BackendError::NotFound(path.to_string()));
        }
        Ok(format!("{FILE_SCHEME}{}", file.display()))
    }

    async fn delete(&self, path: &str) -> BackendResult<()> {
        let file = self.resolve(path)?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => {
                debug!("🗑️  Deleted blob {}", path);
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(BackendError::NotFound(path.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn read(&self, url: &str) -> BackendResult<Vec<u8>> {
        let file = self.resolve_url(url)?;
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(BackendError::NotFound(url.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_url_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).unwrap();

        store.put("photos/q/abc.jpg", vec![1, 2, 3], Some("image/jpeg")).await.unwrap();
        let url = store.url("photos/q/abc.jpg").await.unwrap();
        assert!(url.starts_with("file://"));
        assert_eq!(store.read(&url).await.unwrap(), vec![1, 2, 3]);

        store.delete("photos/q/abc.jpg").await.unwrap();
        let err = store.delete("photos/q/abc.jpg").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_paths_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).unwrap();

        for bad in ["../x.jpg", "/etc/passwd", "", "photos/../../x"] {
            let err = store.put(bad, vec![0], None).await.unwrap_err();
            assert!(matches!(err, BackendError::InvalidPath(_)), "{bad}");
        }
        let err = store.read("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, BackendError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_url_of_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).unwrap();
        assert!(store.url("photos/none.png").await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_file_url_path() {
        assert_eq!(file_url_path("file:///tmp/a.jpg"), Some(PathBuf::from("/tmp/a.jpg")));
        assert_eq!(file_url_path("https://cdn/a.jpg"), None);
    }
}
