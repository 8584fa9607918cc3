//! Collaborator contracts the feed, the upload pipeline and the delete path
//! depend on. Concrete stores are injected as `Arc<dyn ...>` so tests can
//! substitute the in-memory fakes in [`fake`].

use async_trait::async_trait;

use crate::error::BackendError;
use crate::state::data::{NewPhoto, PhotoRecord};

#[cfg(test)]
pub mod fake;

pub type BackendResult<T> = Result<T, BackendError>;

/// Data channel of a live query: one full replacement snapshot per call
pub type OnSnapshot = Box<dyn Fn(Vec<PhotoRecord>) + Send + Sync>;

/// Error channel of a live query
pub type OnError = Box<dyn Fn(BackendError) + Send + Sync>;

/// Handle to a registered live query. `cancel` releases the backend listener
/// and drops both callbacks; it is idempotent, and dropping the handle
/// cancels too.
pub struct Listener {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Listener {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Live-updating collection of photo records
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Registers a live query over every record, newest first (ties broken
    /// by id, descending). The current snapshot follows promptly, possibly
    /// from another thread, then a fresh one after every change; snapshots
    /// arrive in the order the changes were made. Failures after
    /// registration go to `on_error`.
    fn subscribe(&self, on_snapshot: OnSnapshot, on_error: OnError) -> BackendResult<Listener>;

    /// Stores a record, assigning its id and creation time
    async fn insert(&self, photo: NewPhoto) -> BackendResult<String>;

    async fn get(&self, id: &str) -> BackendResult<Option<PhotoRecord>>;

    async fn delete(&self, id: &str) -> BackendResult<()>;
}

/// Durable blob storage keyed by path
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: Option<&str>) -> BackendResult<()>;

    /// Resolvable address of the blob at `path`
    async fn url(&self, path: &str) -> BackendResult<String>;

    /// Fails with [`BackendError::NotFound`] when nothing is stored at `path`
    async fn delete(&self, path: &str) -> BackendResult<()>;

    /// Bytes behind an address returned by [`ObjectStore::url`]
    async fn read(&self, url: &str) -> BackendResult<Vec<u8>>;
}
