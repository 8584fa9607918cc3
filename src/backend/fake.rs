//! In-memory stores for tests. Failures can be scripted per call.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::{BackendResult, DocumentStore, Listener, ObjectStore, OnError, OnSnapshot};
use crate::error::BackendError;
use crate::state::data::{NewPhoto, PhotoRecord};

type Subscribers = HashMap<u64, (OnSnapshot, OnError)>;

#[derive(Default)]
pub struct FakeDocuments {
    records: Mutex<Vec<PhotoRecord>>,
    subscribers: Arc<Mutex<Subscribers>>,
    next: Mutex<u64>,
    /// Errors returned by upcoming `delete` calls, in order
    pub delete_failures: Mutex<VecDeque<BackendError>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeDocuments {
    pub fn with_records(records: Vec<PhotoRecord>) -> Self {
        let fake = Self::default();
        *fake.records.lock().unwrap() = records;
        fake
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.lock().unwrap().iter().map(|r| r.id.clone()).collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Pushes the current list to every subscriber
    pub fn broadcast(&self) {
        let snapshot = self.records.lock().unwrap().clone();
        for (on_snapshot, _) in self.subscribers.lock().unwrap().values() {
            on_snapshot(snapshot.clone());
        }
    }

    pub fn fail_subscribers(&self, message: &str) {
        for (_, on_error) in self.subscribers.lock().unwrap().values() {
            on_error(BackendError::Unavailable(message.to_string()));
        }
    }
}

#[async_trait]
impl DocumentStore for FakeDocuments {
    fn subscribe(&self, on_snapshot: OnSnapshot, on_error: OnError) -> BackendResult<Listener> {
        let key = {
            let mut next = self.next.lock().unwrap();
            *next += 1;
            *next
        };
        on_snapshot(self.records.lock().unwrap().clone());
        self.subscribers.lock().unwrap().insert(key, (on_snapshot, on_error));

        let subscribers = Arc::downgrade(&self.subscribers);
        Ok(Listener::new(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers.lock().unwrap().remove(&key);
            }
        }))
    }

    async fn insert(&self, photo: NewPhoto) -> BackendResult<String> {
        let id = {
            let mut next = self.next.lock().unwrap();
            *next += 1;
            format!("doc{}", *next)
        };
        let record = PhotoRecord {
            id: id.clone(),
            url: photo.url,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).single(),
            variants: photo.variants,
            uid: photo.uid,
            storage_path: photo.storage_path,
            original_name: photo.original_name,
            size: photo.size,
            content_type: photo.content_type,
        };
        self.records.lock().unwrap().insert(0, record);
        self.broadcast();
        Ok(id)
    }

    async fn get(&self, id: &str) -> BackendResult<Option<PhotoRecord>> {
        Ok(self.records.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&self, id: &str) -> BackendResult<()> {
        if let Some(err) = self.delete_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.records.lock().unwrap().retain(|r| r.id != id);
        self.deleted.lock().unwrap().push(id.to_string());
        self.broadcast();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeObjects {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    /// Errors returned by upcoming `delete` calls, in order
    pub delete_failures: Mutex<VecDeque<BackendError>>,
    pub put_failures: Mutex<VecDeque<BackendError>>,
}

impl FakeObjects {
    pub fn with_blob(path: &str) -> Self {
        let fake = Self::default();
        fake.blobs.lock().unwrap().insert(path.to_string(), vec![1, 2, 3]);
        fake
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(path)
    }
}

#[async_trait]
impl ObjectStore for FakeObjects {
    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: Option<&str>) -> BackendResult<()> {
        if let Some(err) = self.put_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.blobs.lock().unwrap().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn url(&self, path: &str) -> BackendResult<String> {
        Ok(format!("mem://{path}"))
    }

    async fn delete(&self, path: &str) -> BackendResult<()> {
        if let Some(err) = self.delete_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        match self.blobs.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(BackendError::NotFound(path.to_string())),
        }
    }

    async fn read(&self, url: &str) -> BackendResult<Vec<u8>> {
        let path = url.trim_start_matches("mem://");
        self.blobs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(url.to_string()))
    }
}

/// A record as the store would deliver it
pub fn record(id: &str, path: Option<&str>) -> PhotoRecord {
    PhotoRecord {
        id: id.to_string(),
        url: format!("mem://{}", path.unwrap_or(id)),
        created_at: None,
        variants: None,
        uid: Some("q".to_string()),
        storage_path: path.map(str::to_string),
        original_name: None,
        size: None,
        content_type: None,
    }
}
