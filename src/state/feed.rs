//! The photo feed: a local, ordered view of every photo record kept in
//! step with the document store's live query, plus per-item deletion.
//!
//! The feed never merges: each snapshot replaces the whole list. Updates
//! are tagged with the generation of the subscription that produced them,
//! so anything arriving after `stop` (or from an earlier subscription) is
//! dropped on the floor.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::data::PhotoRecord;
use super::lightbox::Lightbox;
use crate::backend::{DocumentStore, Listener, ObjectStore};
use crate::error::BackendError;

/// What a live query delivered
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Snapshot(Vec<PhotoRecord>),
    /// Short user-facing message; the detail has already been logged
    Failed(String),
}

/// A [`FeedEvent`] tagged with the subscription that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdate {
    generation: u64,
    pub event: FeedEvent,
}

/// Blob path and record id of a confirmed delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub id: String,
    pub storage_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The blob was already gone; the record was removed anyway
    BlobAlreadyGone,
    /// Someone else removed the record first
    AlreadyRemoved,
}

#[derive(Debug)]
pub struct Feed {
    photos: Arc<[PhotoRecord]>,
    loading: bool,
    error: Option<String>,
    /// Replaced wholesale on every change, never mutated in place
    deleting: Arc<HashSet<String>>,
    pub lightbox: Lightbox,
    listener: Option<Listener>,
    generation: u64,
}

impl Default for Feed {
    fn default() -> Self {
        Self {
            photos: Arc::from(Vec::new()),
            loading: false,
            error: None,
            deleting: Arc::new(HashSet::new()),
            lightbox: Lightbox::default(),
            listener: None,
            generation: 0,
        }
    }
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the live query. Does nothing if one is already running.
    ///
    /// `emit` is called from whatever thread the store delivers on; the
    /// updates it receives must be handed back to [`Feed::apply`].
    pub fn start<F>(&mut self, store: &dyn DocumentStore, emit: F)
    where
        F: Fn(FeedUpdate) + Send + Sync + 'static,
    {
        if self.listener.is_some() {
            debug!("Feed already synchronizing");
            return;
        }

        self.generation += 1;
        self.loading = true;
        self.error = None;

        let generation = self.generation;
        let emit = Arc::new(emit);
        let on_data = emit.clone();
        let on_error = emit;

        let subscribed = store.subscribe(
            Box::new(move |photos: Vec<PhotoRecord>| {
                on_data(FeedUpdate { generation, event: FeedEvent::Snapshot(photos) })
            }),
            Box::new(move |err: BackendError| {
                error!("❌ Photo feed subscription failed: {}", err);
                on_error(FeedUpdate { generation, event: FeedEvent::Failed(err.user_message()) })
            }),
        );

        match subscribed {
            Ok(listener) => {
                info!("🔔 Photo feed synchronizing");
                self.listener = Some(listener);
            }
            Err(err) => {
                error!("❌ Could not open photo feed: {}", err);
                self.loading = false;
                self.error = Some(err.user_message());
            }
        }
    }

    /// Cancel the live query. Safe to call at any time, any number of times.
    pub fn stop(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            listener.cancel();
            info!("🔕 Photo feed stopped");
        }
        self.generation += 1;
        self.loading = false;
        self.lightbox.close();
    }

    #[cfg(test)]
    pub fn is_syncing(&self) -> bool {
        self.listener.is_some()
    }

    /// Apply an update from the live query. Returns false when the update
    /// belongs to a cancelled subscription and was ignored.
    pub fn apply(&mut self, update: FeedUpdate) -> bool {
        if self.listener.is_none() || update.generation != self.generation {
            debug!("Ignoring stale feed update");
            return false;
        }

        match update.event {
            FeedEvent::Snapshot(photos) => {
                self.photos = photos.into();
                self.lightbox.sync(self.photos.clone());
            }
            FeedEvent::Failed(message) => {
                self.error = Some(message);
            }
        }
        self.loading = false;
        true
    }

    pub fn photos(&self) -> &[PhotoRecord] {
        &self.photos
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.deleting.contains(id)
    }

    /// Current deleting set
    #[cfg(test)]
    pub fn deleting(&self) -> Arc<HashSet<String>> {
        self.deleting.clone()
    }

    /// Mark a record as deleting and hand back what the delete needs.
    /// `None` when the record lacks an id or blob path, or is already
    /// being deleted.
    pub fn begin_delete(&mut self, record: &PhotoRecord) -> Option<DeleteRequest> {
        let (id, path) = record.delete_target()?;
        if self.is_deleting(id) {
            return None;
        }

        let mut next = (*self.deleting).clone();
        next.insert(id.to_string());
        self.deleting = Arc::new(next);

        Some(DeleteRequest { id: id.to_string(), storage_path: path.to_string() })
    }

    /// Clear the deleting mark whatever happened. Returns the alert to show
    /// when the delete failed.
    pub fn finish_delete(
        &mut self,
        id: &str,
        result: &Result<DeleteOutcome, String>,
    ) -> Option<String> {
        if self.deleting.contains(id) {
            let mut next = (*self.deleting).clone();
            next.remove(id);
            self.deleting = Arc::new(next);
        }

        match result {
            Ok(_) => None,
            Err(message) => Some(format!("Failed to delete: {message}")),
        }
    }

    /// Open the lightbox on `index`, clamped into the list
    pub fn open_viewer(&mut self, index: usize) -> bool {
        self.lightbox.open(self.photos.clone(), index)
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Remove the blob, then the record. A blob that is already gone does not
/// stop the record from being removed.
pub async fn delete_photo(
    objects: &dyn ObjectStore,
    documents: &dyn DocumentStore,
    request: &DeleteRequest,
) -> Result<DeleteOutcome, BackendError> {
    let outcome = match objects.delete(&request.storage_path).await {
        Ok(()) => DeleteOutcome::Deleted,
        Err(err) if err.is_not_found() => {
            warn!("⚠️  Blob {} already gone, removing record", request.storage_path);
            DeleteOutcome::BlobAlreadyGone
        }
        Err(err) => return Err(err),
    };

    documents.delete(&request.id).await?;
    info!("🗑️  Deleted photo {}", request.id);
    Ok(outcome)
}

/// Look the stored record up by id and delete it, so the blob path comes
/// from the store rather than from a possibly outdated snapshot. A record
/// without a blob path is refused and left alone.
pub async fn delete_photo_by_id(
    objects: &dyn ObjectStore,
    documents: &dyn DocumentStore,
    id: &str,
) -> Result<DeleteOutcome, BackendError> {
    let Some(record) = documents.get(id).await? else {
        debug!("Record {} already removed", id);
        return Ok(DeleteOutcome::AlreadyRemoved);
    };

    let Some((id, path)) = record.delete_target() else {
        warn!("⚠️  Record {} has no storage path, not deleting", id);
        return Err(BackendError::MissingStoragePath(id.to_string()));
    };

    let request = DeleteRequest { id: id.to_string(), storage_path: path.to_string() };
    delete_photo(objects, documents, &request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{record, FakeDocuments, FakeObjects};
    use std::sync::Mutex;

    /// Start a feed whose updates are queued for manual delivery
    fn started(store: &FakeDocuments) -> (Feed, Arc<Mutex<Vec<FeedUpdate>>>) {
        let queue = Arc::new(Mutex::new(Vec::new()));
        let sink = queue.clone();
        let mut feed = Feed::new();
        feed.start(store, move |update| sink.lock().unwrap().push(update));
        (feed, queue)
    }

    fn drain(feed: &mut Feed, queue: &Mutex<Vec<FeedUpdate>>) -> Vec<bool> {
        let updates: Vec<FeedUpdate> = queue.lock().unwrap().drain(..).collect();
        updates.into_iter().map(|u| feed.apply(u)).collect()
    }

    fn ids(feed: &Feed) -> Vec<&str> {
        feed.photos().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_snapshot_replaces_list() {
        let store = FakeDocuments::with_records(vec![record("a", Some("pa")), record("b", Some("pb"))]);
        let (mut feed, queue) = started(&store);
        assert!(feed.is_loading());

        drain(&mut feed, &queue);
        assert!(!feed.is_loading());
        assert_eq!(ids(&feed), vec!["a", "b"]);

        // A later snapshot in a different order wins outright
        let later = FeedUpdate {
            generation: feed.generation,
            event: FeedEvent::Snapshot(vec![record("c", None), record("a", Some("pa"))]),
        };
        assert!(feed.apply(later));
        assert_eq!(ids(&feed), vec!["c", "a"]);
    }

    #[test]
    fn test_every_snapshot_sequence_ends_on_the_last_one() {
        let store = FakeDocuments::default();
        let (mut feed, queue) = started(&store);
        drain(&mut feed, &queue);

        let sequences = [
            vec!["a"],
            vec!["a", "b", "c"],
            vec![],
            vec!["c", "b"],
            vec!["b", "c", "d"],
        ];
        for snapshot in sequences {
            let records = snapshot.iter().map(|id| record(id, None)).collect();
            feed.apply(FeedUpdate { generation: feed.generation, event: FeedEvent::Snapshot(records) });
            assert_eq!(ids(&feed), snapshot);
        }
    }

    #[test]
    fn test_subscription_failure_sets_error_and_clears_loading() {
        let store = FakeDocuments::default();
        let (mut feed, queue) = started(&store);
        queue.lock().unwrap().clear();

        store.fail_subscribers("stream broke");
        drain(&mut feed, &queue);

        assert!(!feed.is_loading());
        assert_eq!(feed.error(), Some("The photo service is unavailable."));
    }

    #[test]
    fn test_updates_after_stop_are_ignored() {
        let store = FakeDocuments::with_records(vec![record("a", Some("pa"))]);
        let (mut feed, queue) = started(&store);
        drain(&mut feed, &queue);

        let late = FeedUpdate {
            generation: feed.generation,
            event: FeedEvent::Snapshot(Vec::new()),
        };
        feed.stop();
        feed.stop();

        assert!(!feed.apply(late));
        assert_eq!(ids(&feed), vec!["a"]);
        assert_eq!(store.subscriber_count(), 0);

        // The store no longer reaches the feed at all
        store.broadcast();
        assert!(queue.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stop_before_first_snapshot() {
        let store = FakeDocuments::default();
        let mut feed = Feed::new();
        feed.stop();
        feed.start(&store, |_| {});
        feed.stop();
        assert!(!feed.is_syncing());
        assert!(!feed.is_loading());
    }

    #[test]
    fn test_start_twice_keeps_one_subscription() {
        let store = FakeDocuments::default();
        let (mut feed, _queue) = started(&store);
        feed.start(&store, |_| {});
        assert_eq!(store.subscriber_count(), 1);

        drop(feed);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_restart_ignores_previous_generation() {
        let store = FakeDocuments::with_records(vec![record("a", None)]);
        let (mut feed, queue) = started(&store);
        let stale: Vec<FeedUpdate> = queue.lock().unwrap().drain(..).collect();

        feed.stop();
        let queue2 = Arc::new(Mutex::new(Vec::new()));
        let sink = queue2.clone();
        feed.start(&store, move |u| sink.lock().unwrap().push(u));

        for update in stale {
            assert!(!feed.apply(update));
        }
        assert_eq!(drain(&mut feed, &queue2), vec![true]);
    }

    #[test]
    fn test_begin_delete_preconditions() {
        let mut feed = Feed::new();

        assert!(feed.begin_delete(&record("a", None)).is_none());
        assert!(feed.begin_delete(&record("", Some("p"))).is_none());

        let request = feed.begin_delete(&record("a", Some("photos/a.jpg"))).unwrap();
        assert_eq!(request.storage_path, "photos/a.jpg");
        assert!(feed.is_deleting("a"));

        // Second attempt while in flight is refused
        assert!(feed.begin_delete(&record("a", Some("photos/a.jpg"))).is_none());
    }

    #[test]
    fn test_deleting_set_is_copy_on_write() {
        let mut feed = Feed::new();
        feed.begin_delete(&record("a", Some("pa"))).unwrap();
        let before = feed.deleting();

        feed.begin_delete(&record("b", Some("pb"))).unwrap();
        feed.finish_delete("a", &Ok(DeleteOutcome::Deleted));

        assert_eq!(before.len(), 1);
        assert!(before.contains("a"));
        assert!(!feed.is_deleting("a"));
        assert!(feed.is_deleting("b"));
    }

    #[test]
    fn test_finish_delete_clears_mark_on_failure() {
        let mut feed = Feed::new();
        feed.begin_delete(&record("a", Some("pa"))).unwrap();

        let alert = feed.finish_delete("a", &Err("You are not allowed to do that.".to_string()));

        assert_eq!(alert.as_deref(), Some("Failed to delete: You are not allowed to do that."));
        assert!(!feed.is_deleting("a"));
    }

    #[test]
    fn test_open_viewer_clamps() {
        let store = FakeDocuments::with_records(vec![record("a", None), record("b", None)]);
        let (mut feed, queue) = started(&store);
        drain(&mut feed, &queue);

        assert!(feed.open_viewer(7));
        assert_eq!(feed.lightbox.index(), 1);

        feed.stop();
        assert!(!feed.lightbox.is_open());
    }

    #[tokio::test]
    async fn test_delete_removes_blob_then_record() {
        let objects = FakeObjects::with_blob("pa");
        let documents = FakeDocuments::with_records(vec![record("a", Some("pa"))]);
        let request = DeleteRequest { id: "a".to_string(), storage_path: "pa".to_string() };

        let outcome = delete_photo(&objects, &documents, &request).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(!objects.contains("pa"));
        assert!(documents.ids().is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_missing_blob_still_removes_record() {
        let objects = FakeObjects::default();
        let documents = FakeDocuments::with_records(vec![record("a", Some("pa"))]);
        let request = DeleteRequest { id: "a".to_string(), storage_path: "pa".to_string() };

        let outcome = delete_photo(&objects, &documents, &request).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::BlobAlreadyGone);
        assert_eq!(*documents.deleted.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_with_blob_failure_keeps_record() {
        let objects = FakeObjects::with_blob("pa");
        objects
            .delete_failures
            .lock()
            .unwrap()
            .push_back(BackendError::PermissionDenied("pa".to_string()));
        let documents = FakeDocuments::with_records(vec![record("a", Some("pa"))]);
        let request = DeleteRequest { id: "a".to_string(), storage_path: "pa".to_string() };

        let mut feed = Feed::new();
        feed.begin_delete(&record("a", Some("pa"))).unwrap();
        let result = delete_photo(&objects, &documents, &request)
            .await
            .map_err(|err| err.user_message());
        let alert = feed.finish_delete("a", &result);

        assert!(alert.is_some());
        assert!(!feed.is_deleting("a"));
        assert_eq!(documents.ids(), vec!["a".to_string()]);
        assert!(objects.contains("pa"));
    }

    #[tokio::test]
    async fn test_delete_record_failure_surfaces() {
        let objects = FakeObjects::with_blob("pa");
        let documents = FakeDocuments::with_records(vec![record("a", Some("pa"))]);
        documents
            .delete_failures
            .lock()
            .unwrap()
            .push_back(BackendError::Unavailable("offline".to_string()));
        let request = DeleteRequest { id: "a".to_string(), storage_path: "pa".to_string() };

        let err = delete_photo(&objects, &documents, &request).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
        assert_eq!(documents.ids(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let objects = FakeObjects::with_blob("pa");
        let documents = FakeDocuments::with_records(vec![record("a", Some("pa")), record("b", None)]);

        let outcome = delete_photo_by_id(&objects, &documents, "a").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(!objects.contains("pa"));

        let outcome = delete_photo_by_id(&objects, &documents, "missing").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::AlreadyRemoved);

        let err = delete_photo_by_id(&objects, &documents, "b").await.unwrap_err();
        assert!(matches!(err, BackendError::MissingStoragePath(_)));
        assert_eq!(documents.ids(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_flow_uses_stored_path() {
        // The snapshot still shows the old path; the store knows the current one
        let objects = FakeObjects::with_blob("photos/new.jpg");
        let documents = FakeDocuments::with_records(vec![record("a", Some("photos/new.jpg"))]);
        let mut feed = Feed::new();

        let request = feed.begin_delete(&record("a", Some("photos/old.jpg"))).unwrap();
        let result = delete_photo_by_id(&objects, &documents, &request.id)
            .await
            .map_err(|err| err.user_message());

        assert_eq!(feed.finish_delete(&request.id, &result), None);
        assert!(!feed.is_deleting("a"));
        assert!(!objects.contains("photos/new.jpg"));
        assert!(documents.ids().is_empty());
    }
}
