use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

use super::data::{NewPhoto, PhotoRecord, Variants};
use crate::backend::{BackendResult, DocumentStore, Listener, OnError, OnSnapshot};
use crate::error::BackendError;

const SELECT_COLUMNS: &str =
    "SELECT id, url, created_at, variants_json, uid, storage_path, original_name, size, content_type FROM photos";

/// One registered live query
struct Subscriber {
    on_snapshot: OnSnapshot,
    on_error: OnError,
}

struct Inner {
    conn: Mutex<Connection>,
    subscribers: Mutex<HashMap<u64, Arc<Subscriber>>>,
    /// Held from query to delivery so no listener sees an older snapshot
    /// after a newer one
    delivery: Mutex<()>,
    next_subscriber: AtomicU64,
}

/// The Library is the local document store: a SQLite table of photo
/// records with live queries layered on top. Every write re-runs the
/// query and pushes the full result to each listener.
#[derive(Clone)]
pub struct Library {
    inner: Arc<Inner>,
    db_path: PathBuf,
}

impl Library {
    /// Open (or create) the catalog at `<data_dir>/photo_wall.db`
    pub fn open(data_dir: &Path) -> BackendResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("photo_wall.db");

        let conn = Connection::open(&db_path)?;
        info!("📁 Database initialized at: {}", db_path.display());

        Self::with_connection(conn, db_path)
    }

    /// A throwaway catalog
    #[cfg(test)]
    pub fn open_in_memory() -> BackendResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, db_path: PathBuf) -> BackendResult<Self> {
        init_schema(&conn)?;
        Ok(Library {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                subscribers: Mutex::new(HashMap::new()),
                delivery: Mutex::new(()),
                next_subscriber: AtomicU64::new(1),
            }),
            db_path,
        })
    }

    /// Get a count of photos in the library
    pub fn photo_count(&self) -> BackendResult<i64> {
        let conn = self.inner.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Runs a blocking closure against the catalog off the UI thread
    async fn blocking<T, F>(&self, f: F) -> BackendResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> BackendResult<T> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| BackendError::Unavailable(format!("task join error: {e}")))?
    }
}

/// Initialize the database schema.
/// Creates the photos table and its ordering index if they don't exist.
fn init_schema(conn: &Connection) -> BackendResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS photos (
            id              TEXT PRIMARY KEY,
            url             TEXT NOT NULL,
            created_at      INTEGER,
            variants_json   TEXT,
            uid             TEXT,
            storage_path    TEXT,
            original_name   TEXT,
            size            INTEGER,
            content_type    TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_photos_created_at
         ON photos(created_at DESC, id DESC)",
        [],
    )?;

    debug!("✅ Database schema initialized");
    Ok(())
}

impl Inner {
    fn lock_conn(&self) -> BackendResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BackendError::Unavailable("catalog lock poisoned".to_string()))
    }

    /// Every record, newest first. NULL timestamps sort last.
    fn query_all(&self) -> BackendResult<Vec<PhotoRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at IS NULL, created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], read_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn insert(&self, photo: &NewPhoto) -> BackendResult<String> {
        let variants_json = photo
            .variants
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.lock_conn()?;
        let id: String = conn.query_row(
            "INSERT INTO photos (id, url, created_at, variants_json, uid, storage_path, original_name, size, content_type)
             VALUES (lower(hex(randomblob(10))), ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id",
            rusqlite::params![
                &photo.url,
                Utc::now().timestamp_millis(),
                variants_json,
                &photo.uid,
                &photo.storage_path,
                &photo.original_name,
                photo.size.map(|s| s as i64),
                &photo.content_type,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get(&self, id: &str) -> BackendResult<Option<PhotoRecord>> {
        let conn = self.lock_conn()?;
        let record = conn
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id], read_row)
            .optional()?;
        Ok(record)
    }

    fn delete(&self, id: &str) -> BackendResult<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM photos WHERE id = ?1", [id])?;
        Ok(())
    }

    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        // The guard protects ordering only, so a poisoned one is still usable
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscriber(&self, key: u64) -> Option<Arc<Subscriber>> {
        self.subscribers.lock().ok()?.get(&key).cloned()
    }

    /// Re-runs the live query and delivers it to every listener
    fn broadcast(&self) {
        let _delivering = self.lock_delivery();
        let subscribers: Vec<Arc<Subscriber>> = match self.subscribers.lock() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => return,
        };
        for subscriber in subscribers {
            self.deliver(&subscriber);
        }
    }

    /// First snapshot of a new listener, unless it was cancelled already
    fn deliver_initial(&self, key: u64) {
        let _delivering = self.lock_delivery();
        if let Some(subscriber) = self.subscriber(key) {
            self.deliver(&subscriber);
        }
    }

    fn deliver(&self, subscriber: &Subscriber) {
        match self.query_all() {
            Ok(records) => (subscriber.on_snapshot)(records),
            Err(err) => {
                warn!("⚠️  Live query failed: {}", err);
                (subscriber.on_error)(err);
            }
        }
    }

    fn unsubscribe(&self, key: u64) {
        if let Ok(mut map) = self.subscribers.lock() {
            if map.remove(&key).is_some() {
                debug!("🔕 Listener {} removed", key);
            }
        }
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<PhotoRecord> {
    let created_at: Option<i64> = row.get(2)?;
    let variants_json: Option<String> = row.get(3)?;
    let size: Option<i64> = row.get(7)?;

    Ok(PhotoRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        created_at: created_at.and_then(millis_to_utc),
        // A malformed variants column degrades to "no variants"
        variants: variants_json.and_then(|json| serde_json::from_str::<Variants>(&json).ok()),
        uid: row.get(4)?,
        storage_path: row.get(5)?,
        original_name: row.get(6)?,
        size: size.map(|s| s as u64),
        content_type: row.get(8)?,
    })
}

fn millis_to_utc(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[async_trait]
impl DocumentStore for Library {
    fn subscribe(&self, on_snapshot: OnSnapshot, on_error: OnError) -> BackendResult<Listener> {
        let key = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let subscriber = Arc::new(Subscriber { on_snapshot, on_error });

        self.inner
            .subscribers
            .lock()
            .map_err(|_| BackendError::Unavailable("listener registry poisoned".to_string()))?
            .insert(key, subscriber);
        debug!("🔔 Listener {} registered", key);

        // The first query runs off the caller's (UI) thread
        let initial: Weak<Inner> = Arc::downgrade(&self.inner);
        std::thread::spawn(move || {
            if let Some(inner) = initial.upgrade() {
                inner.deliver_initial(key);
            }
        });

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Listener::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.unsubscribe(key);
            }
        }))
    }

    async fn insert(&self, photo: NewPhoto) -> BackendResult<String> {
        self.blocking(move |inner| {
            let id = inner.insert(&photo)?;
            info!("🖼️  Stored photo record {}", id);
            inner.broadcast();
            Ok(id)
        })
        .await
    }

    async fn get(&self, id: &str) -> BackendResult<Option<PhotoRecord>> {
        let id = id.to_string();
        self.blocking(move |inner| inner.get(&id)).await
    }

    async fn delete(&self, id: &str) -> BackendResult<()> {
        let id = id.to_string();
        self.blocking(move |inner| {
            inner.delete(&id)?;
            info!("🗑️  Removed photo record {}", id);
            inner.broadcast();
            Ok(())
        })
        .await
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
