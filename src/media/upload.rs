//! Upload pipeline
//!
//! Content-addressed: the object path is derived from a SHA-256 of the
//! bytes, so identical files land on the same path and cache forever.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::backend::{DocumentStore, ObjectStore};
use crate::error::UploadError;
use crate::state::data::NewPhoto;

/// Owner segment used when nobody is signed in
const ANONYMOUS_UID: &str = "anonymous";

/// Image extensions picked up by folder import and offered by the picker
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "webp", "avif", "heic"];

/// A file chosen for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl UploadFile {
    /// Read a file from disk, guessing its content type from the extension
    pub async fn read(path: &Path) -> Result<Self, UploadError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let content_type = content_type_for(&name).map(str::to_string);
        Ok(Self { name, bytes, content_type })
    }
}

/// Where an upload ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub id: String,
    pub url: String,
}

/// Result of a folder import operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub imported_count: usize,
    pub failed_count: usize,
}

/// Hex SHA-256 of the content
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Normalized extension from the filename, else from the content type
pub fn detect_ext(name: &str, content_type: Option<&str>) -> String {
    let from_name = Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty());
    if let Some(ext) = from_name {
        return ext;
    }

    let ct = content_type.unwrap_or_default().to_lowercase();
    let ext = if ct.contains("jpeg") {
        "jpg"
    } else if ct.contains("png") {
        "png"
    } else if ct.contains("webp") {
        "webp"
    } else if ct.contains("avif") {
        "avif"
    } else if ct.contains("gif") {
        "gif"
    } else {
        "bin"
    };
    ext.to_string()
}

/// Content type implied by a filename's extension
pub fn content_type_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// `photos/<uid>/<hash>.<ext>`
pub fn object_path(uid: Option<&str>, file: &UploadFile) -> String {
    let uid = uid.filter(|u| !u.is_empty()).unwrap_or(ANONYMOUS_UID);
    let ext = detect_ext(&file.name, file.content_type.as_deref());
    format!("photos/{}/{}.{}", uid, content_hash(&file.bytes), ext)
}

/// Write the blob, then the record referencing it
pub async fn upload_photo(
    objects: &dyn ObjectStore,
    documents: &dyn DocumentStore,
    file: UploadFile,
    uid: Option<&str>,
    max_bytes: u64,
) -> Result<Uploaded, UploadError> {
    let size = file.bytes.len() as u64;
    if size == 0 {
        return Err(UploadError::Empty);
    }
    if size > max_bytes {
        return Err(UploadError::TooLarge { size, limit: max_bytes });
    }

    let path = object_path(uid, &file);
    let content_type = file
        .content_type
        .clone()
        .or_else(|| content_type_for(&file.name).map(str::to_string));

    objects.put(&path, file.bytes, content_type.as_deref()).await?;
    let url = objects.url(&path).await?;

    let id = documents
        .insert(NewPhoto {
            url: url.clone(),
            uid: Some(uid.filter(|u| !u.is_empty()).unwrap_or(ANONYMOUS_UID).to_string()),
            storage_path: Some(path.clone()),
            original_name: Some(file.name),
            size: Some(size),
            content_type,
            variants: None,
        })
        .await?;

    info!("📤 Uploaded {} as {}", path, id);
    Ok(Uploaded { id, url })
}

/// Image files under `folder`, recursively
pub fn find_images(folder: &Path) -> Vec<PathBuf> {
    WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        })
        .collect()
}

/// Upload every image in a folder, one after another
pub async fn import_folder(
    objects: &dyn ObjectStore,
    documents: &dyn DocumentStore,
    folder: &Path,
    uid: Option<&str>,
    max_bytes: u64,
) -> ImportResult {
    let mut result = ImportResult::default();

    info!("🔍 Scanning folder: {}", folder.display());

    for path in find_images(folder) {
        let outcome = match UploadFile::read(&path).await {
            Ok(file) => upload_photo(objects, documents, file, uid, max_bytes).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(_) => {
                result.imported_count += 1;
                if result.imported_count % 25 == 0 {
                    info!("⏳ Imported {} files...", result.imported_count);
                }
            }
            Err(err) => {
                warn!("⚠️  Error importing {}: {}", path.display(), err);
                result.failed_count += 1;
            }
        }
    }

    info!(
        "✅ Import complete: {} new, {} failed",
        result.imported_count, result.failed_count
    );
    result
}
