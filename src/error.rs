//! Error types shared by the backend collaborators, the upload pipeline,
//! the identity session and configuration loading.
//!
//! Every error that can reach the UI carries a `user_message()`: a short,
//! non-technical line. The `Display` output is the operator-facing detail
//! and only goes to the log.

use thiserror::Error;

/// Failures reported by the document store or the object store.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The addressed object or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The backend could not be reached or refused the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// A record without a blob path cannot be deleted
    #[error("record {0} has no storage path")]
    MissingStoragePath(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    /// True when the error means "the thing is already gone".
    pub fn is_not_found(&self) -> bool {
        match self {
            BackendError::NotFound(_) => true,
            BackendError::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            BackendError::NotFound(_) => "That photo no longer exists.".to_string(),
            BackendError::PermissionDenied(_) => "You are not allowed to do that.".to_string(),
            BackendError::Unavailable(_) => "The photo service is unavailable.".to_string(),
            BackendError::MissingStoragePath(_) => "This photo cannot be deleted.".to_string(),
            _ => "Something went wrong talking to the photo service.".to_string(),
        }
    }
}

/// Failures of the upload pipeline.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("file is empty")]
    Empty,

    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl UploadError {
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Empty => "That file is empty.".to_string(),
            UploadError::TooLarge { limit, .. } => {
                format!("That file is too large (max ~{}MB).", limit / (1024 * 1024))
            }
            UploadError::Read { .. } => "Could not read that file.".to_string(),
            UploadError::Backend(err) => err.user_message(),
        }
    }
}

/// Failures of the shared-password identity session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("too many failed attempts")]
    TooManyAttempts,

    #[error("no shared password configured")]
    NotConfigured,
}

impl SessionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::InvalidCredential => "Invalid PIN",
            SessionError::TooManyAttempts => "Too many attempts. Please try again later.",
            SessionError::NotConfigured => "Login failed. Please try again.",
        }
    }
}

/// Failures while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine a data directory")]
    NoDataDir,
}
