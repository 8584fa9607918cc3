//! Identity session: one shared password for everyone
//!
//! The password is never stored, only its SHA-256. Repeated failures lock
//! sign-in for a minute.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::SessionError;

const MAX_FAILED_ATTEMPTS: usize = 5;

fn attempt_window() -> Duration {
    Duration::seconds(60)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: String,
}

#[derive(Debug)]
pub struct Session {
    user: Option<User>,
    uid: String,
    password_sha256: Option<String>,
    failures: Vec<DateTime<Utc>>,
}

/// Hex SHA-256 of a password, the form kept in the config
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

impl Session {
    pub fn new(uid: impl Into<String>, password_sha256: Option<String>) -> Self {
        Self {
            user: None,
            uid: uid.into(),
            password_sha256: password_sha256.map(|h| h.trim().to_lowercase()),
            failures: Vec::new(),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn sign_in(&mut self, password: &str) -> Result<&User, SessionError> {
        self.sign_in_at(password, Utc::now())
    }

    fn sign_in_at(&mut self, password: &str, now: DateTime<Utc>) -> Result<&User, SessionError> {
        let expected = self.password_sha256.as_deref().ok_or_else(|| {
            warn!("⚠️  Sign-in attempted but no shared password is configured");
            SessionError::NotConfigured
        })?;

        self.failures.retain(|at| now - *at < attempt_window());
        if self.failures.len() >= MAX_FAILED_ATTEMPTS {
            warn!("⚠️  Sign-in throttled after {} failures", self.failures.len());
            return Err(SessionError::TooManyAttempts);
        }

        if hash_password(password) != expected {
            self.failures.push(now);
            return Err(SessionError::InvalidCredential);
        }

        self.failures.clear();
        info!("🔓 Signed in as {}", self.uid);
        Ok(self.user.insert(User { uid: self.uid.clone() }))
    }

    pub fn sign_out(&mut self) {
        if self.user.take().is_some() {
            info!("🔒 Signed out");
        }
    }
}
