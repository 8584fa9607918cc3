//! Shared data structures for the application state
//!
//! These structs represent the photo record as it flows between the
//! document store and the UI layer. Field names on the wire are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named width classes of the pre-generated resized copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    W320,
    W640,
    W1024,
    W1600,
}

impl Tier {
    /// All tiers, narrowest first
    pub const ALL: [Tier; 4] = [Tier::W320, Tier::W640, Tier::W1024, Tier::W1600];

    /// Pixel width of this tier
    pub fn width(self) -> u32 {
        match self {
            Tier::W320 => 320,
            Tier::W640 => 640,
            Tier::W1024 => 1024,
            Tier::W1600 => 1600,
        }
    }
}

/// Addresses of the resized copies of one photo. Any subset may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variants {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w320: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w640: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w1024: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w1600: Option<String>,
}

impl Variants {
    /// Address for one tier, ignoring blank strings
    pub fn get(&self, tier: Tier) -> Option<&str> {
        let url = match tier {
            Tier::W320 => self.w320.as_deref(),
            Tier::W640 => self.w640.as_deref(),
            Tier::W1024 => self.w1024.as_deref(),
            Tier::W1600 => self.w1600.as_deref(),
        };
        url.filter(|u| !u.trim().is_empty())
    }

    /// Present tiers with their addresses, narrowest first
    pub fn available(&self) -> impl Iterator<Item = (Tier, &str)> + '_ {
        Tier::ALL
            .into_iter()
            .filter_map(move |tier| self.get(tier).map(|url| (tier, url)))
    }
}

/// Metadata of one uploaded photo, as delivered by the live query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    /// Assigned by the document store; not part of the stored body
    #[serde(default)]
    pub id: String,
    /// Original full-resolution blob
    pub url: String,
    /// Null until the backend acknowledges the write
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Variants>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl PhotoRecord {
    /// Both preconditions of delete: an id and a blob path
    pub fn delete_target(&self) -> Option<(&str, &str)> {
        let id = self.id.trim();
        let path = self.storage_path.as_deref()?.trim();
        if id.is_empty() || path.is_empty() {
            return None;
        }
        Some((id, path))
    }
}

/// The write side of a record: what the upload pipeline hands to the store.
/// The store assigns `id` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    pub url: String,
    pub uid: Option<String>,
    pub storage_path: Option<String>,
    pub original_name: Option<String>,
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub variants: Option<Variants>,
}
