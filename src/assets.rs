//! Asset cache and path composition
//!
//! [`AssetCache::get`] deduplicates loads by URL: concurrent requesters for
//! the same never-before-seen URL share one underlying fetch, resolved
//! entries are returned without touching the fetcher again, and failed loads
//! are not cached so a later request retries. Entries live for the process
//! lifetime (asset sets are small and finite); `clear` exists for the
//! return-to-title hard reset.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::OnceCell;

/// What the requester expects the URL to decode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Audio,
    Json,
}

/// A loaded asset, cheap to clone and share.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    /// Raw image or audio bytes; decoding is the host surface's business.
    Bytes(Arc<Vec<u8>>),
    Json(Arc<Value>),
}

impl Asset {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Asset::Bytes(bytes) => Some(bytes),
            Asset::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Asset::Json(value) => Some(value),
            Asset::Bytes(_) => None,
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum AssetError {
    #[error("failed to load '{url}': {message}")]
    Load { url: String, message: String },

    #[error("failed to decode '{url}': {message}")]
    Decode { url: String, message: String },
}

impl AssetError {
    pub fn load(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Performs the actual load for a URL. Hosts supply the transport
/// (filesystem, HTTP, bundle archive); the cache supplies the coalescing.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str, kind: AssetKind) -> Result<Asset, AssetError>;
}

/// Filesystem-backed fetcher: URLs are paths relative to a base directory.
pub struct FsAssetFetcher {
    base: PathBuf,
}

impl FsAssetFetcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl AssetFetcher for FsAssetFetcher {
    async fn fetch(&self, url: &str, kind: AssetKind) -> Result<Asset, AssetError> {
        let path = self.base.join(url);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AssetError::load(url, e.to_string()))?;

        match kind {
            AssetKind::Image | AssetKind::Audio => Ok(Asset::Bytes(Arc::new(bytes))),
            AssetKind::Json => {
                let value: Value = serde_json::from_slice(&bytes)
                    .map_err(|e| AssetError::decode(url, e.to_string()))?;
                Ok(Asset::Json(Arc::new(value)))
            }
        }
    }
}

/// Request-coalescing cache keyed by URL.
pub struct AssetCache {
    fetcher: Arc<dyn AssetFetcher>,
    entries: Mutex<HashMap<String, Arc<OnceCell<Asset>>>>,
}

impl AssetCache {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resolved entries return immediately; an in-flight load is shared by
    /// all concurrent requesters; otherwise a new load starts. A failed load
    /// leaves no entry behind, so the next `get` retries.
    pub async fn get(&self, url: &str, kind: AssetKind) -> Result<Asset, AssetError> {
        let cell = {
            let mut entries = self.entries.lock().expect("asset cache lock poisoned");
            entries
                .entry(url.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_try_init(|| self.fetcher.fetch(url, kind))
            .await
            .cloned()
    }

    /// Whether `url` has a resolved entry (in-flight loads do not count).
    pub fn contains(&self, url: &str) -> bool {
        let entries = self.entries.lock().expect("asset cache lock poisoned");
        entries.get(url).is_some_and(|cell| cell.get().is_some())
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("asset cache lock poisoned");
        entries.clear();
    }
}

/// Conventional asset directories, composed with filenames from node fields
/// by simple concatenation.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    pub backgrounds: String,
    pub characters: String,
    pub bgm: String,
    pub se: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            backgrounds: "assets/images/backgrounds".to_string(),
            characters: "assets/images/characters".to_string(),
            bgm: "assets/audio/bgm".to_string(),
            se: "assets/audio/se".to_string(),
        }
    }
}

impl AssetPaths {
    pub fn background(&self, name: &str) -> String {
        format!("{}/{}", self.backgrounds, name)
    }

    /// Character art lives at `characters/<name>`, or
    /// `characters/<name>/<expression>.png` when an expression is given.
    pub fn character(&self, name: &str, expression: Option<&str>) -> String {
        match expression {
            Some(expression) => format!("{}/{}/{}.png", self.characters, name, expression),
            None => format!("{}/{}", self.characters, name),
        }
    }

    pub fn bgm(&self, name: &str) -> String {
        format!("{}/{}", self.bgm, name)
    }

    pub fn se(&self, name: &str) -> String {
        format!("{}/{}", self.se, name)
    }
}
