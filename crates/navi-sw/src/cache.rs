//! Cache storage: named stores of request URL → stored response.
//!
//! ```text
//! CacheStorage
//!     └── Cache (e.g. navi-api-v1)
//!             └── request URL → StoredResponse
//! ```
//!
//! The router only talks to the [`CacheStorage`] trait. [`MemoryCacheStorage`]
//! is the in-process implementation.

use async_trait::async_trait;
use bytes::Bytes;
use hashbrown::HashMap;
use http::{HeaderName, HeaderValue, StatusCode};
use navi_net::Response;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;
use url::Url;

use crate::Result;

/// Cache key for a request URL: the URL verbatim, query included, fragment dropped.
pub fn request_key(url: &Url) -> String {
    if url.fragment().is_none() {
        return url.as_str().to_string();
    }
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// Snapshot of a response held in a cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
    /// Request URL.
    pub url: String,

    /// Response status.
    pub status: u16,

    /// Response status text.
    pub status_text: String,

    /// Response headers, lowercase names. Values are kept as raw bytes.
    pub headers: HashMap<String, Vec<u8>>,

    /// Response body.
    pub body: Vec<u8>,

    /// Cached at timestamp (ms since epoch).
    pub cached_at: u64,
}

impl StoredResponse {
    /// Snapshot a network response.
    ///
    /// Repeated header values are joined with `", "`.
    pub fn from_response(url: &str, response: &Response) -> Self {
        let mut headers: HashMap<String, Vec<u8>> = HashMap::new();
        for (name, value) in response.headers.iter() {
            let value = value.as_bytes();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.extend_from_slice(b", ");
                    existing.extend_from_slice(value);
                })
                .or_insert_with(|| value.to_vec());
        }

        Self {
            url: url.to_string(),
            status: response.status.as_u16(),
            status_text: response.status_text().to_string(),
            headers,
            body: response.body.to_vec(),
            cached_at: navi_common::unix_millis(),
        }
    }

    /// Set a header, replacing any existing value.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers
            .insert(name.to_ascii_lowercase(), value.as_bytes().to_vec());
    }

    /// Get a header value. `None` if absent or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Rebuild a response from the snapshot.
    pub fn to_response(&self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = Response::new(status, Bytes::from(self.body.clone()));
        for (name, value) in &self.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_bytes(value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers.insert(name, value);
                }
                _ => warn!(header = %name, "Skipping unrepresentable stored header"),
            }
        }
        if let Ok(url) = Url::parse(&self.url) {
            response = response.with_url(url);
        }
        response
    }
}

/// Named-store cache backend.
///
/// Reading from or listing a store that does not exist is not an error: it
/// behaves like an empty store. Writing to one creates it.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if it does not exist.
    async fn open(&self, cache: &str) -> Result<()>;

    /// Check if a store exists.
    async fn has(&self, cache: &str) -> Result<bool>;

    /// Look up a request URL in a store.
    async fn match_entry(&self, cache: &str, url: &str) -> Result<Option<StoredResponse>>;

    /// Store a response, replacing any previous entry for the URL.
    async fn put(&self, cache: &str, url: &str, entry: StoredResponse) -> Result<()>;

    /// Delete one entry. Returns whether it existed.
    async fn delete_entry(&self, cache: &str, url: &str) -> Result<bool>;

    /// All request URLs in a store.
    async fn keys(&self, cache: &str) -> Result<Vec<String>>;

    /// Names of every existing store, sorted.
    async fn cache_names(&self) -> Result<Vec<String>>;

    /// Delete a whole store. Returns whether it existed.
    async fn delete_cache(&self, cache: &str) -> Result<bool>;
}

/// A single named store.
#[derive(Debug, Default)]
pub struct Cache {
    /// Cache name.
    pub name: String,

    /// Cached entries.
    entries: HashMap<String, StoredResponse>,
}

impl Cache {
    /// Create a new cache.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Match a request.
    pub fn match_request(&self, url: &str) -> Option<&StoredResponse> {
        self.entries.get(url)
    }

    /// Add entry.
    pub fn put(&mut self, url: &str, entry: StoredResponse) {
        self.entries.insert(url.to_string(), entry);
    }

    /// Delete entry.
    pub fn delete(&mut self, url: &str) -> bool {
        self.entries.remove(url).is_some()
    }

    /// Get all keys (URLs).
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory [`CacheStorage`].
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<HashMap<String, Cache>>,
}

impl MemoryCacheStorage {
    /// Create new cache storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, cache: &str) -> Result<()> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_insert_with(|| Cache::new(cache));
        Ok(())
    }

    async fn has(&self, cache: &str) -> Result<bool> {
        Ok(self.caches.read().await.contains_key(cache))
    }

    async fn match_entry(&self, cache: &str, url: &str) -> Result<Option<StoredResponse>> {
        Ok(self
            .caches
            .read()
            .await
            .get(cache)
            .and_then(|c| c.match_request(url))
            .cloned())
    }

    async fn put(&self, cache: &str, url: &str, entry: StoredResponse) -> Result<()> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_insert_with(|| Cache::new(cache))
            .put(url, entry);
        Ok(())
    }

    async fn delete_entry(&self, cache: &str, url: &str) -> Result<bool> {
        Ok(self
            .caches
            .write()
            .await
            .get_mut(cache)
            .map(|c| c.delete(url))
            .unwrap_or(false))
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>> {
        let caches = self.caches.read().await;
        let mut keys: Vec<String> = caches
            .get(cache)
            .map(|c| c.keys().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    async fn cache_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.caches.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool> {
        Ok(self.caches.write().await.remove(cache).is_some())
    }
}
