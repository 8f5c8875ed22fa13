//! The four cache generations and the handle that owns them.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheStorage, StoredResponse};
use crate::classify::RequestClass;
use crate::config::RouterConfig;
use crate::message::CacheStatus;
use crate::Result;

/// One of the four concurrently active cache generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    /// Pre-warmed app shell and top-level routes.
    Shell,
    /// Dynamic responses.
    Runtime,
    /// API responses.
    Api,
    /// Static assets.
    Assets,
}

impl Generation {
    /// Every generation, in name order of their kinds.
    pub const ALL: [Generation; 4] = [
        Generation::Shell,
        Generation::Runtime,
        Generation::Api,
        Generation::Assets,
    ];

    /// Kind segment of the generation name.
    pub fn kind(&self) -> &'static str {
        match self {
            Generation::Shell => "cache",
            Generation::Runtime => "runtime",
            Generation::Api => "api",
            Generation::Assets => "assets",
        }
    }

    /// Generation that stores responses for a request class.
    pub fn for_class(class: RequestClass) -> Self {
        match class {
            RequestClass::AppShell => Generation::Shell,
            RequestClass::Api => Generation::Api,
            RequestClass::Asset => Generation::Assets,
            RequestClass::Dynamic => Generation::Runtime,
        }
    }

    fn index(&self) -> usize {
        match self {
            Generation::Shell => 0,
            Generation::Runtime => 1,
            Generation::Api => 2,
            Generation::Assets => 3,
        }
    }
}

/// Owns the storage handle and the current generation names.
///
/// Read failures are reported as misses and logged; callers never see them.
pub struct CacheManager {
    storage: Arc<dyn CacheStorage>,
    prefix: String,
    names: [String; 4],
}

impl CacheManager {
    /// Create a manager for the generations named by `config`.
    pub fn new(storage: Arc<dyn CacheStorage>, config: &RouterConfig) -> Self {
        let names = Generation::ALL.map(|g| config.generation_name(g.kind()));
        Self {
            storage,
            prefix: config.cache_prefix.clone(),
            names,
        }
    }

    /// The underlying storage.
    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Name of a current generation.
    pub fn name(&self, generation: Generation) -> &str {
        &self.names[generation.index()]
    }

    /// All four current generation names.
    pub fn current_names(&self) -> &[String; 4] {
        &self.names
    }

    /// True if `name` belongs to this app but is not a current generation.
    pub fn is_superseded(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && !self.names.iter().any(|n| n == name)
    }

    /// Create a generation if it does not exist yet.
    pub async fn open(&self, generation: Generation) -> Result<()> {
        self.storage.open(self.name(generation)).await
    }

    /// Look up a request key. Storage failures count as a miss.
    pub async fn lookup(&self, generation: Generation, key: &str) -> Option<StoredResponse> {
        let name = self.name(generation);
        match self.storage.match_entry(name, key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(cache = name, key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Look up a key in `preferred` first, then in the other current
    /// generations in [`Generation::ALL`] order.
    pub async fn lookup_any(&self, preferred: Generation, key: &str) -> Option<StoredResponse> {
        if let Some(hit) = self.lookup(preferred, key).await {
            return Some(hit);
        }
        for generation in Generation::ALL.into_iter().filter(|g| *g != preferred) {
            if let Some(hit) = self.lookup(generation, key).await {
                debug!(cache = self.name(generation), key, "Found in another generation");
                return Some(hit);
            }
        }
        None
    }

    /// Store a response, replacing any previous entry for the key.
    pub async fn store(&self, generation: Generation, key: &str, entry: StoredResponse) -> Result<()> {
        let name = self.name(generation);
        self.storage.put(name, key, entry).await?;
        debug!(cache = name, key, "Stored response");
        Ok(())
    }

    /// Delete every superseded generation. Returns the deleted names.
    ///
    /// A store that fails to delete is logged and skipped.
    pub async fn delete_superseded(&self) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.storage.cache_names().await? {
            if self.is_superseded(&name) && self.delete_store(&name).await {
                info!(cache = %name, "Deleted stale cache generation");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Entry counts for every existing store, computed now.
    pub async fn status(&self) -> Result<CacheStatus> {
        let mut status = CacheStatus::default();
        for name in self.storage.cache_names().await? {
            let count = self.storage.keys(&name).await?.len();
            status.total += count;
            status.caches.insert(name, count);
        }
        Ok(status)
    }

    /// Delete every existing store. Returns how many were deleted.
    ///
    /// A store that fails to delete is logged, skipped, and not counted.
    pub async fn clear_all(&self) -> Result<usize> {
        let mut cleared = 0;
        for name in self.storage.cache_names().await? {
            if self.delete_store(&name).await {
                cleared += 1;
            }
        }
        info!(cleared, "Cleared all caches");
        Ok(cleared)
    }

    async fn delete_store(&self, name: &str) -> bool {
        match self.storage.delete_cache(name).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(cache = name, error = %e, "Failed to delete cache");
                false
            }
        }
    }
}
