//! Caching strategies.
//!
//! | Class      | Strategy      | Cached when                      | Offline, no entry   |
//! |------------|---------------|----------------------------------|---------------------|
//! | APP_SHELL  | cache-first   | 2xx                              | offline page        |
//! | ASSET      | cache-first   | 2xx                              | placeholder / error |
//! | API        | network-first | 2xx                              | offline JSON        |
//! | DYNAMIC    | network-first | 2xx and `content-length` < limit | error               |

use std::sync::Arc;

use navi_net::{Fetch, Request, Response};
use tracing::debug;

use crate::cache::{request_key, StoredResponse};
use crate::classify::{Classifier, RequestClass};
use crate::fallback;
use crate::manager::{CacheManager, Generation};
use crate::tasks::BackgroundTasks;
use crate::{Result, SW_CACHED_HEADER};

/// The two request-serving algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from cache if present, otherwise go to the network.
    CacheFirst,
    /// Go to the network, fall back to cache on failure.
    NetworkFirst,
}

impl Strategy {
    pub fn for_class(class: RequestClass) -> Self {
        match class {
            RequestClass::AppShell | RequestClass::Asset => Strategy::CacheFirst,
            RequestClass::Api | RequestClass::Dynamic => Strategy::NetworkFirst,
        }
    }
}

/// Runs the strategy for a classified request.
pub struct StrategyExecutor {
    caches: Arc<CacheManager>,
    fetcher: Arc<dyn Fetch>,
    tasks: Arc<BackgroundTasks>,
    classifier: Classifier,
    dynamic_cache_max_bytes: u64,
}

impl StrategyExecutor {
    pub fn new(
        caches: Arc<CacheManager>,
        fetcher: Arc<dyn Fetch>,
        tasks: Arc<BackgroundTasks>,
        classifier: Classifier,
        dynamic_cache_max_bytes: u64,
    ) -> Self {
        Self {
            caches,
            fetcher,
            tasks,
            classifier,
            dynamic_cache_max_bytes,
        }
    }

    /// Serve a GET request of the given class.
    ///
    /// `Err` is returned only when the network failed, nothing was cached, and
    /// the class has no synthetic substitute.
    pub async fn execute(&self, class: RequestClass, request: &Request) -> Result<Response> {
        match Strategy::for_class(class) {
            Strategy::CacheFirst => self.cache_first(class, request).await,
            Strategy::NetworkFirst => self.network_first(class, request).await,
        }
    }

    async fn cache_first(&self, class: RequestClass, request: &Request) -> Result<Response> {
        let generation = Generation::for_class(class);
        let key = request_key(&request.url);

        if let Some(hit) = self.caches.lookup(generation, &key).await {
            debug!(url = %key, class = %class, "Cache hit");
            return Ok(hit.to_response());
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    let entry = StoredResponse::from_response(&key, &response);
                    self.store_in_background(generation, key, entry);
                }
                Ok(response)
            }
            Err(e) => match class {
                RequestClass::Asset if self.classifier.is_image(&request.url) => {
                    debug!(url = %key, error = %e, "Image unavailable, serving placeholder");
                    Ok(fallback::placeholder_image())
                }
                RequestClass::AppShell => {
                    debug!(url = %key, error = %e, "Shell unavailable, serving offline page");
                    Ok(fallback::offline_page())
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn network_first(&self, class: RequestClass, request: &Request) -> Result<Response> {
        let generation = Generation::for_class(class);
        let key = request_key(&request.url);

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() && self.should_cache(class, &response) {
                    let mut annotated = StoredResponse::from_response(&key, &response);
                    annotated.set_header(SW_CACHED_HEADER, &navi_common::iso_timestamp());
                    self.store_in_background(generation, key, annotated);
                } else {
                    debug!(url = %key, status = %response.status, "Response not cached");
                }
                Ok(response)
            }
            Err(e) => {
                if let Some(hit) = self.caches.lookup_any(generation, &key).await {
                    debug!(url = %key, error = %e, "Network failed, serving cached response");
                    return Ok(hit.to_response());
                }
                match class {
                    RequestClass::Api => {
                        debug!(url = %key, error = %e, "Network failed, serving offline envelope");
                        Ok(fallback::offline_json(fallback::OFFLINE_MESSAGE))
                    }
                    _ => Err(e.into()),
                }
            }
        }
    }

    /// Dynamic responses are cached only with a numeric `content-length`
    /// below the limit; a missing header means the response is not cached.
    fn should_cache(&self, class: RequestClass, response: &Response) -> bool {
        match class {
            RequestClass::Dynamic => response
                .content_length()
                .is_some_and(|len| len < self.dynamic_cache_max_bytes),
            _ => true,
        }
    }

    fn store_in_background(&self, generation: Generation, key: String, entry: StoredResponse) {
        let caches = Arc::clone(&self.caches);
        self.tasks.spawn("cache-write", async move {
            caches.store(generation, &key, entry).await
        });
    }
}
