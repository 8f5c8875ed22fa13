//! A [`Fetch`] implementation that serves canned responses.
//!
//! Used to simulate connectivity loss and to count network round trips.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use http::StatusCode;
use tokio::sync::RwLock;
use tracing::trace;

use crate::{Fetch, NetError, Request, Response};

/// Serves responses registered per URL. Unknown URLs get a 404.
///
/// While offline every fetch fails with [`NetError::RequestFailed`].
pub struct StaticFetcher {
    routes: RwLock<HashMap<String, Response>>,
    online: AtomicBool,
    calls: AtomicUsize,
    calls_by_url: RwLock<HashMap<String, usize>>,
}

impl StaticFetcher {
    /// Create an online fetcher with no routes.
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            calls_by_url: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the response for `url`.
    pub async fn route(&self, url: &str, response: Response) {
        self.routes.write().await.insert(url.to_string(), response);
    }

    /// Toggle connectivity.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Total fetch attempts, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fetch attempts for one URL.
    pub async fn calls_for(&self, url: &str) -> usize {
        self.calls_by_url
            .read()
            .await
            .get(url)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for StaticFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for StaticFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, NetError> {
        let url = request.url.as_str();
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_url
            .write()
            .await
            .entry(url.to_string())
            .or_insert(0) += 1;

        if !self.online.load(Ordering::SeqCst) {
            trace!(url, "Offline, failing fetch");
            return Err(NetError::RequestFailed("network unreachable".to_string()));
        }

        let response = match self.routes.read().await.get(url) {
            Some(response) => response.clone(),
            None => Response::new(StatusCode::NOT_FOUND, "Not Found"),
        };
        Ok(response.with_url(request.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_routes_and_counts() {
        let fetcher = StaticFetcher::new();
        fetcher
            .route("https://navi.test/", Response::new(StatusCode::OK, "home"))
            .await;

        let request = Request::parse_get("https://navi.test/").unwrap();
        let response = fetcher.fetch(&request).await.unwrap();
        assert_eq!(response.text().unwrap(), "home");
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(fetcher.calls_for("https://navi.test/").await, 1);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let fetcher = StaticFetcher::new();
        let request = Request::parse_get("https://navi.test/nope").unwrap();
        let response = fetcher.fetch(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_offline_fails_but_counts() {
        let fetcher = StaticFetcher::new();
        fetcher.set_online(false);

        let request = Request::parse_get("https://navi.test/").unwrap();
        assert!(fetcher.fetch(&request).await.is_err());
        assert_eq!(fetcher.calls(), 1);
    }
}
