//! # Navi Offline Router
//!
//! An intercepting cache router for the Navi career assistant. Every request
//! the application makes passes through [`OfflineRouter::on_fetch`], which
//! classifies it and serves it cache-first or network-first from one of four
//! versioned cache generations, falling back to synthetic offline responses
//! when neither the network nor the cache can answer.
//!
//! ## Features
//!
//! - **Classification**: app shell, API, static asset, dynamic
//! - **Strategies**: cache-first for shell/assets, network-first for API/dynamic
//! - **Fallbacks**: offline page, offline JSON envelope, placeholder image
//! - **Lifecycle**: install (pre-warm), activate (generation GC + client claim)
//! - **Control channel**: skip-waiting, cache status, cache clear
//! - **Background refresh**: jobs list and user profile
//!
//! ## Architecture
//!
//! ```text
//! OfflineRouter
//!     ├── Classifier ──────────── RequestClass
//!     ├── StrategyExecutor
//!     │       ├── CacheManager ── CacheStorage (navi-cache-v1, navi-runtime-v1,
//!     │       │                                 navi-api-v1, navi-assets-v1)
//!     │       ├── Fetch (network)
//!     │       └── BackgroundTasks (cache writes)
//!     ├── LifecycleController ─── Clients
//!     └── refresh jobs / push / notification click
//! ```

use thiserror::Error;

pub mod cache;
pub mod classify;
pub mod clients;
pub mod config;
pub mod fallback;
pub mod lifecycle;
pub mod manager;
pub mod message;
pub mod notify;
pub mod refresh;
pub mod router;
pub mod strategy;
pub mod tasks;

pub use cache::{CacheStorage, MemoryCacheStorage, StoredResponse};
pub use classify::{Classifier, RequestClass};
pub use clients::{Client, Clients};
pub use config::{RefreshConfig, RouterConfig};
pub use lifecycle::{ActivationReport, LifecycleController, LifecyclePhase};
pub use manager::{CacheManager, Generation};
pub use message::{CacheStatus, ClearResult, ControlMessage};
pub use notify::Notification;
pub use refresh::RefreshJob;
pub use router::OfflineRouter;
pub use strategy::{Strategy, StrategyExecutor};
pub use tasks::BackgroundTasks;

/// Header added to responses stored by the network-first path.
pub const SW_CACHED_HEADER: &str = "sw-cached";

/// Header marking a synthetic offline response.
pub const SW_OFFLINE_HEADER: &str = "sw-offline";

/// Errors that can occur in router operations.
#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Network error: {0}")]
    Network(#[from] navi_net::NetError),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("{url} responded with {status}")]
    BadStatus { url: String, status: u16 },

    #[error("Install failed: {0}")]
    Install(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl OfflineError {
    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Create an install error.
    pub fn install(message: impl Into<String>) -> Self {
        Self::Install(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True if the error came from the network layer.
    pub fn is_network(&self) -> bool {
        matches!(self, OfflineError::Network(_))
    }
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, OfflineError>;
