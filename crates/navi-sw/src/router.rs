//! The router: one object the host adapter wires its events into.

use std::sync::Arc;

use http::Method;
use navi_net::{Fetch, Request, Response};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{oneshot, RwLock};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::cache::{CacheStorage, MemoryCacheStorage};
use crate::classify::{Classifier, RequestClass};
use crate::clients::{Client, Clients};
use crate::config::RouterConfig;
use crate::lifecycle::{ActivationReport, LifecycleController, LifecyclePhase};
use crate::manager::CacheManager;
use crate::message::{CacheStatus, ClearResult, ControlMessage};
use crate::notify::{Notification, DISMISS_ACTION};
use crate::refresh::{refresh_entry, RefreshJob};
use crate::strategy::StrategyExecutor;
use crate::tasks::BackgroundTasks;
use crate::Result;

/// Offline cache router.
///
/// The host calls `on_install` once per new version, `on_activate` when the
/// version takes over, and `on_fetch` for every outgoing request.
pub struct OfflineRouter {
    config: RouterConfig,
    classifier: Classifier,
    caches: Arc<CacheManager>,
    fetcher: Arc<dyn Fetch>,
    executor: StrategyExecutor,
    lifecycle: LifecycleController,
    clients: Arc<RwLock<Clients>>,
    tasks: Arc<BackgroundTasks>,
    jobs_url: Url,
    profile_url: Url,
}

impl OfflineRouter {
    /// Create a router over the given storage and network.
    pub fn new(
        config: RouterConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetch>,
    ) -> Result<Self> {
        config.validate()?;

        let precache = config
            .precache
            .iter()
            .map(|u| config.resolve(u))
            .collect::<Result<Vec<_>>>()?;
        let jobs_url = config.resolve(&config.refresh.jobs_url)?;
        let profile_url = config.resolve(&config.refresh.profile_url)?;

        let classifier = Classifier::from_config(&config);
        let caches = Arc::new(CacheManager::new(storage, &config));
        let tasks = Arc::new(BackgroundTasks::new());
        let clients = Arc::new(RwLock::new(Clients::new()));

        let executor = StrategyExecutor::new(
            Arc::clone(&caches),
            Arc::clone(&fetcher),
            Arc::clone(&tasks),
            classifier.clone(),
            config.dynamic_cache_max_bytes,
        );
        let lifecycle = LifecycleController::new(
            Arc::clone(&caches),
            Arc::clone(&fetcher),
            Arc::clone(&clients),
            precache,
        );

        info!(
            prefix = %config.cache_prefix,
            version = %config.cache_version,
            "Offline router created"
        );

        Ok(Self {
            config,
            classifier,
            caches,
            fetcher,
            executor,
            lifecycle,
            clients,
            tasks,
            jobs_url,
            profile_url,
        })
    }

    /// Create a router backed by in-memory cache storage.
    pub fn in_memory(config: RouterConfig, fetcher: Arc<dyn Fetch>) -> Result<Self> {
        Self::new(config, Arc::new(MemoryCacheStorage::new()), fetcher)
    }

    // ==================== Lifecycle ====================

    /// Install event: pre-warm the shell generation.
    pub async fn on_install(&self) -> Result<()> {
        self.lifecycle.install().await
    }

    /// Activate event: drop superseded generations and claim clients.
    pub async fn on_activate(&self) -> ActivationReport {
        self.lifecycle.activate().await
    }

    /// Whether the host should activate right after install.
    pub fn should_activate_immediately(&self) -> bool {
        self.lifecycle.skip_waiting_requested()
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase().await
    }

    // ==================== Fetch ====================

    /// Fetch event.
    ///
    /// `Ok(None)` means the request is not intercepted and the host must send
    /// it unmodified: every non-GET request and every non-http(s) scheme.
    pub async fn on_fetch(&self, request: &Request) -> Result<Option<Response>> {
        if request.method != Method::GET {
            trace!(url = %request.url, method = %request.method, "Passing through non-GET request");
            return Ok(None);
        }
        if !matches!(request.url.scheme(), "http" | "https") {
            trace!(url = %request.url, "Passing through non-http request");
            return Ok(None);
        }

        let class = self.classifier.classify(&request.url);
        self.executor.execute(class, request).await.map(Some)
    }

    /// Classify a URL without serving it.
    pub fn classify(&self, url: &Url) -> RequestClass {
        self.classifier.classify(url)
    }

    // ==================== Messages ====================

    /// Message event.
    ///
    /// Replies go to `reply` when the command has one. Unknown messages are
    /// ignored and the reply port is dropped unanswered.
    pub async fn on_message(&self, data: &Value, reply: Option<oneshot::Sender<Value>>) {
        let Some(message) = ControlMessage::parse(data) else {
            trace!(?data, "Ignoring unknown message");
            return;
        };
        debug!(?message, "Control message received");

        match message {
            ControlMessage::SkipWaiting => {
                if self.lifecycle.skip_waiting().await {
                    self.on_activate().await;
                }
            }
            ControlMessage::GetCacheStatus => match self.cache_status().await {
                Ok(status) => send_reply(reply, &status),
                Err(e) => warn!(error = %e, "Failed to compute cache status"),
            },
            ControlMessage::ClearCache => match self.caches.clear_all().await {
                Ok(cleared) => send_reply(reply, &ClearResult { cleared }),
                Err(e) => warn!(error = %e, "Failed to clear caches"),
            },
        }
    }

    /// Entry counts for every existing generation.
    pub async fn cache_status(&self) -> Result<CacheStatus> {
        self.caches.status().await
    }

    // ==================== Background ====================

    /// Sync event. Spawns the refresh jobs for `tag` and returns how many.
    pub fn on_sync(&self, tag: &str) -> usize {
        let jobs = RefreshJob::for_tag(tag);
        if jobs.is_empty() {
            debug!(tag, "Ignoring unknown sync tag");
        }
        for job in jobs {
            let url = match job {
                RefreshJob::JobsList => self.jobs_url.clone(),
                RefreshJob::UserProfile => self.profile_url.clone(),
            };
            self.tasks.spawn(
                job.name(),
                refresh_entry(Arc::clone(&self.caches), Arc::clone(&self.fetcher), url),
            );
        }
        jobs.len()
    }

    /// Push event.
    pub fn on_push(&self, payload: Option<&[u8]>) -> Notification {
        let notification = Notification::from_push(payload);
        debug!(title = %notification.title, "Push received");
        notification
    }

    /// Notification click: focus a client already showing the target page,
    /// or open a new one. Returns the client, or `None` when dismissed.
    pub async fn on_notification_click(
        &self,
        notification: &Notification,
        action: Option<&str>,
    ) -> Result<Option<Client>> {
        if action == Some(DISMISS_ACTION) {
            return Ok(None);
        }

        let target = self.config.resolve(&notification.url)?;
        let mut clients = self.clients.write().await;
        if let Some(id) = clients.find_by_url(&target).map(|c| c.id.clone()) {
            return clients.focus(&id).map(Some);
        }
        Ok(Some(clients.open_window(target)))
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn caches(&self) -> &Arc<CacheManager> {
        &self.caches
    }

    pub fn clients(&self) -> &Arc<RwLock<Clients>> {
        &self.clients
    }

    /// Tracker for cache writes and refresh jobs.
    pub fn background(&self) -> &Arc<BackgroundTasks> {
        &self.tasks
    }
}

fn send_reply<T: Serialize>(reply: Option<oneshot::Sender<Value>>, value: &T) {
    let Some(reply) = reply else {
        debug!("No reply port supplied");
        return;
    };
    match serde_json::to_value(value) {
        Ok(value) => {
            if reply.send(value).is_err() {
                debug!("Reply port closed before reply");
            }
        }
        Err(e) => warn!(error = %e, "Failed to serialize reply"),
    }
}
