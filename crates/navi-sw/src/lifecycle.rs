//! Install / activate lifecycle.
//!
//! ```text
//! Installing ──install ok──▶ Waiting ──activate──▶ Active
//!                               │                    ▲
//!                               └──skip-waiting──────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use navi_net::{Fetch, Request};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::{request_key, StoredResponse};
use crate::clients::Clients;
use crate::manager::{CacheManager, Generation};
use crate::{OfflineError, Result};

/// Externally observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    /// Install has not completed yet.
    #[default]
    Installing,
    /// Installed; an older version may still control pages.
    Waiting,
    /// Activated and controlling pages.
    Active,
}

/// What activation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Superseded generations that were deleted.
    pub deleted: Vec<String>,
    /// Clients newly brought under control.
    pub claimed: usize,
}

/// Drives install and activation.
pub struct LifecycleController {
    caches: Arc<CacheManager>,
    fetcher: Arc<dyn Fetch>,
    clients: Arc<RwLock<Clients>>,
    precache: Vec<Url>,
    phase: RwLock<LifecyclePhase>,
    skip_waiting: AtomicBool,
}

impl LifecycleController {
    pub fn new(
        caches: Arc<CacheManager>,
        fetcher: Arc<dyn Fetch>,
        clients: Arc<RwLock<Clients>>,
        precache: Vec<Url>,
    ) -> Self {
        Self {
            caches,
            fetcher,
            clients,
            precache,
            phase: RwLock::new(LifecyclePhase::Installing),
            skip_waiting: AtomicBool::new(false),
        }
    }

    /// Current phase.
    pub async fn phase(&self) -> LifecyclePhase {
        *self.phase.read().await
    }

    async fn set_phase(&self, phase: LifecyclePhase) {
        let mut current = self.phase.write().await;
        if *current != phase {
            info!(from = ?*current, to = ?phase, "Lifecycle phase changed");
            *current = phase;
        }
    }

    /// Whether skip-waiting has been requested.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Request immediate activation. Returns true if the router is currently
    /// waiting and should activate now.
    pub async fn skip_waiting(&self) -> bool {
        self.skip_waiting.store(true, Ordering::SeqCst);
        self.phase().await == LifecyclePhase::Waiting
    }

    /// Pre-warm the shell generation.
    ///
    /// Every pre-warm URL must fetch with a 2xx status; otherwise nothing is
    /// stored and the install fails so the host can retry it later. On
    /// success the phase becomes [`LifecyclePhase::Waiting`] with skip-waiting
    /// already requested.
    pub async fn install(&self) -> Result<()> {
        self.set_phase(LifecyclePhase::Installing).await;
        info!(urls = self.precache.len(), "Installing");

        match self.precache_shell().await {
            Ok(()) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                self.set_phase(LifecyclePhase::Waiting).await;
                info!("Install complete");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Install failed");
                Err(e)
            }
        }
    }

    async fn precache_shell(&self) -> Result<()> {
        self.caches.open(Generation::Shell).await?;

        let mut fetched = Vec::with_capacity(self.precache.len());
        for url in &self.precache {
            let response = self.fetcher.fetch(&Request::get(url.clone())).await?;
            if !response.ok() {
                return Err(OfflineError::install(format!(
                    "{url} responded with {}",
                    response.status
                )));
            }
            let key = request_key(url);
            fetched.push((StoredResponse::from_response(&key, &response), key));
        }

        for (entry, key) in fetched {
            self.caches.store(Generation::Shell, &key, entry).await?;
        }
        Ok(())
    }

    /// Delete superseded generations and claim all clients.
    ///
    /// Both steps run concurrently. A failure in one is logged and does not
    /// stop the other; activation always completes.
    pub async fn activate(&self) -> ActivationReport {
        info!("Activating");

        let (cleanup, claimed) = tokio::join!(self.caches.delete_superseded(), self.claim());

        let deleted = cleanup.unwrap_or_else(|e| {
            warn!(error = %e, "Cache cleanup failed during activation");
            Vec::new()
        });

        self.set_phase(LifecyclePhase::Active).await;
        debug!(deleted = ?deleted, claimed, "Activation complete");

        ActivationReport { deleted, claimed }
    }

    async fn claim(&self) -> usize {
        let claimed = self.clients.write().await.claim();
        info!(claimed, "Claimed clients");
        claimed
    }
}
