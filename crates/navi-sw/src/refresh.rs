//! Background refresh of individual API cache entries.

use std::sync::Arc;

use navi_net::{Fetch, Request};
use tracing::info;
use url::Url;

use crate::cache::{request_key, StoredResponse};
use crate::manager::{CacheManager, Generation};
use crate::{OfflineError, Result, SW_CACHED_HEADER};

/// Sync tag that runs every refresh job.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// A scheduled refresh of one API entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshJob {
    /// The jobs list.
    JobsList,
    /// The signed-in user's profile.
    UserProfile,
}

impl RefreshJob {
    /// Jobs triggered by a sync tag. Unknown tags trigger nothing.
    pub fn for_tag(tag: &str) -> &'static [RefreshJob] {
        match tag {
            "refresh-jobs" => &[RefreshJob::JobsList],
            "refresh-profile" => &[RefreshJob::UserProfile],
            BACKGROUND_SYNC_TAG => &[RefreshJob::JobsList, RefreshJob::UserProfile],
            _ => &[],
        }
    }

    /// Name used in logs and task labels.
    pub fn name(&self) -> &'static str {
        match self {
            RefreshJob::JobsList => "refresh-jobs",
            RefreshJob::UserProfile => "refresh-profile",
        }
    }
}

/// Fetch `url` and overwrite its API cache entry if the response is 2xx.
pub async fn refresh_entry(
    caches: Arc<CacheManager>,
    fetcher: Arc<dyn Fetch>,
    url: Url,
) -> Result<()> {
    let response = fetcher.fetch(&Request::get(url.clone())).await?;
    if !response.ok() {
        return Err(OfflineError::BadStatus {
            url: url.to_string(),
            status: response.status.as_u16(),
        });
    }

    let key = request_key(&url);
    let mut entry = StoredResponse::from_response(&key, &response);
    entry.set_header(SW_CACHED_HEADER, &navi_common::iso_timestamp());
    caches.store(Generation::Api, &key, entry).await?;

    info!(url = %key, "Refreshed cache entry");
    Ok(())
}
