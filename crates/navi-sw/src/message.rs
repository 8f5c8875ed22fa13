//! Control messages delivered to the router over the message channel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A recognised control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Leave the waiting phase immediately. No reply.
    SkipWaiting,
    /// Reply with per-generation entry counts.
    GetCacheStatus,
    /// Delete every generation and reply with how many were removed.
    ClearCache,
}

impl ControlMessage {
    /// Parse a message payload. Anything without a known `type` is `None`.
    pub fn parse(data: &Value) -> Option<Self> {
        match data.get("type")?.as_str()? {
            "SKIP_WAITING" => Some(Self::SkipWaiting),
            "GET_CACHE_STATUS" => Some(Self::GetCacheStatus),
            "CLEAR_CACHE" => Some(Self::ClearCache),
            _ => None,
        }
    }
}

/// Reply to `GET_CACHE_STATUS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatus {
    /// Entry count per existing generation.
    pub caches: BTreeMap<String, usize>,
    /// Sum of all entry counts.
    pub total: usize,
}

/// Reply to `CLEAR_CACHE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResult {
    /// Number of generations deleted.
    pub cleared: usize,
}
