//! Push payloads and the notifications they produce.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Notification action that closes without navigating.
pub const DISMISS_ACTION: &str = "dismiss";

/// A notification for the host to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Page to open when the notification is clicked.
    pub url: String,
    pub icon: String,
    pub tag: Option<String>,
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            title: "Navi".to_string(),
            body: "You have new updates".to_string(),
            url: "/".to_string(),
            icon: "/icons/icon-192.png".to_string(),
            tag: None,
        }
    }
}

impl Notification {
    /// Build a notification from a push payload.
    ///
    /// Missing fields take defaults; a missing or unparsable payload yields
    /// the default notification.
    pub fn from_push(payload: Option<&[u8]>) -> Self {
        let Some(payload) = payload else {
            return Self::default();
        };
        match serde_json::from_slice(payload) {
            Ok(notification) => notification,
            Err(e) => {
                debug!(error = %e, "Unparsable push payload, using defaults");
                Self::default()
            }
        }
    }
}
