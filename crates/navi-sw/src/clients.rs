//! Pages the router can control.

use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use tracing::debug;
use url::Url;

use crate::{OfflineError, Result};

/// A window client (an open application page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Client ID.
    pub id: String,

    /// Client URL.
    pub url: Url,

    /// Whether focused.
    pub focused: bool,

    /// Whether this router controls the page.
    pub controlled: bool,
}

impl Client {
    /// Create an uncontrolled, unfocused client.
    pub fn new(url: Url) -> Self {
        Self {
            id: next_client_id(),
            url,
            focused: false,
            controlled: false,
        }
    }
}

/// Clients registry.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<String, Client>,
}

impl Clients {
    /// Create new clients manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a client by ID.
    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// All clients, ordered by ID.
    pub fn match_all(&self) -> Vec<&Client> {
        let mut all: Vec<&Client> = self.clients.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// First client showing exactly `url`.
    pub fn find_by_url(&self, url: &Url) -> Option<&Client> {
        self.match_all().into_iter().find(|c| &c.url == url)
    }

    /// Open a new focused window at `url`, controlled by this router.
    pub fn open_window(&mut self, url: Url) -> Client {
        for client in self.clients.values_mut() {
            client.focused = false;
        }
        let client = Client {
            focused: true,
            controlled: true,
            ..Client::new(url)
        };
        debug!(id = %client.id, url = %client.url, "Opened window client");
        self.clients.insert(client.id.clone(), client.clone());
        client
    }

    /// Focus a client, unfocusing the others.
    pub fn focus(&mut self, id: &str) -> Result<Client> {
        if !self.clients.contains_key(id) {
            return Err(OfflineError::NotFound(format!("client {id}")));
        }
        for (client_id, client) in self.clients.iter_mut() {
            client.focused = client_id == id;
        }
        self.clients
            .get(id)
            .cloned()
            .ok_or_else(|| OfflineError::NotFound(format!("client {id}")))
    }

    /// Take control of every client. Returns how many were newly claimed.
    pub fn claim(&mut self) -> usize {
        let mut claimed = 0;
        for client in self.clients.values_mut().filter(|c| !c.controlled) {
            client.controlled = true;
            claimed += 1;
        }
        claimed
    }

    /// Add a client.
    pub fn add(&mut self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    /// Remove a client.
    pub fn remove(&mut self, id: &str) -> Option<Client> {
        self.clients.remove(id)
    }

    /// Number of clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether there are no clients.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn next_client_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("client-{:08}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
