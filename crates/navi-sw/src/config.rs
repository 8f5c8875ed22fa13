//! Router configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{OfflineError, Result};

/// Router configuration.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Origin the application is served from. Relative URLs resolve against it.
    pub origin: String,

    /// Literal prefix shared by every generation name.
    pub cache_prefix: String,

    /// Version suffix of the current generation names.
    pub cache_version: String,

    /// URLs fetched and stored in the shell generation at install time.
    pub precache: Vec<String>,

    /// Path prefixes that classify a request as API.
    pub api_prefixes: Vec<String>,

    /// Path substrings that classify a request as API.
    pub api_substrings: Vec<String>,

    /// File extensions (without the dot) of static assets.
    pub asset_extensions: Vec<String>,

    /// Subset of extensions that get the placeholder image when offline.
    pub image_extensions: Vec<String>,

    /// Path substrings that classify a request as an asset.
    pub asset_path_markers: Vec<String>,

    /// Host or path substrings identifying icon fonts.
    pub icon_font_markers: Vec<String>,

    /// Top-level application routes served from the shell generation.
    pub shell_routes: Vec<String>,

    /// Dynamic responses are cached only if `content-length` is below this.
    pub dynamic_cache_max_bytes: u64,

    /// Background refresh targets.
    pub refresh: RefreshConfig,
}

/// Background refresh targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Jobs list endpoint.
    pub jobs_url: String,

    /// User profile endpoint.
    pub profile_url: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000/".to_string(),
            cache_prefix: "navi-".to_string(),
            cache_version: "v1".to_string(),
            precache: strings(&["/", "/manifest.json"]),
            api_prefixes: strings(&["/api/", "/proxy/"]),
            api_substrings: strings(&["/graphql", "/.netlify/functions/"]),
            asset_extensions: strings(&[
                "css", "js", "mjs", "map", "woff", "woff2", "ttf", "otf", "eot", "png", "jpg",
                "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp",
            ]),
            image_extensions: strings(&[
                "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp",
            ]),
            asset_path_markers: strings(&["/assets/"]),
            icon_font_markers: strings(&[
                "material-icons",
                "material-symbols",
                "fonts.googleapis",
                "fonts.gstatic",
            ]),
            shell_routes: strings(&[
                "/dashboard",
                "/jobs",
                "/resume",
                "/portfolio",
                "/chat",
                "/profile",
                "/settings",
                "/achievements",
            ]),
            dynamic_cache_max_bytes: 1024 * 1024,
            refresh: RefreshConfig::default(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            jobs_url: "/api/jobs".to_string(),
            profile_url: "/api/profile".to_string(),
        }
    }
}

impl RouterConfig {
    /// Parse a JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// The parsed origin URL.
    pub fn origin_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.origin)?)
    }

    /// Resolve a possibly relative URL against the origin.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        Ok(self.origin_url()?.join(url)?)
    }

    /// Generation name for a kind, e.g. `navi-api-v1`.
    pub fn generation_name(&self, kind: &str) -> String {
        format!("{}{}-{}", self.cache_prefix, kind, self.cache_version)
    }

    /// Check the invariants the router relies on.
    pub fn validate(&self) -> Result<()> {
        if self.cache_prefix.is_empty() {
            return Err(OfflineError::config("cache_prefix must not be empty"));
        }
        if self.cache_version.is_empty() {
            return Err(OfflineError::config("cache_version must not be empty"));
        }
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(OfflineError::config(format!(
                "origin must be http(s), got {origin}"
            )));
        }
        for url in self
            .precache
            .iter()
            .chain([&self.refresh.jobs_url, &self.refresh.profile_url])
        {
            self.resolve(url)?;
        }
        if let Some(ext) = self
            .image_extensions
            .iter()
            .find(|ext| !self.asset_extensions.contains(ext))
        {
            return Err(OfflineError::config(format!(
                "image extension {ext} is not an asset extension"
            )));
        }
        Ok(())
    }
}
