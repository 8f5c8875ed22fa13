//! Request classification.

use std::fmt;

use navi_net::pattern::any_match;
use navi_net::UrlPattern;
use tracing::trace;
use url::Url;

use crate::config::RouterConfig;

/// What kind of resource a request is for. Recomputed per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// The application document and its top-level routes.
    AppShell,
    /// Backend API and proxy calls.
    Api,
    /// Stylesheets, scripts, fonts, images.
    Asset,
    /// Anything else.
    Dynamic,
}

impl RequestClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestClass::AppShell => "APP_SHELL",
            RequestClass::Api => "API",
            RequestClass::Asset => "ASSET",
            RequestClass::Dynamic => "DYNAMIC",
        }
    }
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a URL to its [`RequestClass`].
///
/// Rules are evaluated in order and the first match wins: API, asset, app
/// shell, then dynamic. Matching is case-sensitive and looks only at the host
/// and path, never the query string or fragment.
#[derive(Debug, Clone)]
pub struct Classifier {
    api: Vec<UrlPattern>,
    asset_extensions: Vec<String>,
    image_extensions: Vec<String>,
    asset_paths: Vec<UrlPattern>,
    icon_font_markers: Vec<String>,
    shell_routes: Vec<UrlPattern>,
}

impl Classifier {
    /// Build the rule set from configuration.
    pub fn from_config(config: &RouterConfig) -> Self {
        let api = config
            .api_prefixes
            .iter()
            .map(|p| UrlPattern::prefix(p))
            .chain(config.api_substrings.iter().map(|s| UrlPattern::contains(s)))
            .collect();

        let mut shell_routes = vec![UrlPattern::exact("/")];
        shell_routes.extend(config.shell_routes.iter().map(|r| UrlPattern::prefix(r)));

        Self {
            api,
            asset_extensions: config.asset_extensions.clone(),
            image_extensions: config.image_extensions.clone(),
            asset_paths: config
                .asset_path_markers
                .iter()
                .map(|m| UrlPattern::contains(m))
                .collect(),
            icon_font_markers: config.icon_font_markers.clone(),
            shell_routes,
        }
    }

    /// Classify a request URL.
    pub fn classify(&self, url: &Url) -> RequestClass {
        let path = url.path();

        let class = if any_match(&self.api, path) {
            RequestClass::Api
        } else if self.is_asset(url) {
            RequestClass::Asset
        } else if any_match(&self.shell_routes, path) {
            RequestClass::AppShell
        } else {
            RequestClass::Dynamic
        };

        trace!(url = %url, class = %class, "Classified request");
        class
    }

    /// True if the URL's last path segment has an image extension.
    pub fn is_image(&self, url: &Url) -> bool {
        extension(url.path()).is_some_and(|ext| self.image_extensions.iter().any(|e| e == ext))
    }

    fn is_asset(&self, url: &Url) -> bool {
        let path = url.path();

        if extension(path).is_some_and(|ext| self.asset_extensions.iter().any(|e| e == ext)) {
            return true;
        }
        if any_match(&self.asset_paths, path) {
            return true;
        }

        let host = url.host_str().unwrap_or("");
        self.icon_font_markers
            .iter()
            .any(|marker| host.contains(marker.as_str()) || path.contains(marker.as_str()))
    }
}

/// Extension of the last path segment, without the dot.
fn extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}
