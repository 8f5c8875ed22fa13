//! Synthetic responses served when neither network nor cache can answer.

use http::StatusCode;
use navi_net::Response;
use serde::Serialize;

use crate::SW_OFFLINE_HEADER;

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Navi - Offline</title>
  <style>
    body {
      margin: 0;
      min-height: 100vh;
      display: flex;
      align-items: center;
      justify-content: center;
      font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
      background: linear-gradient(135deg, #1e293b 0%, #0f172a 100%);
      color: #e2e8f0;
      text-align: center;
    }
    .card { max-width: 420px; padding: 2.5rem 2rem; }
    .icon { font-size: 3rem; margin-bottom: 1rem; }
    h1 { font-size: 1.5rem; margin: 0 0 0.75rem; }
    p { color: #94a3b8; line-height: 1.5; margin: 0 0 1.5rem; }
    button {
      background: #6366f1;
      color: #fff;
      border: 0;
      border-radius: 8px;
      padding: 0.75rem 1.5rem;
      font-size: 1rem;
      cursor: pointer;
    }
    button:hover { background: #4f46e5; }
  </style>
</head>
<body>
  <div class="card">
    <div class="icon">&#128268;</div>
    <h1>You're offline</h1>
    <p>Navi can't reach the network right now. Pages you've already visited are still available, and this page will reload as soon as you're back online.</p>
    <button onclick="window.location.reload()">Try again</button>
  </div>
  <script>
    window.addEventListener('online', function () { window.location.reload(); });
  </script>
</body>
</html>
"#;

const PLACEHOLDER_IMAGE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="200" viewBox="0 0 300 200"><rect width="300" height="200" fill="#f0f0f0"/><text x="150" y="100" text-anchor="middle" dominant-baseline="middle" font-family="sans-serif" font-size="14" fill="#999">Image unavailable offline</text></svg>"##;

/// Default message carried by the offline JSON envelope.
pub const OFFLINE_MESSAGE: &str =
    "You are offline and this data is not cached. Please check your connection.";

#[derive(Serialize)]
struct OfflineEnvelope<'a> {
    error: &'static str,
    message: &'a str,
    cached: bool,
    timestamp: String,
}

/// Full offline HTML page that reloads itself when connectivity returns.
pub fn offline_page() -> Response {
    Response::new(StatusCode::OK, OFFLINE_PAGE)
        .with_header("content-type", "text/html; charset=utf-8")
}

/// Offline JSON envelope for API requests.
///
/// Status is 200; callers recognise the fallback by the `sw-offline: true`
/// header and must not treat it as fresh data.
pub fn offline_json(message: &str) -> Response {
    let envelope = OfflineEnvelope {
        error: "offline",
        message,
        cached: false,
        timestamp: navi_common::iso_timestamp(),
    };
    let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| b"{\"error\":\"offline\"}".to_vec());

    Response::new(StatusCode::OK, body)
        .with_header("content-type", "application/json")
        .with_header(SW_OFFLINE_HEADER, "true")
}

/// 300×200 placeholder SVG for images that cannot be loaded.
pub fn placeholder_image() -> Response {
    Response::new(StatusCode::OK, PLACEHOLDER_IMAGE).with_header("content-type", "image/svg+xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_offline_page() {
        let response = offline_page();
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.header("content-type").unwrap().starts_with("text/html"));

        let html = response.text().unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("window.location.reload()"));
        assert!(html.contains("addEventListener('online'"));
    }

    #[test]
    fn test_offline_json() {
        let response = offline_json(OFFLINE_MESSAGE);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header("sw-offline"), Some("true"));
        assert_eq!(response.header("content-type"), Some("application/json"));

        let body: Value = response.json().unwrap();
        assert_eq!(body["error"], "offline");
        assert_eq!(body["cached"], false);
        assert_eq!(body["message"], OFFLINE_MESSAGE);
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_placeholder_image() {
        let response = placeholder_image();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("image/svg+xml"));

        let svg = response.text().unwrap();
        assert!(svg.contains(r#"width="300""#));
        assert!(svg.contains(r#"height="200""#));
        assert!(svg.contains("Image unavailable offline"));
    }
}
