//! End-to-end behaviour of the router against a simulated network.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use navi_net::{Request, Response, StaticFetcher};
use navi_sw::{
    CacheStorage, LifecyclePhase, MemoryCacheStorage, Notification, OfflineRouter, RequestClass,
    RouterConfig, StoredResponse, SW_CACHED_HEADER, SW_OFFLINE_HEADER,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use url::Url;

const ORIGIN: &str = "https://navi.test";

struct Env {
    router: OfflineRouter,
    fetcher: Arc<StaticFetcher>,
    storage: Arc<MemoryCacheStorage>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn env() -> Env {
    init_tracing();
    let config = RouterConfig {
        origin: format!("{ORIGIN}/"),
        ..Default::default()
    };
    let fetcher = Arc::new(StaticFetcher::new());
    let storage = Arc::new(MemoryCacheStorage::new());
    let router = OfflineRouter::new(config, storage.clone(), fetcher.clone()).unwrap();
    Env {
        router,
        fetcher,
        storage,
    }
}

fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

fn get(path: &str) -> Request {
    Request::parse_get(&url(path)).unwrap()
}

impl Env {
    async fn fetch(&self, path: &str) -> Response {
        let response = self
            .router
            .on_fetch(&get(path))
            .await
            .unwrap()
            .expect("GET requests are intercepted");
        self.router.background().wait_idle().await;
        response
    }

    async fn send(&self, message: Value) -> Option<Value> {
        let (tx, rx) = oneshot::channel();
        self.router.on_message(&message, Some(tx)).await;
        rx.await.ok()
    }

    async fn seed(&self, cache: &str, count: usize) {
        for i in 0..count {
            let key = url(&format!("/seed/{cache}/{i}"));
            let entry = StoredResponse::from_response(&key, &Response::new(StatusCode::OK, "seed"));
            self.storage.put(cache, &key, entry).await.unwrap();
        }
    }
}

#[tokio::test]
async fn shell_is_served_from_cache_once_offline() {
    let env = env();
    env.fetcher
        .route(&url("/"), Response::new(StatusCode::OK, "<html>shell</html>"))
        .await;

    let online = env.fetch("/").await;
    assert_eq!(online.status, StatusCode::OK);
    assert_eq!(&online.body[..], b"<html>shell</html>");

    env.fetcher.set_online(false);
    let offline = env.fetch("/").await;
    assert_eq!(offline.status, StatusCode::OK);
    assert_eq!(&offline.body[..], b"<html>shell</html>");
    assert_eq!(env.fetcher.calls_for(&url("/")).await, 1);
}

#[tokio::test]
async fn api_offline_without_cache_gets_envelope() {
    let env = env();
    env.fetcher.set_online(false);

    let response = env.fetch("/api/jobs").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(SW_OFFLINE_HEADER), Some("true"));
    assert_eq!(response.header("content-type"), Some("application/json"));
    let body: Value = response.json().unwrap();
    assert_eq!(body["error"], "offline");
    assert_eq!(body["cached"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn image_offline_without_cache_gets_placeholder() {
    let env = env();
    env.fetcher.set_online(false);

    let response = env.fetch("/assets/logo.png").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/svg+xml"));
    assert!(response.text().unwrap().contains("Image unavailable offline"));
}

#[tokio::test]
async fn clear_cache_then_status_is_empty() {
    let env = env();
    env.seed("navi-cache-v1", 5).await;
    env.seed("navi-api-v1", 7).await;
    env.seed("navi-assets-v1", 2).await;

    let status = env.send(json!({"type": "GET_CACHE_STATUS"})).await.unwrap();
    assert_eq!(status["total"], 14);
    assert_eq!(status["caches"]["navi-api-v1"], 7);

    let cleared = env.send(json!({"type": "CLEAR_CACHE"})).await.unwrap();
    assert_eq!(cleared, json!({"cleared": 3}));

    let status = env.send(json!({"type": "GET_CACHE_STATUS"})).await.unwrap();
    assert_eq!(status, json!({"caches": {}, "total": 0}));
}

#[tokio::test]
async fn repeated_api_request_keeps_one_entry() {
    let env = env();
    let jobs = url("/api/jobs");
    env.fetcher
        .route(&jobs, Response::new(StatusCode::OK, r#"[{"id":1}]"#))
        .await;

    env.fetch("/api/jobs").await;
    let first = env
        .storage
        .match_entry("navi-api-v1", &jobs)
        .await
        .unwrap()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    env.fetch("/api/jobs").await;
    let second = env
        .storage
        .match_entry("navi-api-v1", &jobs)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(env.storage.keys("navi-api-v1").await.unwrap(), vec![jobs]);
    assert_eq!(first.body, second.body);
    assert_ne!(first.header(SW_CACHED_HEADER), second.header(SW_CACHED_HEADER));
}

#[tokio::test]
async fn cached_api_response_is_served_offline() {
    let env = env();
    env.fetcher
        .route(&url("/api/profile"), Response::new(StatusCode::OK, r#"{"name":"Ada"}"#))
        .await;
    env.fetch("/api/profile").await;

    env.fetcher.set_online(false);
    let response = env.fetch("/api/profile").await;

    assert_eq!(&response.body[..], br#"{"name":"Ada"}"#);
    assert!(response.header(SW_CACHED_HEADER).is_some());
    assert!(response.header(SW_OFFLINE_HEADER).is_none());
}

#[tokio::test]
async fn failed_api_status_is_returned_but_not_cached() {
    let env = env();
    env.fetcher
        .route(&url("/api/jobs"), Response::new(StatusCode::INTERNAL_SERVER_ERROR, "boom"))
        .await;

    let response = env.fetch("/api/jobs").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(env.storage.keys("navi-api-v1").await.unwrap().is_empty());
}

#[tokio::test]
async fn asset_hit_skips_network() {
    let env = env();
    env.fetcher
        .route(&url("/assets/app.js"), Response::new(StatusCode::OK, "console.log(1)"))
        .await;

    env.fetch("/assets/app.js").await;
    env.fetch("/assets/app.js").await;
    env.fetch("/assets/app.js").await;

    assert_eq!(env.fetcher.calls_for(&url("/assets/app.js")).await, 1);
}

#[tokio::test]
async fn query_string_is_part_of_the_key() {
    let env = env();
    env.fetcher
        .route(&url("/api/jobs?page=1"), Response::new(StatusCode::OK, "one"))
        .await;
    env.fetcher
        .route(&url("/api/jobs?page=2"), Response::new(StatusCode::OK, "two"))
        .await;

    env.fetch("/api/jobs?page=1").await;
    env.fetch("/api/jobs?page=2").await;
    env.fetcher.set_online(false);

    assert_eq!(&env.fetch("/api/jobs?page=1").await.body[..], b"one");
    assert_eq!(&env.fetch("/api/jobs?page=2").await.body[..], b"two");
    assert_eq!(env.storage.keys("navi-api-v1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn dynamic_without_length_is_not_cached() {
    let env = env();
    env.fetcher
        .route(&url("/blog/post"), Response::new(StatusCode::OK, "article"))
        .await;
    env.fetcher
        .route(
            &url("/blog/sized"),
            Response::new(StatusCode::OK, "article").with_header("content-length", "7"),
        )
        .await;

    assert_eq!(env.router.classify(&Url::parse(&url("/blog/post")).unwrap()), RequestClass::Dynamic);
    env.fetch("/blog/post").await;
    env.fetch("/blog/sized").await;

    assert_eq!(
        env.storage.keys("navi-runtime-v1").await.unwrap(),
        vec![url("/blog/sized")]
    );
}

#[tokio::test]
async fn dynamic_offline_without_cache_is_an_error() {
    let env = env();
    env.fetcher.set_online(false);

    let result = env.router.on_fetch(&get("/blog/post")).await;
    assert!(result.unwrap_err().is_network());
}

#[tokio::test]
async fn post_passes_through_untouched() {
    let env = env();
    let request = Request::post(Url::parse(&url("/api/jobs")).unwrap(), Bytes::from_static(b"{}"));

    assert!(env.router.on_fetch(&request).await.unwrap().is_none());
    assert_eq!(env.fetcher.calls(), 0);
    assert!(env.storage.cache_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn install_then_activate_drops_old_generation() {
    let env = env();
    env.fetcher
        .route(&url("/"), Response::new(StatusCode::OK, "<html>"))
        .await;
    env.fetcher
        .route(&url("/manifest.json"), Response::new(StatusCode::OK, "{}"))
        .await;
    env.seed("navi-cache-v0", 3).await;
    env.seed("navi-api-v1", 1).await;

    env.router.on_install().await.unwrap();
    assert!(env.router.should_activate_immediately());
    let report = env.router.on_activate().await;

    assert_eq!(report.deleted, vec!["navi-cache-v0"]);
    assert_eq!(env.router.phase().await, LifecyclePhase::Active);
    assert_eq!(
        env.storage.cache_names().await.unwrap(),
        vec!["navi-api-v1", "navi-cache-v1"]
    );

    env.fetcher.set_online(false);
    assert_eq!(&env.fetch("/").await.body[..], b"<html>");
}

#[tokio::test]
async fn prewarmed_manifest_is_served_offline() {
    let env = env();
    env.fetcher
        .route(&url("/"), Response::new(StatusCode::OK, "<html>"))
        .await;
    env.fetcher
        .route(
            &url("/manifest.json"),
            Response::new(StatusCode::OK, r#"{"name":"Navi"}"#),
        )
        .await;

    env.router.on_install().await.unwrap();
    env.router.on_activate().await;
    env.fetcher.set_online(false);

    let manifest = Url::parse(&url("/manifest.json")).unwrap();
    assert_eq!(env.router.classify(&manifest), RequestClass::Dynamic);
    let response = env.fetch("/manifest.json").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], br#"{"name":"Navi"}"#);
    assert!(env.storage.keys("navi-runtime-v1").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_message_is_ignored() {
    let env = env();
    env.seed("navi-api-v1", 2).await;

    assert!(env.send(json!({"type": "PURGE_EVERYTHING"})).await.is_none());
    assert!(env.send(json!("CLEAR_CACHE")).await.is_none());
    assert_eq!(env.storage.keys("navi-api-v1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn background_sync_refreshes_both_entries() {
    let env = env();
    env.fetcher
        .route(&url("/api/jobs"), Response::new(StatusCode::OK, "jobs"))
        .await;
    env.fetcher
        .route(&url("/api/profile"), Response::new(StatusCode::OK, "profile"))
        .await;

    assert_eq!(env.router.on_sync("background-sync"), 2);
    env.router.background().wait_idle().await;

    env.fetcher.set_online(false);
    assert_eq!(&env.fetch("/api/jobs").await.body[..], b"jobs");
    assert_eq!(&env.fetch("/api/profile").await.body[..], b"profile");
}

#[tokio::test]
async fn notification_click_focuses_or_opens() {
    let env = env();
    let notification = env
        .router
        .on_push(Some(br#"{"title":"New jobs","url":"/jobs"}"#));
    assert_eq!(notification.title, "New jobs");

    let opened = env
        .router
        .on_notification_click(&notification, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(opened.url.as_str(), url("/jobs"));
    assert!(opened.focused);

    let other = Notification {
        url: "/settings".to_string(),
        ..Notification::default()
    };
    env.router
        .on_notification_click(&other, Some("open"))
        .await
        .unwrap();

    let refocused = env
        .router
        .on_notification_click(&notification, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refocused.id, opened.id);
    assert!(refocused.focused);
    assert_eq!(env.router.clients().read().await.len(), 2);
}
