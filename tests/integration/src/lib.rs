//! Integration tests for MediaStack server.
//!
//! These tests require a running MediaStack server at `localhost:3000`
//! (override with `MEDIASTACK_ENDPOINT`). They are marked `#[ignore]` so they
//! don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! STORAGE_BACKEND=memory cargo run -p mediastack-server &
//! cargo test -p mediastack-integration -- --ignored
//! ```

use std::sync::Once;

use serde_json::Value;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Base URL of the server under test.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("MEDIASTACK_ENDPOINT").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// Build a URL for `path` on the server under test.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", endpoint_url().trim_end_matches('/'))
}

/// Create an HTTP client for the server under test.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("build http client")
}

/// Read a response as `(status, json body)`.
pub async fn json_response(resp: reqwest::Response) -> (u16, Value) {
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.expect("json response body");
    (status, body)
}

/// Create a media record of `media_type`, returning its `(id, key)`.
pub async fn create_media(client: &reqwest::Client, media_type: &str) -> (String, String) {
    let resp = client
        .post(url("/api/media/new"))
        .json(&serde_json::json!({ "type": media_type }))
        .send()
        .await
        .expect("POST /api/media/new");
    let (status, body) = json_response(resp).await;
    assert_eq!(status, 200, "create media failed: {body}");
    (
        body["id"].as_str().expect("id").to_owned(),
        body["key"].as_str().expect("key").to_owned(),
    )
}

mod test_media;
mod test_routing;
mod test_upload;
