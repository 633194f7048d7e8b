use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use preview_axum::{preview, PreviewApp};
use preview_blob::{
    ArtifactAdapter, ArtifactConfig, ArtifactError, ArtifactMetadata, ArtifactResult, ArtifactStore, ByteStream,
    MemoryCache, MemoryStore, PutResult, StoredArtifact,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const TOKEN: &str = "test-publish-token";
const TESTING123_SHA256: &str = "0218b3506b9b9de4fd357c0865a393471b73fc5ea972c5731219cfae32cee483";

fn test_app() -> PreviewApp {
    let cache = MemoryCache::new(Duration::from_secs(60), 16, 1024 * 1024);
    let adapter = ArtifactAdapter::new(MemoryStore::new(), ArtifactConfig::default()).with_cache(cache);
    preview(adapter, TOKEN)
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &PreviewApp, request: Request<Body>) -> axum::response::Response {
    app.router.clone().oneshot(request).await.unwrap()
}

fn upload_request(path: &str, body: &'static str, checksum: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("authorization", TOKEN);
    if let Some(checksum) = checksum {
        builder = builder.header("x-checksum", checksum);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Store that fails every call
struct BrokenStore {
    calls: AtomicUsize,
}

#[async_trait]
impl ArtifactStore for BrokenStore {
    async fn put(&self, _path: &str, _metadata: &ArtifactMetadata, _stream: ByteStream) -> ArtifactResult<PutResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ArtifactError::backend(std::io::Error::other("secret bucket credentials rejected")))
    }

    async fn get(&self, _path: &str) -> ArtifactResult<Option<StoredArtifact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ArtifactError::backend(std::io::Error::other("secret bucket credentials rejected")))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn unknown_route_returns_route_not_found() {
    let app = test_app();

    let res = send(&app, Request::builder().uri("/test").body(Body::empty()).unwrap()).await;

    assert_eq!(res.status().as_u16(), 404);
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(json_body(res).await, json!({ "error": "Route not found!" }));
}

#[tokio::test]
async fn upload_must_be_post() {
    let app = test_app();

    let res = send(&app, Request::builder().uri("/upload/test/1/123").body(Body::empty()).unwrap()).await;

    assert_eq!(res.status().as_u16(), 404);
    assert_eq!(json_body(res).await, json!({ "error": "Route not found!" }));
}

#[tokio::test]
async fn upload_requires_auth() {
    let app = test_app();

    let res = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/upload/test/1/123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(res.status().as_u16(), 401);
    assert_eq!(json_body(res).await, json!({ "error": "Invalid authentication!" }));
}

#[tokio::test]
async fn wrong_token_is_rejected_before_body_checks() {
    let app = test_app();

    // body and checksum are both wrong too, auth must still be the reported failure
    let res = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/upload/test/1/123")
            .header("authorization", "Bearer test-publish-token")
            .header("x-checksum", "a")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(res.status().as_u16(), 401);
    assert_eq!(json_body(res).await, json!({ "error": "Invalid authentication!" }));
}

#[tokio::test]
async fn upload_requires_body() {
    let app = test_app();

    let res = send(&app, upload_request("/upload/test/1/123", "", Some(TESTING123_SHA256))).await;

    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(json_body(res).await, json!({ "error": "No body provided!" }));
}

#[tokio::test]
async fn upload_requires_checksum_header() {
    let app = test_app();

    let res = send(&app, upload_request("/upload/test/1/123", "Testing123", None)).await;

    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(json_body(res).await, json!({ "error": "Missing \"x-checksum\" header!" }));
}

#[tokio::test]
async fn upload_needs_valid_checksum() {
    let app = test_app();

    let res = send(&app, upload_request("/upload/test/1/123", "Testing123", Some(TESTING123_SHA256))).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_ne!(json_body(res).await, json!({ "error": "Checksum mismatch!" }));

    let res = send(&app, upload_request("/upload/test/1/123", "Testing123", Some("a"))).await;
    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(json_body(res).await, json!({ "error": "Checksum mismatch!" }));
}

#[tokio::test]
async fn rejected_upload_leaves_key_empty() {
    let app = test_app();

    let res = send(&app, upload_request("/upload/fresh/9/9", "Testing123", Some("a"))).await;
    assert_eq!(res.status().as_u16(), 400);

    let res = send(&app, Request::builder().uri("/download/fresh/9/9").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status().as_u16(), 404);
    assert_eq!(json_body(res).await, json!({ "error": "Build not found!" }));
}

#[tokio::test]
async fn upload_succeeds() {
    let app = test_app();

    let res = send(&app, upload_request("/upload/test/1/123", "Testing123", Some(TESTING123_SHA256))).await;

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await, json!({ "message": "Success!" }));
}

#[tokio::test]
async fn download_must_be_get() {
    let app = test_app();

    let res = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/download/test/1/123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(res.status().as_u16(), 404);
    assert_eq!(json_body(res).await, json!({ "error": "Route not found!" }));
}

#[tokio::test]
async fn invalid_build_404s() {
    let app = test_app();

    let res = send(&app, Request::builder().uri("/download/test/10000/10000").body(Body::empty()).unwrap()).await;

    assert_eq!(res.status().as_u16(), 404);
    assert_eq!(json_body(res).await, json!({ "error": "Build not found!" }));
}

#[tokio::test]
async fn download_succeeds() {
    let app = test_app();

    let res = send(&app, upload_request("/upload/test/1/123", "Testing123", Some(TESTING123_SHA256))).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await, json!({ "message": "Success!" }));

    // once from storage, once from the cache after its write settled
    for _ in 0..2 {
        let res = send(&app, Request::builder().uri("/download/test/1/123").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status().as_u16(), 200);

        let headers = res.headers().clone();
        assert_eq!(headers.get("content-type").unwrap(), "application/java-archive");
        assert_eq!(headers.get("content-disposition").unwrap(), "attachment; filename=\"test-123.jar\"");
        assert_eq!(headers.get("cache-control").unwrap(), "public, max-age=31536000");
        assert_eq!(headers.get("x-checksum").unwrap(), TESTING123_SHA256);

        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Testing123");

        app.state.adapter.flush_cache_writes().await;
    }
}

#[tokio::test]
async fn reupload_replaces_downloaded_content() {
    let app = test_app();
    let second_sha = preview_blob::digest::sha256_hex_bytes(b"Testing456");

    send(&app, upload_request("/upload/test/2/7", "Testing123", Some(TESTING123_SHA256))).await;
    let res = send(&app, upload_request("/upload/test/2/7", "Testing456", Some(&second_sha))).await;
    assert_eq!(res.status().as_u16(), 200);
    app.state.adapter.flush_cache_writes().await;

    let res = send(&app, Request::builder().uri("/download/test/2/7").body(Body::empty()).unwrap()).await;
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Testing456");
}

#[tokio::test]
async fn backend_faults_are_generic_500s() {
    let store = Arc::new(BrokenStore {
        calls: AtomicUsize::new(0),
    });
    let app = preview(ArtifactAdapter::new(store.clone(), ArtifactConfig::default()), TOKEN);

    let res = send(&app, upload_request("/upload/test/1/123", "Testing123", Some(TESTING123_SHA256))).await;
    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body, json!({ "error": "Unknown error occurred" }));
    assert!(!body.to_string().contains("secret"));

    let res = send(&app, Request::builder().uri("/download/test/1/123").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status().as_u16(), 500);
    assert_eq!(json_body(res).await, json!({ "error": "Unknown error occurred" }));

    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let app = test_app();

    let res = send(
        &app,
        Request::builder()
            .uri("/download/test/1/123")
            .header("x-request-id", "req-test-123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(res.headers().get("x-request-id").unwrap(), "req-test-123");
}
