//! End-to-end server integration tests
//!
//! Runs the full router on a local port with in-memory sources and talks to
//! it over HTTP.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use glyph_core::bitmap::BitmapHeader;
use glyph_core::constants::BMP_DATA_URI_PREFIX;
use glyph_core::TokenMetadata;
use glyph_server::testing::MemorySource;
use glyph_server::{create_router, create_shared_state, SharedSource, SharedState, SourceRegistry};
use reqwest::{Client, StatusCode};
use tokio::net::TcpListener;

/// Test harness for running E2E server tests
pub struct TestHarness {
    pub server_url: String,
    pub state: SharedState,
    pub http: Client,
    _shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestHarness {
    /// Serve the given sources, keyed by their configured chain id
    pub async fn new(sources: Vec<(u64, SharedSource)>) -> Self {
        let registry = SourceRegistry::new(sources, Duration::from_secs(2))
            .await
            .expect("Registry should build");
        let state = create_shared_state(registry);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Bind should succeed");
        let addr = listener.local_addr().expect("Listener has an address");
        let server_url = format!("http://{}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router = create_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        for _ in 0..10 {
            if Client::new()
                .get(format!("{}/health", server_url))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        Self {
            server_url,
            state,
            http: Client::new(),
            _shutdown: Some(shutdown_tx),
        }
    }

    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let resp = self
            .http
            .get(format!("{}{}", self.server_url, path))
            .send()
            .await
            .expect("Request should complete");
        let status = resp.status();
        let body = resp.text().await.expect("Body should be text");
        (status, body)
    }
}

fn bmp_uri(width: i32, height: i32, bits: u16, pixels: &[u8]) -> String {
    let mut buf = BitmapHeader::new(width, height, bits, pixels.len() as u32)
        .to_bytes()
        .to_vec();
    buf.extend_from_slice(pixels);
    format!("{}{}", BMP_DATA_URI_PREFIX, STANDARD.encode(buf))
}

fn glyph_token() -> TokenMetadata {
    TokenMetadata {
        name: "Glyph #1".into(),
        description: "checkerboard".into(),
        // 8x2, 1 bpp, bottom-up
        image: bmp_uri(8, 2, 1, &[0xAA, 0, 0, 0, 0xF0, 0, 0, 0]),
        ..Default::default()
    }
}

fn shared(source: &Arc<MemorySource>) -> SharedSource {
    source.clone()
}

async fn empty_chain_one() -> TestHarness {
    TestHarness::new(vec![(1, Arc::new(MemorySource::new(1)) as SharedSource)]).await
}

#[tokio::test]
async fn test_server_health() {
    let harness = empty_chain_one().await;
    let (status, body) = harness.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_token_rendered_with_query_palette() {
    let source = Arc::new(MemorySource::new(1).with_token("1", glyph_token()));
    let harness = TestHarness::new(vec![(1, shared(&source))]).await;

    let resp = harness
        .http
        .get(format!("{}/1/1?c0=.&c1=%23", harness.server_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[reqwest::header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let body = resp.text().await.unwrap();
    let expected = "ERC721 Token Metadata\n\
                    ====================\n\
                    \n\
                    Chain ID: 1\n\
                    Token ID: 1\n\
                    \n\
                    Name: Glyph #1\n\
                    Description: checkerboard\n\
                    Image (BMP Bitfield):\n  \
                    Dimensions: 8x2, BPP: 1\n  \
                    Bitfield:\n    \
                    ####....\n    \
                    #.#.#.#.\n\n";
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_default_palette() {
    let source = Arc::new(MemorySource::new(1).with_token("1", glyph_token()));
    let harness = TestHarness::new(vec![(1, shared(&source))]).await;

    let (status, body) = harness.get("/1/1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("    ░░░░    \n"));
    assert!(body.contains("    ░ ░ ░ ░ \n"));
}

#[tokio::test]
async fn test_undecodable_bitmap_shows_raw_field() {
    let raw = format!("{}Qk0=", BMP_DATA_URI_PREFIX);
    let metadata = TokenMetadata {
        image: raw.clone(),
        ..Default::default()
    };
    let source = Arc::new(MemorySource::new(1).with_token("2", metadata));
    let harness = TestHarness::new(vec![(1, shared(&source))]).await;

    let (status, body) = harness.get("/1/2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&format!("Image: {}\n", raw)));
    assert!(!body.contains("BMP Bitfield"));
}

#[tokio::test]
async fn test_invalid_path_returns_400() {
    let harness = empty_chain_one().await;

    for path in ["/1", "/1/2/3", "/"] {
        let (status, body) = harness.get(path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "path {}", path);
        assert_eq!(body, "Invalid path. Expected format: /CHAIN_ID/TOKEN_ID");
    }
}

#[tokio::test]
async fn test_non_numeric_segments_return_400() {
    let harness = empty_chain_one().await;

    let (status, _) = harness.get("/mainnet/1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = harness.get("/1/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_chain_returns_400() {
    let harness = empty_chain_one().await;

    let (status, body) = harness.get("/999/1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("no RPC server configured for chain ID 999"));
}

#[tokio::test]
async fn test_missing_token_returns_500() {
    let harness = empty_chain_one().await;

    let (status, body) = harness.get("/1/42").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("Failed to fetch metadata"));
}

#[tokio::test]
async fn test_chain_discovered_through_router() {
    // Registered under a stale key, actually serves chain 10
    let source = Arc::new(MemorySource::new(10).with_token("1", glyph_token()));
    let harness = TestHarness::new(vec![(5, shared(&source))]).await;

    let (status, body) = harness.get("/10/1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Chain ID: 10\n"));

    let (status, _) = harness.get("/10/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(source.probe_count(), 1);
    assert_eq!(harness.state.registry.chain_ids().await, vec![5, 10]);
}

#[tokio::test]
async fn test_server_continues_after_error() {
    let source = Arc::new(MemorySource::new(1).with_token("1", glyph_token()));
    let harness = TestHarness::new(vec![(1, shared(&source))]).await;

    let (status, _) = harness.get("/777/1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = harness.get("/1/1").await;
    assert_eq!(status, StatusCode::OK);
}
