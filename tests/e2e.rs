//! End-to-end tests for the gateway pipeline without HTTP
//!
//! Config -> registry -> source -> metadata -> text

use std::sync::Arc;
use std::time::Duration;

use glyph_core::{GatewayConfig, Palette, TokenMetadata, LEGACY_CHAIN_ID};
use glyph_server::testing::MemorySource;
use glyph_server::{
    same_source, AppState, RegistryError, ServerError, SharedSource, SourceRegistry,
};

fn named(name: &str) -> TokenMetadata {
    TokenMetadata {
        name: name.into(),
        ..Default::default()
    }
}

/// Legacy env config: one source whose chain id is learned at startup
#[tokio::test]
async fn test_legacy_config_to_rendered_token() {
    let config = GatewayConfig::from_vars([
        ("RPC_URL", "http://localhost:8545"),
        ("CONTRACT_ADDRESS", "0x0000000000000000000000000000000000000001"),
    ])
    .unwrap();
    assert!(config.is_legacy());
    assert_eq!(config.sources.keys().copied().collect::<Vec<_>>(), vec![LEGACY_CHAIN_ID]);

    let source = Arc::new(MemorySource::new(11155111).with_token("5", named("Sepolia Glyph")));
    let entries: Vec<(u64, SharedSource)> = config
        .sources
        .keys()
        .map(|&chain_id| (chain_id, source.clone() as SharedSource))
        .collect();

    let registry = SourceRegistry::new(entries, config.probe_timeout())
        .await
        .unwrap();
    assert_eq!(registry.chain_ids().await, vec![11155111]);

    let state = AppState::new(registry);
    let text = state.render_token("11155111", "5", None).await.unwrap();
    assert!(text.contains("Chain ID: 11155111\n"));
    assert!(text.contains("Name: Sepolia Glyph\n"));

    assert!(matches!(
        state.render_token("0", "5", None).await,
        Err(ServerError::NoSource { chain_id: 0, .. })
    ));
}

/// Several chains, one of them served by an endpoint registered elsewhere
#[tokio::test]
async fn test_multi_chain_routing() {
    let mainnet = Arc::new(MemorySource::new(1).with_token("1", named("Mainnet")));
    let base = Arc::new(MemorySource::new(8453).with_token("1", named("Base")));

    let registry = SourceRegistry::new(
        [
            (1, mainnet.clone() as SharedSource),
            (84532, base.clone() as SharedSource),
        ],
        Duration::from_secs(1),
    )
    .await
    .unwrap();
    let state = AppState::new(registry);

    let text = state.render_token("1", "1", None).await.unwrap();
    assert!(text.contains("Name: Mainnet\n"));
    assert_eq!(mainnet.probe_count(), 0);

    let text = state.render_token("8453", "1", None).await.unwrap();
    assert!(text.contains("Chain ID: 8453\n"));
    assert!(text.contains("Name: Base\n"));

    let by_old_key = state.registry.resolve(84532).await.unwrap();
    let by_new_key = state.registry.resolve(8453).await.unwrap();
    assert!(same_source(&by_old_key, &by_new_key));
    assert_eq!(state.registry.source_count().await, 2);

    assert_eq!(state.registry.shutdown().await, 2);
    assert_eq!(base.close_count(), 1);
    assert_eq!(mainnet.close_count(), 1);
}

/// Many concurrent requests for an undiscovered chain share one scan
#[tokio::test]
async fn test_concurrent_requests_discover_once() {
    let slow = Arc::new(
        MemorySource::new(137)
            .with_token("9", named("Polygon"))
            .with_probe_delay(Duration::from_millis(30)),
    );
    let registry = SourceRegistry::new([(1, slow.clone() as SharedSource)], Duration::from_secs(1))
        .await
        .unwrap();
    let state = Arc::new(AppState::new(registry));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state.render_token("137", "9", Some("c0=x")).await
        }));
    }
    for handle in handles {
        let text = handle.await.unwrap().unwrap();
        assert!(text.contains("Name: Polygon\n"));
    }

    assert_eq!(slow.probe_count(), 1);
}

#[tokio::test]
async fn test_startup_failure_releases_sources() {
    let good = Arc::new(MemorySource::new(1));
    let legacy = Arc::new(MemorySource::new(1));

    let result = SourceRegistry::new(
        [
            (1, good.clone() as SharedSource),
            (LEGACY_CHAIN_ID, legacy.clone() as SharedSource),
        ],
        Duration::from_secs(1),
    )
    .await;

    assert!(matches!(result, Err(RegistryError::DuplicateChain(1))));
    assert_eq!(good.close_count(), 1);
    assert_eq!(legacy.close_count(), 1);
}

#[test]
fn test_palette_slots_default_independently() {
    let palette = Palette::from_query(Some("c2=%ZZ&c3=&c1=a&c1=b"));
    assert_eq!(palette.token(1), Some("a"));
    assert_eq!(palette.token(2), Some("▒"));
    assert_eq!(palette.token(3), Some("▓"));
}
