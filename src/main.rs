//! Lobby insights service: binary entrypoint.
//! Loads config and the returns dataset, then serves the Axum router.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lobby_insights::config::InsightsConfig;
use lobby_insights::metrics::Metrics;
use lobby_insights::{AppState, CacheStore, InsightsResponse, InsightsService, JsonSource};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lobby_insights=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = InsightsConfig::load()?;
    let ttl = cfg.cache_ttl();

    let source = JsonSource::from_path(&cfg.data.dataset_path)?;
    info!(
        records = source.len(),
        path = %cfg.data.dataset_path.display(),
        "dataset loaded"
    );

    // Install the recorder before anything emits metrics.
    let metrics = Metrics::init(cfg.cache.ttl_ms, cfg.cache.max_entries)?;

    let cache: CacheStore<InsightsResponse> = CacheStore::new(cfg.cache.max_entries);
    if let Some(snapshot) = &cfg.data.snapshot_path {
        let key = InsightsService::cache_key(None);
        match cache.preload_json(&key, snapshot, ttl) {
            Ok(()) => info!(path = %snapshot.display(), "snapshot preloaded"),
            Err(e) => warn!(error = %format!("{e:#}"), "snapshot preload skipped"),
        }
    }

    let service = InsightsService::new(Arc::new(source), cache, ttl);
    let state = AppState::new(service, cfg.request_timeout());
    let app = lobby_insights::router(state).merge(metrics.router());

    let listener = TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    info!(bind = %cfg.server.bind, ttl_ms = cfg.cache.ttl_ms, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
