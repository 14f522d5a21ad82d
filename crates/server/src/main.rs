//! linkmirror server entry point.
//!
//! Boots the HTTP server: load configuration, connect the cache,
//! assemble the resolver, and serve until shutdown.

use std::sync::Arc;

use anyhow::Result;
use linkmirror_client::{BrowserOptions, BrowserResolver, RclonePublisher, TargetTemplate};
use linkmirror_core::{AppConfig, CacheService, MemoryCache, RedisCache};
use tracing_subscriber::EnvFilter;

mod error;
mod pipeline;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;
    let template = TargetTemplate::new(&config.url_template)?;

    // cache unavailability is non-fatal at startup too: fall back to
    // an in-process cache and keep serving
    let cache: Arc<dyn CacheService> = match RedisCache::connect(&config.redis_url).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            tracing::warn!("redis unavailable, using in-memory cache: {e}");
            Arc::new(MemoryCache::new())
        }
    };

    let publisher = Arc::new(RclonePublisher::new(&config.rclone_remote, &config.rclone_folder));
    let browser_options = BrowserOptions {
        executable: config.browser_executable.clone(),
        settle_delay: config.settle_delay(),
        step_timeout: config.step_timeout(),
    };
    let resolver = Arc::new(BrowserResolver::new(
        browser_options,
        config.mode,
        config.request_timeout(),
        publisher,
    ));

    let listen_addr = config.listen_addr.clone();
    let state = Arc::new(AppState { config, template, cache, resolver });

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, mode = ?state.config.mode, "linkmirror listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install ctrl-c handler: {e}");
    }
    tracing::info!("shutdown signal received");
}
