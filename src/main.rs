use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, warn};

mod config;
mod dashboard;
mod error;
mod feed;
mod models;
mod render;

use config::Config;
use dashboard::AppState;
use feed::{build_provider, start_poller, Aggregator};
use render::Surface;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let feed_config = config.feed_config();
    if feed_config.use_mock {
        info!("Mock mode: serving built-in sample data, no provider calls");
    } else {
        info!(
            "Live mode: provider={:?}, timeout={:?}",
            feed_config.provider, feed_config.fetch_timeout
        );
    }

    let provider = build_provider(&feed_config)?;
    if provider.is_none() && !feed_config.use_mock {
        warn!("No provider configured; feeds will fall back to cached or sample data");
    }

    let aggregator = Aggregator::new(feed_config, provider);
    let surface = Surface::new();

    // Re-render regions whenever a category is published
    let bindings = render::bind(&aggregator, surface.clone());
    info!("Bound {} feed(s) to the page", bindings.len());

    let _poller = start_poller(aggregator.clone(), config.poll_interval());

    let app = dashboard::router(AppState {
        aggregator,
        surface,
    });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Page server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run page server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
