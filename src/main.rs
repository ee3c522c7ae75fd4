use std::sync::Arc;

use recc_api::{
    api::{create_router, AppState, EngineSettings},
    config::{Config, SourceConfig},
    db::{create_pool, Cache},
    services::{
        sources::{CsvRatingSource, PostgresRatingSource},
        RatingSource,
    },
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("recc_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let source: Arc<dyn RatingSource> = match config.source()? {
        SourceConfig::Csv(path) => Arc::new(CsvRatingSource::new(path)),
        SourceConfig::Postgres(url) => Arc::new(PostgresRatingSource::new(create_pool(&url).await?)),
    };

    let (cache, cache_writer) = match &config.redis_url {
        Some(url) => {
            let (cache, handle) = Cache::connect(url, config.cache_ttl_secs).await?;
            (Some(cache), Some(handle))
        }
        None => {
            tracing::info!("REDIS_URL not set, recommendation cache disabled");
            (None, None)
        }
    };

    let settings = EngineSettings {
        scale: config.scale(),
        params: config.neighborhood(),
        default_metric: config.default_metric,
    };
    let state = AppState::load(source, settings, cache).await?;
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
