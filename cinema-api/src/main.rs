use anyhow::Context;
use cinema_api::{app, AppState, AuthConfig};
use cinema_store::app_config::{Config, StorageBackend};
use cinema_store::{DbClient, PgReservationRepository, PgShowRepository, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinema_api=debug,cinema_store=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
    };
    let page_size = config.pagination.page_size;

    let state = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            AppState::in_memory(auth, page_size)
        }
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;

            let redis = RedisClient::new(&config.redis.url)
                .await
                .context("Invalid Redis URL")?;
            redis.ping().await.context("Failed to reach Redis")?;

            AppState {
                shows: Arc::new(PgShowRepository::new(db.pool.clone())),
                reservations: Arc::new(PgReservationRepository::new(db.pool.clone())),
                documents: Arc::new(redis),
                auth,
                page_size,
            }
        }
    };

    let app = app(state, &config.server.base_path);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server host/port")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
