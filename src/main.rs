//! Blog server: loads config from env, prepares storage, serves the resource routes.

use blog_backend::{app, ensure_database_exists, ensure_schema, AppConfig, AppState, MemoryStore, PgStore, StorageBackend};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blog_backend=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let state = match config.storage {
        StorageBackend::Postgres => {
            ensure_database_exists(&config.database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await?;
            ensure_schema(&pool).await?;
            AppState::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on exit");
            AppState::new(MemoryStore::new())
        }
    };

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state, config.body_limit)).await?;
    Ok(())
}
