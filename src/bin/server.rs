//! Stockroom server: PostgreSQL-backed, env-configured.

use std::sync::Arc;
use stockroom::{app, ensure_collections, AppState, Catalog, PgStore};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stockroom=info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/stockroom".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let catalog = Catalog::builtin();
    ensure_collections(&pool, &catalog).await?;

    let api_token = std::env::var("API_TOKEN").ok().filter(|t| !t.is_empty());
    if api_token.is_none() {
        tracing::warn!("API_TOKEN not set; resource routes are unauthenticated");
    }
    let store = Arc::new(PgStore::new(pool, &catalog));
    let state = AppState::new(store, catalog, api_token);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
