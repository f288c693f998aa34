//! JSON API over the engines

pub mod error;
pub mod handlers;

use crate::AppState;
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/budget-allocation", post(handlers::budget_allocation))
        .route("/api/investment-advice", post(handlers::investment_advice))
        .route("/api/market-data", get(handlers::market_data))
        .route("/api/stock-quote/{symbol}", get(handlers::stock_quote))
        .route("/api/crypto-prices", get(handlers::crypto_prices))
        .route("/api/forex-rate", get(handlers::forex_rate))
        .route("/api/financial-tips", get(handlers::tips))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
