#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Web dashboard: dataset overview, model metrics and live price estimates.

/// Client-facing errors.
pub mod error;
/// HTML rendering.
pub mod render;
/// HTTP routes.
pub mod routes;
/// Lazily loaded dataset and model.
pub mod session;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

pub use error::DashboardError;
pub use routes::{router, SharedCache};
pub use session::{Session, SessionCache};

/// Binds `addr` and serves the dashboard until Ctrl-C.
pub async fn serve(addr: SocketAddr, cache: SharedCache) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "dashboard listening");
    axum::serve(listener, router(cache))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = ?err, "ctrl-c handler failed");
            }
        })
        .await
        .context("dashboard server failed")
}
