//! HTTP chat surface for Shopmind (axum).
//!
//! Routes: `POST /chat`, `DELETE /chat/session/{id}`, `GET /health`.
//! Validation errors are 422, agent failures are 500 with `{detail}`, and
//! every response carries an `X-Process-Time-Ms` header.
//!
//! **Public API**: [`run_serve`], [`run_serve_on_listener`], [`app::AppState`],
//! [`app::router`].

pub mod app;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use app::{router, AppState};

/// Runs the server on an existing listener. Tests bind `127.0.0.1:0` and
/// pass the listener in to pick a free port.
pub async fn run_serve_on_listener(
    listener: TcpListener,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("shopmind listening on http://{}", addr);

    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

/// Binds `addr` and serves until ctrl-c.
pub async fn run_serve(
    addr: &str,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(listener, state).await
}
