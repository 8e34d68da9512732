//! Deployment smoke-test server.
//!
//! Serves a single static HTML fragment at `/` so a pipeline can check that
//! a deployed build answers HTTP requests.

use std::net::SocketAddr;

use axum::{response::Html, routing::get, Router};
use diffwarden_core::{AppConfig, DiffwardenError};
use tower_http::trace::TraceLayer;

/// Body returned by `GET /`.
pub const HOME_HTML: &str = "<h1>AI Code Review Pipeline</h1><p>This app deploys automatically!</p>";

/// Build the router: `GET /` and nothing else.
pub fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .layer(TraceLayer::new_for_http())
}

async fn home() -> Html<&'static str> {
    Html(HOME_HTML)
}

/// Bind `config.host:config.port` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns [`DiffwardenError::Config`] for an unparsable host and
/// [`DiffwardenError::Io`] if the socket cannot be bound.
pub async fn serve(config: &AppConfig) -> Result<(), DiffwardenError> {
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local: SocketAddr = listener.local_addr()?;
    tracing::info!("listening on http://{local}");

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
