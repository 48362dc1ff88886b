//! HTTP front end: `POST /generate_color_picture` and `GET /health`.

pub mod handlers;
pub mod request;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServiceConfig;
use crate::render::pipeline::PosterRenderer;

/// Shared, read-only state handed to every request.
#[derive(Debug)]
pub struct ServiceState {
    pub renderer: PosterRenderer,
    pub config: ServiceConfig,
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/generate_color_picture", post(handlers::generate_handler))
        .route("/health", get(handlers::health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until the process receives Ctrl-C.
pub async fn serve(state: Arc<ServiceState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "postercard listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
