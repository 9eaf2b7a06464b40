mod handlers;
pub(crate) mod responses;

use crate::daemon::Balancer;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build the read-only status router.
pub(crate) fn router(balancer: Arc<Balancer>) -> Router {
    Router::new()
        .route("/api/status", get(handlers::get_status))
        .route("/api/occupancy", get(handlers::get_occupancy))
        .with_state(balancer)
        .layer(TraceLayer::new_for_http())
}

/// Serve the status router on localhost until `shutdown` fires.
pub(crate) async fn serve(balancer: Arc<Balancer>, port: u16, shutdown: CancellationToken) {
    let bind_addr = format!("127.0.0.1:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!("Status endpoint disabled, cannot bind {}: {}", bind_addr, e);
            return;
        }
    };
    info!("Status endpoint listening on {}", bind_addr);

    let result = axum::serve(listener, router(balancer))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await;
    if let Err(e) = result {
        warn!("Status endpoint stopped: {}", e);
    }
}
