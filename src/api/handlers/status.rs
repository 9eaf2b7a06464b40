use crate::api::responses::{ApiResponse, StatusResponse};
use crate::daemon::Balancer;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

pub(crate) async fn get_status(State(balancer): State<Arc<Balancer>>) -> impl IntoResponse {
    let status = balancer.status().await;
    Json(ApiResponse::ok(StatusResponse {
        state: status.state,
        detail: status.detail,
        version: env!("CARGO_PKG_VERSION").to_string(),
        last_pass_at: balancer.last_pass_at().await,
    }))
}
