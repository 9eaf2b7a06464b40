use crate::api::responses::ApiResponse;
use crate::balancer::OccupancyReport;
use crate::daemon::Balancer;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

pub(crate) async fn get_occupancy(State(balancer): State<Arc<Balancer>>) -> impl IntoResponse {
    match balancer.last_report().await {
        Some(report) => Json(ApiResponse::ok(report)),
        None => Json(ApiResponse::<OccupancyReport>::err("No scan has completed yet")),
    }
}
