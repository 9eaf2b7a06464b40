use super::support::{domain, test_config, FakePlatform, GB};
use crate::api;
use crate::daemon::Balancer;
use crate::platform::Platform;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn balancer() -> Arc<Balancer> {
    let platform: Arc<dyn Platform> = Arc::new(FakePlatform::with_domains(vec![
        domain("data1", 90 * GB, 10 * GB),
        domain("data2", 20 * GB, 80 * GB),
    ]));
    Arc::new(Balancer::new(platform, Arc::new(test_config(85))).unwrap())
}

async fn get_json(balancer: Arc<Balancer>, uri: &str) -> (StatusCode, Value) {
    let response = api::router(balancer)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_status_reports_idle_before_first_pass() {
    let (status, json) = get_json(balancer(), "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["state"], "idle");
    assert_eq!(json["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["data"]["last_pass_at"].is_null());
}

#[tokio::test]
async fn test_occupancy_before_any_scan() {
    let (status, json) = get_json(balancer(), "/api/occupancy").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_occupancy_after_scan() {
    let balancer = balancer();
    balancer.scan().await.unwrap();

    let (_, json) = get_json(balancer, "/api/occupancy").await;

    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["threshold"], 85);
    let domains = json["data"]["domains"].as_array().unwrap();
    assert_eq!(domains.len(), 2);
    assert_eq!(domains[0]["name"], "data1");
    assert_eq!(domains[0]["percent_usage"], 90);
    assert_eq!(domains[0]["overloaded"], true);
    assert_eq!(domains[1]["overloaded"], false);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = api::router(balancer())
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
