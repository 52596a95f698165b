//! Integration tests for the monitoring server routes

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mockito::{Matcher, Server, ServerGuard};
use monitor_lib::{
    health::{components, HealthRegistry},
    observability::MonitorMetrics,
    Catalog, Compiler, ErrorPolicy, Executor, MonitoringService, PriceInfo, PrometheusBackend,
};
use monitor_server::api::{create_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn setup_test_app(prometheus: &ServerGuard) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry
        .register_all(&[components::BACKEND, components::METADATA, components::EXECUTOR])
        .await;

    let backend = PrometheusBackend::new(&prometheus.url(), Duration::from_secs(5)).unwrap();
    let executor = Executor::new(
        Arc::new(backend),
        Compiler::new(Arc::new(Catalog::new())),
        ErrorPolicy::FailFast,
    );
    let service = MonitoringService::new(executor)
        .with_default_price(PriceInfo {
            cpu_per_core_per_hour: 3.0,
            ..Default::default()
        })
        .with_health(health_registry.clone());

    let state = Arc::new(AppState::new(
        health_registry,
        MonitorMetrics::new(),
        service,
    ));
    let router = create_router(state.clone());

    (router, state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

const NODE_VECTOR: &str = r#"{"status":"success","data":{"resultType":"vector","result":[
    {"metric":{"node":"node-1"},"value":[1585836666,"0.25"]},
    {"metric":{"node":"node-2"},"value":[1585836666,"0.75"]},
    {"metric":{"node":"node-3"},"value":[1585836666,"0.5"]}
]}}"#;

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let prometheus = Server::new_async().await;
    let (app, _state) = setup_test_app(&prometheus).await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["backend"].is_object());
    assert!(health["components"]["metadata"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let prometheus = Server::new_async().await;
    let (app, state) = setup_test_app(&prometheus).await;

    state
        .health_registry
        .set_degraded(components::METADATA, "kubernetes API unreachable")
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let prometheus = Server::new_async().await;
    let (app, state) = setup_test_app(&prometheus).await;

    state
        .health_registry
        .set_unhealthy(components::BACKEND, "prometheus unreachable")
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_registry() {
    let prometheus = Server::new_async().await;
    let (app, state) = setup_test_app(&prometheus).await;

    let (status, readiness) = get_json(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    state.health_registry.set_ready(true).await;
    let (status, readiness) = get_json(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let prometheus = Server::new_async().await;
    let (app, _state) = setup_test_app(&prometheus).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();
    assert!(metrics_text.contains("monitoring_query_duration_seconds_bucket"));
    assert!(metrics_text.contains("monitoring_backend_latency_seconds_count"));
    assert!(metrics_text.contains("monitoring_nohit_total"));
}

#[tokio::test]
async fn test_node_query_sorted_and_paged() {
    let mut prometheus = Server::new_async().await;
    let mock = prometheus
        .mock("GET", "/api/v1/query")
        .match_query(Matcher::UrlEncoded("time".into(), "1585836666.000".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(NODE_VECTOR)
        .create_async()
        .await;
    let (app, _state) = setup_test_app(&prometheus).await;

    let (status, body) = get_json(
        app,
        "/api/v1/monitoring/nodes?metrics_filter=node_cpu_utilisation&time=1585836666\
         &sort_metric=node_cpu_utilisation&limit=2",
    )
    .await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_page"], 2);
    assert_eq!(body["total_item"], 3);

    let metric = &body["results"][0];
    assert_eq!(metric["metric_name"], "node_cpu_utilisation");
    assert_eq!(metric["data"]["resultType"], "vector");
    let result = metric["data"]["result"].as_array().unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0]["metric"]["node"], "node-2");
    assert_eq!(result[1]["metric"]["node"], "node-3");
    assert_eq!(result[0]["value"][1], "0.75");
}

#[tokio::test]
async fn test_meter_query_carries_fee() {
    let mut prometheus = Server::new_async().await;
    prometheus
        .mock("GET", "/api/v1/query")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"status":"success","data":{"resultType":"vector","result":[
                {"metric":{},"value":[1585836666,"1"]}
            ]}}"#,
        )
        .create_async()
        .await;
    let (app, _state) = setup_test_app(&prometheus).await;

    let (status, body) = get_json(
        app,
        "/api/v1/monitoring/cluster?meter=true&metrics_filter=meter_cluster_cpu_usage",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value = &body["results"][0]["data"]["result"][0];
    assert_eq!(value["sum_value"], 1.0);
    assert_eq!(value["fee"], 3.0);
    assert_eq!(value["resource_unit"], "cores");
    assert_eq!(value["currency_unit"], "USD");
}

#[tokio::test]
async fn test_unknown_level_is_bad_request() {
    let prometheus = Server::new_async().await;
    let (app, _state) = setup_test_app(&prometheus).await;

    let (status, body) = get_json(app, "/api/v1/monitoring/galaxies").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("galaxies"));
}

#[tokio::test]
async fn test_time_conflict_is_bad_request() {
    let prometheus = Server::new_async().await;
    let (app, _state) = setup_test_app(&prometheus).await;

    let (status, _body) = get_json(
        app,
        "/api/v1/monitoring/cluster?time=1585831995&start=1585830000",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_workload_namespace_is_bad_request() {
    let prometheus = Server::new_async().await;
    let (app, _state) = setup_test_app(&prometheus).await;

    let (status, body) = get_json(app, "/api/v1/monitoring/workloads").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("namespace"));
}

#[tokio::test]
async fn test_backend_error_is_internal_and_degrades_backend() {
    let mut prometheus = Server::new_async().await;
    prometheus
        .mock("GET", "/api/v1/query")
        .match_query(Matcher::Any)
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"error","errorType":"execution","error":"query timed out"}"#)
        .create_async()
        .await;
    let (app, state) = setup_test_app(&prometheus).await;

    let (status, body) = get_json(
        app.clone(),
        "/api/v1/monitoring/cluster?metrics_filter=cluster_cpu_usage",
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("query timed out"));

    let (_, health) = get_json(app, "/healthz").await;
    assert_eq!(health["components"]["backend"]["status"], "degraded");
    assert_eq!(
        state.health_registry.health().await.components.len(),
        3
    );
}
