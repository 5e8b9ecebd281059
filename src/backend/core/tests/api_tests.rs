//! Admin API tests, driven through the router with `oneshot`.
//!
//! Tests cover:
//! - Liveness and metrics endpoints
//! - Writes, key info, deletes
//! - Tag, pattern and namespace invalidation
//! - Warming and maintenance
//! - Validation and not-found errors

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use cachet_core::api::{build_router, AppState};
use cachet_core::cache::{CacheEngine, CacheOptions};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// ============================================================================
// Test Utilities
// ============================================================================

fn app() -> (Router, Arc<CacheEngine>) {
    let engine = Arc::new(CacheEngine::in_memory());
    let router = build_router(AppState::for_engine(engine.clone()));
    (router, engine)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

// ============================================================================
// Liveness and Metrics
// ============================================================================

#[tokio::test]
async fn test_liveness() {
    let (router, _) = app();
    let (status, body) = send(&router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_disabled_returns_not_found() {
    let (router, _) = app();
    let (status, body) = send(&router, Method::GET, "/metrics", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

// ============================================================================
// Entries and Keys
// ============================================================================

#[tokio::test]
async fn test_write_then_read_key_info() {
    let (router, engine) = app();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/cache/entries",
        Some(json!({"key": "user:42", "value": {"name": "Ann"}, "ttl": 5, "tags": ["users"], "namespace": "acme"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["key"], "acme:user:42");
    assert_eq!(body["data"]["ttl_seconds"], 5);

    let cached: Option<Value> = engine
        .get("user:42", &CacheOptions::new().namespace("acme"))
        .await;
    assert_eq!(cached, Some(json!({"name": "Ann"})));

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/cache/keys/user:42?namespace=acme",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["access_count"], 1);
    assert_eq!(body["data"]["tags"][0], "users");
}

#[tokio::test]
async fn test_untracked_key_is_not_found() {
    let (router, _) = app();
    let (status, body) = send(&router, Method::GET, "/api/v1/cache/keys/ghost", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "KEY_NOT_FOUND");
}

#[tokio::test]
async fn test_empty_key_is_rejected() {
    let (router, _) = app();
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/cache/entries",
        Some(json!({"key": "  ", "value": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_delete_key() {
    let (router, engine) = app();
    engine.set("k", &1, &CacheOptions::default()).await.unwrap();

    let (status, body) = send(&router, Method::DELETE, "/api/v1/cache/keys/k", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (_, body) = send(&router, Method::DELETE, "/api/v1/cache/keys/k", None).await;
    assert_eq!(body["data"]["deleted"], false);
    assert_eq!(engine.get_stats().deletes, 2);
}

// ============================================================================
// Introspection
// ============================================================================

#[tokio::test]
async fn test_stats_and_top_keys() {
    let (router, engine) = app();
    let opts = CacheOptions::default();
    engine.set("a", &1, &opts).await.unwrap();
    engine.set("b", &1, &opts).await.unwrap();
    engine.get::<i32>("b", &opts).await;
    engine.get::<i32>("missing", &opts).await;

    let (status, body) = send(&router, Method::GET, "/api/v1/cache/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hits"], 1);
    assert_eq!(body["data"]["misses"], 1);
    assert_eq!(body["data"]["key_count"], 2);
    assert_eq!(body["data"]["hit_rate"], 50.0);

    let (_, body) = send(&router, Method::GET, "/api/v1/cache/top-keys?limit=1", None).await;
    let top = body["data"].as_array().unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0]["key"], "b");
}

#[tokio::test]
async fn test_cache_health_report() {
    let (router, engine) = app();

    // Nothing read yet: 0% hit rate is below the floor, still operational.
    let (status, body) = send(&router, Method::GET, "/api/v1/cache/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "degraded");
    assert_eq!(body["data"]["issues"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["store"], "in_memory");

    let opts = CacheOptions::default();
    engine.set("k", &1, &opts).await.unwrap();
    engine.get::<i32>("k", &opts).await;

    let (status, body) = send(&router, Method::GET, "/api/v1/cache/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_keys_by_tag() {
    let (router, engine) = app();
    engine.set("k1", &1, &CacheOptions::new().tag("t")).await.unwrap();

    let (_, body) = send(&router, Method::GET, "/api/v1/cache/tags/t/keys", None).await;
    assert_eq!(body["data"]["keys"], json!(["k1"]));

    let (status, body) = send(&router, Method::GET, "/api/v1/cache/tags/none/keys", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["keys"], json!([]));
}

// ============================================================================
// Invalidation
// ============================================================================

#[tokio::test]
async fn test_invalidate_by_tag_and_tags() {
    let (router, engine) = app();
    engine.set("k1", &1, &CacheOptions::new().tag("a")).await.unwrap();
    engine.set("k2", &1, &CacheOptions::new().tag("b")).await.unwrap();
    engine.set("k3", &1, &CacheOptions::new().tag("c")).await.unwrap();

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/v1/cache/invalidate/tag",
        Some(json!({"tag": "a"})),
    )
    .await;
    assert_eq!(body["data"]["invalidated"], 1);

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/v1/cache/invalidate/tags",
        Some(json!({"tags": ["b", "c"]})),
    )
    .await;
    assert_eq!(body["data"]["invalidated"], 2);
    assert_eq!(engine.get_stats().key_count, 0);

    let (_, body) = send(&router, Method::GET, "/api/v1/cache/invalidations", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["event"]["type"], "tags");
}

#[tokio::test]
async fn test_invalidate_by_pattern_and_namespace() {
    let (router, engine) = app();
    engine.set("user:1", &1, &CacheOptions::default()).await.unwrap();
    engine.set("user:2", &1, &CacheOptions::default()).await.unwrap();
    engine.set("x", &1, &CacheOptions::new().namespace("tenant")).await.unwrap();

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/v1/cache/invalidate/pattern",
        Some(json!({"pattern": "user:*"})),
    )
    .await;
    assert_eq!(body["data"]["invalidated"], 2);

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/v1/cache/invalidate/namespace",
        Some(json!({"namespace": "tenant"})),
    )
    .await;
    assert_eq!(body["data"]["invalidated"], 1);
}

#[tokio::test]
async fn test_empty_invalidation_inputs_are_rejected() {
    let (router, _) = app();

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/cache/invalidate/tags",
        Some(json!({"tags": []})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/cache/invalidate/pattern",
        Some(json!({"pattern": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Warming and Maintenance
// ============================================================================

#[tokio::test]
async fn test_warm_endpoint() {
    let (router, engine) = app();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/cache/warm",
        Some(json!({"entries": [
            {"key": "k1", "value": 10},
            {"key": "k2", "value": 20, "tags": ["warm"]}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["warmed"], 2);
    assert_eq!(body["data"]["failed"], 0);

    let values: Vec<Option<i64>> = engine.mget(&["k1", "k2"], &CacheOptions::default()).await;
    assert_eq!(values, vec![Some(10), Some(20)]);
    assert_eq!(engine.get_keys_by_tag("warm"), vec!["k2"]);
}

#[tokio::test]
async fn test_sweep_and_report_endpoints() {
    let (router, engine) = app();
    engine.set("k", &1, &CacheOptions::new().ttl_secs(600)).await.unwrap();

    let (status, body) = send(&router, Method::POST, "/api/v1/cache/maintenance/sweep", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["swept"], 0);
    assert_eq!(body["data"]["remaining"], 1);

    let (status, body) = send(&router, Method::GET, "/api/v1/cache/maintenance/report", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["key_count"], 1);
    assert_eq!(body["data"]["top_keys"][0]["key"], "k");
}
