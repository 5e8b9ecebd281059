//! Admin API request handlers.
//!
//! Handlers that can fail return `Result<impl IntoResponse, CachetError>` so
//! errors are converted to HTTP status codes by the `IntoResponse` impl on
//! `CachetError`. Store degradation never surfaces here; the engine absorbs
//! it.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{ApiResponse, AppState};
use crate::cache::{CacheOptions, WarmEntry};
use crate::error::CachetError;

const DEFAULT_TOP_KEYS: usize = 10;
const MAX_LISTING: usize = 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// Liveness and Metrics
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn liveness() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.metrics.is_enabled() {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error_with_code(
                "Metrics export is disabled",
                "METRICS_DISABLED",
            )),
        )
            .into_response();
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
        .into_response()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Introspection
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).min(MAX_LISTING)
    }
}

#[derive(Debug, Deserialize)]
pub struct NamespaceQuery {
    pub namespace: Option<String>,
}

pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.engine.get_stats()))
}

pub async fn cache_health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.engine.health_check().await;
    let status = if report.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ApiResponse::success(report)))
}

pub async fn top_keys(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let limit = query.resolve(DEFAULT_TOP_KEYS);
    Json(ApiResponse::success(state.engine.get_top_keys(limit)))
}

pub async fn get_key_info(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> Result<impl IntoResponse, CachetError> {
    let info = state
        .engine
        .require_key_info(&key, query.namespace.as_deref())?;
    Ok(Json(ApiResponse::success(info)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagKeysResponse {
    pub tag: String,
    pub keys: Vec<String>,
}

pub async fn keys_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> impl IntoResponse {
    let keys = state.engine.get_keys_by_tag(&tag);
    Json(ApiResponse::success(TagKeysResponse { tag, keys }))
}

pub async fn recent_invalidations(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let limit = query.resolve(state.engine.config().invalidation_log_capacity);
    Json(ApiResponse::success(state.engine.recent_invalidations(limit)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Writes
// ═══════════════════════════════════════════════════════════════════════════════

/// One value to write.
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub key: String,
    pub value: Value,
    /// Seconds; the engine default when absent
    pub ttl: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub namespace: Option<String>,
    #[serde(default)]
    pub compress: bool,
}

impl EntryRequest {
    fn validate(&self) -> Result<(), CachetError> {
        if self.key.trim().is_empty() {
            return Err(CachetError::validation("Cache key cannot be empty"));
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(CachetError::validation("Tags cannot be empty"));
        }
        Ok(())
    }

    fn options(&self) -> CacheOptions {
        let mut options = CacheOptions::new()
            .tags(self.tags.iter().cloned())
            .compress(self.compress);
        if let Some(ttl) = self.ttl {
            options = options.ttl(Duration::from_secs(ttl));
        }
        if let Some(namespace) = &self.namespace {
            options = options.namespace(namespace.clone());
        }
        options
    }
}

pub async fn set_entry(
    State(state): State<AppState>,
    Json(req): Json<EntryRequest>,
) -> Result<impl IntoResponse, CachetError> {
    req.validate()?;

    let options = req.options();
    state.engine.set(&req.key, &req.value, &options).await?;
    let info = state
        .engine
        .require_key_info(&req.key, options.namespace.as_deref())?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(info))))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub key: String,
    pub deleted: bool,
}

pub async fn delete_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> impl IntoResponse {
    let deleted = state.engine.delete(&key, query.namespace.as_deref()).await;
    Json(ApiResponse::success(DeleteResponse { key, deleted }))
}

#[derive(Debug, Deserialize)]
pub struct WarmRequest {
    pub entries: Vec<EntryRequest>,
}

pub async fn warm(
    State(state): State<AppState>,
    Json(req): Json<WarmRequest>,
) -> Result<impl IntoResponse, CachetError> {
    for entry in &req.entries {
        entry.validate()?;
    }

    let entries = req
        .entries
        .into_iter()
        .map(|entry| {
            let options = entry.options();
            WarmEntry::value(entry.key, entry.value).with_options(options)
        })
        .collect();

    let summary = state.engine.warm_cache(entries).await;
    Ok(Json(ApiResponse::success(summary)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Invalidation
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatternRequest {
    pub pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct NamespaceRequest {
    pub namespace: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidationResponse {
    pub invalidated: usize,
}

fn invalidated(count: usize) -> Json<ApiResponse<InvalidationResponse>> {
    Json(ApiResponse::success(InvalidationResponse { invalidated: count }))
}

pub async fn invalidate_tag(
    State(state): State<AppState>,
    Json(req): Json<TagRequest>,
) -> Result<impl IntoResponse, CachetError> {
    if req.tag.trim().is_empty() {
        return Err(CachetError::validation("Tag cannot be empty"));
    }
    Ok(invalidated(state.engine.invalidate_by_tags(&[req.tag]).await))
}

pub async fn invalidate_tags(
    State(state): State<AppState>,
    Json(req): Json<TagsRequest>,
) -> Result<impl IntoResponse, CachetError> {
    if req.tags.is_empty() {
        return Err(CachetError::validation("At least one tag is required"));
    }
    Ok(invalidated(state.engine.invalidate_by_tags(&req.tags).await))
}

pub async fn invalidate_pattern(
    State(state): State<AppState>,
    Json(req): Json<PatternRequest>,
) -> Result<impl IntoResponse, CachetError> {
    if req.pattern.is_empty() {
        return Err(CachetError::validation("Pattern cannot be empty"));
    }
    let count = state.engine.invalidate_by_pattern(&req.pattern).await?;
    Ok(invalidated(count))
}

pub async fn invalidate_namespace(
    State(state): State<AppState>,
    Json(req): Json<NamespaceRequest>,
) -> Result<impl IntoResponse, CachetError> {
    if req.namespace.trim().is_empty() {
        return Err(CachetError::validation("Namespace cannot be empty"));
    }
    Ok(invalidated(state.engine.clear_namespace(&req.namespace).await))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Maintenance
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn run_sweep(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.maintenance.run_sweep()))
}

pub async fn maintenance_report(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.maintenance.run_report()))
}
