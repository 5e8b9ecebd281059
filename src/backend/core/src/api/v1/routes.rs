//! V1 cache routes.

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::{handlers, AppState};

/// V1 API prefix.
pub const V1_PREFIX: &str = "/api/v1";

/// Build the V1 API router.
///
/// # Endpoints
///
/// ## Introspection
/// - `GET /api/v1/cache/stats` - Aggregate statistics
/// - `GET /api/v1/cache/health` - Health report (503 when unhealthy)
/// - `GET /api/v1/cache/top-keys?limit=` - Most-read keys
/// - `GET /api/v1/cache/keys/:key?namespace=` - Key metadata
/// - `GET /api/v1/cache/tags/:tag/keys` - Keys filed under a tag
/// - `GET /api/v1/cache/invalidations?limit=` - Recent invalidations
///
/// ## Writes
/// - `POST /api/v1/cache/entries` - Write one value
/// - `DELETE /api/v1/cache/keys/:key?namespace=` - Delete one key
/// - `POST /api/v1/cache/warm` - Write many values
///
/// ## Invalidation
/// - `POST /api/v1/cache/invalidate/tag`
/// - `POST /api/v1/cache/invalidate/tags`
/// - `POST /api/v1/cache/invalidate/pattern`
/// - `POST /api/v1/cache/invalidate/namespace`
///
/// ## Maintenance
/// - `POST /api/v1/cache/maintenance/sweep` - Sweep expired metadata now
/// - `GET /api/v1/cache/maintenance/report` - Stats plus top keys
pub fn v1_router() -> Router<AppState> {
    Router::new()
        // Introspection
        .route("/cache/stats", get(handlers::get_stats))
        .route("/cache/health", get(handlers::cache_health))
        .route("/cache/top-keys", get(handlers::top_keys))
        .route(
            "/cache/keys/:key",
            get(handlers::get_key_info).delete(handlers::delete_key),
        )
        .route("/cache/tags/:tag/keys", get(handlers::keys_by_tag))
        .route("/cache/invalidations", get(handlers::recent_invalidations))
        // Writes
        .route("/cache/entries", post(handlers::set_entry))
        .route("/cache/warm", post(handlers::warm))
        // Invalidation
        .route("/cache/invalidate/tag", post(handlers::invalidate_tag))
        .route("/cache/invalidate/tags", post(handlers::invalidate_tags))
        .route("/cache/invalidate/pattern", post(handlers::invalidate_pattern))
        .route("/cache/invalidate/namespace", post(handlers::invalidate_namespace))
        // Maintenance
        .route("/cache/maintenance/sweep", post(handlers::run_sweep))
        .route("/cache/maintenance/report", get(handlers::maintenance_report))
}
