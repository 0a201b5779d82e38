use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    db::Cache,
    middleware::{make_span_with_request_id, request_id_middleware, request_id::REQUEST_ID_HEADER},
    services::{
        catalog::FilmCatalog,
        recommendations::{GraphStore, Recommender},
    },
};

pub mod admin;
pub mod films;
pub mod recommendations;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn FilmCatalog>,
    pub store: Arc<dyn GraphStore>,
    pub recommender: Arc<Recommender>,
    /// `None` when caching is disabled
    pub cache: Option<Cache>,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state);

    if let Some(cors) = build_cors_layer(cors_origins) {
        router = router.layer(cors);
    }

    // The request id is assigned before the trace span opens
    router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
    )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/films/popular", get(films::popular))
        .route("/films/search", get(films::search))
        .route("/films/metadata", get(films::metadata))
        .route("/films/:id", get(films::get_film))
        .route("/films/:id/similar", get(films::similar))
        .route("/films/recommendations", post(recommendations::recommend))
        .route("/admin/recompute", post(admin::recompute))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

fn build_cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
            .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]),
    )
}
