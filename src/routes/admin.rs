use axum::{extract::State, Json};

use crate::{
    error::{AppError, AppResult, EngineError},
    models::RecomputeResponse,
    routes::AppState,
};

/// Handler for `POST /admin/recompute`
///
/// Rebuilds the similarity graph from the current catalog. A catalog too small
/// to compare is reported as a skipped cycle, not an error.
pub async fn recompute(State(state): State<AppState>) -> AppResult<Json<RecomputeResponse>> {
    match state
        .recommender
        .recompute(state.catalog.as_ref(), state.store.as_ref())
        .await
    {
        Ok(edges_written) => Ok(Json(RecomputeResponse {
            edges_written,
            skipped: false,
        })),
        Err(AppError::Engine(EngineError::InsufficientCorpus { found })) => {
            tracing::warn!(films = found, "Recompute skipped: corpus too small");
            Ok(Json(RecomputeResponse {
                edges_written: 0,
                skipped: true,
            }))
        }
        Err(e) => Err(e),
    }
}
