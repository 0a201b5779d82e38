use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    cached,
    db::CacheKey,
    error::{AppError, AppResult},
    models::{
        CatalogMetadata, Film, FilmId, FilmSummary, PopularQuery, SearchQuery, SimilarQuery,
    },
    routes::AppState,
    services::catalog::in_order,
};

const MAX_POPULAR_LIMIT: u32 = 100;
const MAX_SEARCH_LIMIT: u32 = 50;
const MIN_SEARCH_CHARS: usize = 2;
const MAX_SIMILAR_LIMIT: usize = 10;

fn summaries(films: &[Film]) -> Vec<FilmSummary> {
    films.iter().map(FilmSummary::from).collect()
}

/// `GET /films/popular`
pub async fn popular(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> AppResult<Json<Vec<FilmSummary>>> {
    if query.page == 0 {
        return Err(AppError::InvalidInput("page must be at least 1".to_string()));
    }
    if !(1..=MAX_POPULAR_LIMIT).contains(&query.limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_POPULAR_LIMIT
        )));
    }

    let key = CacheKey::Popular(query.clone());
    let films: Vec<FilmSummary> = cached!(state.cache.as_ref(), key, async {
        Ok::<_, AppError>(summaries(&state.catalog.popular(&query).await?))
    })?;

    Ok(Json(films))
}

/// `GET /films/search`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<FilmSummary>>> {
    let query = params.q.trim();
    if query.chars().count() < MIN_SEARCH_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Search query must be at least {} characters",
            MIN_SEARCH_CHARS
        )));
    }
    if !(1..=MAX_SEARCH_LIMIT).contains(&params.limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_SEARCH_LIMIT
        )));
    }

    let key = CacheKey::Search {
        query: query.to_string(),
        limit: params.limit,
    };
    let films: Vec<FilmSummary> = cached!(state.cache.as_ref(), key, async {
        Ok::<_, AppError>(summaries(
            &state.catalog.search(query, params.limit).await?,
        ))
    })?;

    tracing::debug!(query = %query, results = films.len(), "Film search");
    Ok(Json(films))
}

/// `GET /films/metadata`
pub async fn metadata(State(state): State<AppState>) -> AppResult<Json<CatalogMetadata>> {
    let metadata: CatalogMetadata = cached!(state.cache.as_ref(), CacheKey::Metadata, async {
        state.catalog.metadata().await
    })?;

    Ok(Json(metadata))
}

async fn require_film(state: &AppState, id: FilmId) -> AppResult<Film> {
    state
        .catalog
        .get_item(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Film {} not found", id)))
}

/// `GET /films/{id}`
pub async fn get_film(
    State(state): State<AppState>,
    Path(id): Path<FilmId>,
) -> AppResult<Json<Film>> {
    let film: Film = cached!(state.cache.as_ref(), CacheKey::Film(id), async {
        require_film(&state, id).await
    })?;

    Ok(Json(film))
}

/// `GET /films/{id}/similar`
///
/// Served from a single graph snapshot; the cache key carries its version so
/// a recompute never serves stale neighbours.
pub async fn similar(
    State(state): State<AppState>,
    Path(id): Path<FilmId>,
    Query(params): Query<SimilarQuery>,
) -> AppResult<Json<Vec<FilmSummary>>> {
    if !(1..=MAX_SIMILAR_LIMIT).contains(&params.limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_SIMILAR_LIMIT
        )));
    }

    let graph = state.recommender.snapshot();
    let key = CacheKey::Similar {
        version: graph.version(),
        id,
        limit: params.limit,
    };

    let films: Vec<FilmSummary> = cached!(state.cache.as_ref(), key, async {
        require_film(&state, id).await?;

        let ids: Vec<FilmId> = graph
            .top_similar(id, params.limit)
            .into_iter()
            .map(|(target, _)| target)
            .collect();
        let found = state.catalog.get_items(&ids).await?;

        Ok::<_, AppError>(summaries(&in_order(&ids, &found)))
    })?;

    Ok(Json(films))
}
