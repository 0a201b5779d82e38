use axum::{extract::State, Json};

use crate::{
    error::{AppError, AppResult},
    models::{FilmId, FilmSummary, RecommendationRequest, RecommendationResponse},
    routes::AppState,
    services::catalog::in_order,
};

const MAX_RECOMMENDATIONS: usize = 20;

fn validate(request: &RecommendationRequest) -> AppResult<()> {
    if request.selected_film_ids.is_empty() {
        return Err(AppError::InvalidInput(
            "selected_film_ids must not be empty".to_string(),
        ));
    }
    if !(1..=MAX_RECOMMENDATIONS).contains(&request.limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_RECOMMENDATIONS
        )));
    }
    Ok(())
}

/// Handler for recommendations endpoint
///
/// Every selected film must exist in the catalog; unknown ids are reported
/// back sorted and deduplicated.
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    validate(&request)?;

    let known = state.catalog.get_items(&request.selected_film_ids).await?;
    let mut unknown: Vec<FilmId> = request
        .selected_film_ids
        .iter()
        .copied()
        .filter(|id| !known.contains_key(id))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        unknown.dedup();
        return Err(AppError::InvalidSelection(unknown));
    }

    let ids = state
        .recommender
        .recommend(state.catalog.as_ref(), &request)
        .await?;
    let films = state.catalog.get_items(&ids).await?;

    let recommendations: Vec<FilmSummary> = in_order(&ids, &films)
        .iter()
        .map(FilmSummary::from)
        .collect();

    tracing::info!(
        selected = request.selected_film_ids.len(),
        liked = request.liked_film_ids.len(),
        disliked = request.disliked_film_ids.len(),
        returned = recommendations.len(),
        "Recommendations served"
    );

    Ok(Json(RecommendationResponse { recommendations }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(selected: &[i64], limit: usize) -> RecommendationRequest {
        RecommendationRequest {
            selected_film_ids: selected.iter().map(|&id| FilmId(id)).collect(),
            liked_film_ids: vec![],
            disliked_film_ids: vec![],
            limit,
        }
    }

    #[test]
    fn test_validate() {
        assert!(validate(&request(&[1], 5)).is_ok());
        assert!(validate(&request(&[1], MAX_RECOMMENDATIONS)).is_ok());
        assert!(matches!(
            validate(&request(&[], 5)),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate(&request(&[1], 0)),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate(&request(&[1], MAX_RECOMMENDATIONS + 1)),
            Err(AppError::InvalidInput(_))
        ));
    }
}
