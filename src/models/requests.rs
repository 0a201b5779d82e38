use serde::{Deserialize, Serialize};

use super::{FilmId, FilmSummary};

fn default_recommendation_limit() -> usize {
    5
}

fn default_similar_limit() -> usize {
    2
}

fn default_page() -> u32 {
    1
}

fn default_popular_limit() -> u32 {
    20
}

fn default_search_limit() -> u32 {
    10
}

/// Request for recommendations from explicit user signals
///
/// `liked_film_ids` and `disliked_film_ids` are always present; an omitted
/// field deserializes to an empty list, an explicit `null` is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub selected_film_ids: Vec<FilmId>,
    #[serde(default)]
    pub liked_film_ids: Vec<FilmId>,
    #[serde(default)]
    pub disliked_film_ids: Vec<FilmId>,
    #[serde(default = "default_recommendation_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<FilmSummary>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
}

/// Ordering for the popular listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopularSort {
    /// Popularity descending
    #[default]
    Popularity,
    /// Release year descending, then popularity descending
    RecentPopular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_popular_limit")]
    pub limit: u32,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub sort_by: PopularSort,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

/// Outcome of a similarity recompute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeResponse {
    pub edges_written: usize,
    /// True when the corpus was too small and the cycle was skipped
    pub skipped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_request_defaults() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"selected_film_ids": [1, 2]}"#).unwrap();

        assert_eq!(request.selected_film_ids, vec![FilmId(1), FilmId(2)]);
        assert!(request.liked_film_ids.is_empty());
        assert!(request.disliked_film_ids.is_empty());
        assert_eq!(request.limit, 5);
    }

    #[test]
    fn test_recommendation_request_rejects_null_signal_lists() {
        for body in [
            r#"{"selected_film_ids": [1], "liked_film_ids": null}"#,
            r#"{"selected_film_ids": [1], "disliked_film_ids": null}"#,
        ] {
            assert!(serde_json::from_str::<RecommendationRequest>(body).is_err());
        }

        let request: RecommendationRequest =
            serde_json::from_str(r#"{"selected_film_ids": [1], "liked_film_ids": []}"#).unwrap();
        assert!(request.liked_film_ids.is_empty());
    }

    #[test]
    fn test_popular_query_sort_parsing() {
        let query: PopularQuery =
            serde_json::from_str(r#"{"sort_by": "recent_popular", "genre": "Drame"}"#).unwrap();

        assert_eq!(query.sort_by, PopularSort::RecentPopular);
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 20);
        assert_eq!(query.genre.as_deref(), Some("Drame"));
    }
}
