mod film;
mod requests;
mod tmdb;

pub use film::{CatalogMetadata, Film, FilmId, FilmSummary, NewFilm, SimilarityEdge};
pub use requests::{
    PopularQuery, PopularSort, RecommendationRequest, RecommendationResponse, RecomputeResponse,
    SearchQuery, SimilarQuery,
};
pub use tmdb::{TmdbListedMovie, TmdbMovieDetails, TmdbPage, CAST_LIMIT};
