use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Stable identifier of a film in the local catalog
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct FilmId(pub i64);

impl Display for FilmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for FilmId {
    fn from(id: i64) -> Self {
        FilmId(id)
    }
}

/// A film as stored in the catalog
///
/// This is the immutable snapshot the similarity engine works from during a
/// recompute, and the full detail payload returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Film {
    pub id: FilmId,
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub original_language: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub release_year: Option<i32>,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub director: Option<String>,
    /// Billing order, most prominent first
    #[sqlx(rename = "cast_members")]
    pub cast: Vec<String>,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub popularity: f64,
    /// Average rating on a 0-10 scale
    pub vote_average: f64,
    pub vote_count: i32,
}

/// A film fetched from the upstream catalog, not yet assigned a local id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFilm {
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub original_language: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub release_year: Option<i32>,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub director: Option<String>,
    pub cast: Vec<String>,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i32,
}

/// Compact film representation used in list responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmSummary {
    pub id: FilmId,
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_year: Option<i32>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i32,
}

impl From<&Film> for FilmSummary {
    fn from(film: &Film) -> Self {
        Self {
            id: film.id,
            tmdb_id: film.tmdb_id,
            title: film.title.clone(),
            original_title: film.original_title.clone(),
            release_year: film.release_year,
            genres: film.genres.clone(),
            poster_url: film.poster_url.clone(),
            overview: film.overview.clone(),
            popularity: film.popularity,
            vote_average: film.vote_average,
            vote_count: film.vote_count,
        }
    }
}

/// A directed, pruned similarity relation between two films
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SimilarityEdge {
    pub source: FilmId,
    pub target: FilmId,
    pub score: f64,
}

/// Filter values available across the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub genres: Vec<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}
