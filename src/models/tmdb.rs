// ============================================================================
// TMDB API Types
// ============================================================================

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use super::NewFilm;

/// Number of billed cast members kept per film
pub const CAST_LIMIT: usize = 5;

/// Page of results from `/movie/popular`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage {
    pub page: u32,
    #[serde(default)]
    pub results: Vec<TmdbListedMovie>,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListedMovie {
    pub id: i64,
}

/// Response from `/movie/{id}?append_to_response=credits,keywords`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbNamed>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i32,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub credits: TmdbCredits,
    #[serde(default)]
    pub keywords: TmdbKeywords,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbNamed {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbNamed>,
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrewMember {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbKeywords {
    #[serde(default)]
    pub keywords: Vec<TmdbNamed>,
}

impl TmdbMovieDetails {
    /// Converts the upstream payload into a catalog film
    ///
    /// `image_base_url` is prefixed to the poster path.
    pub fn into_new_film(self, image_base_url: &str) -> NewFilm {
        let release_date = self
            .release_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        let director = self
            .credits
            .crew
            .iter()
            .find(|member| member.job.as_deref() == Some("Director"))
            .map(|member| member.name.clone());

        let cast = self
            .credits
            .cast
            .into_iter()
            .take(CAST_LIMIT)
            .map(|member| member.name)
            .collect();

        NewFilm {
            tmdb_id: self.id,
            title: self.title,
            original_title: self.original_title,
            original_language: self.original_language,
            release_date,
            release_year: release_date.map(|d| d.year()),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            keywords: self.keywords.keywords.into_iter().map(|k| k.name).collect(),
            director,
            cast,
            overview: self.overview.filter(|o| !o.is_empty()),
            poster_url: self
                .poster_path
                .map(|path| format!("{}{}", image_base_url, path)),
            popularity: self.popularity,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
        }
    }
}
