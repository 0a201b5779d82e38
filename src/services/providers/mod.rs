/// Film metadata providers
///
/// Ingestion depends on the [`MovieSource`] trait rather than a concrete API
/// client, so the populate pipeline can be exercised without network access.
use crate::{
    error::AppResult,
    models::{NewFilm, TmdbPage},
};

pub mod tmdb;

pub use tmdb::TmdbClient;

/// Source of popular-film listings and per-film details
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieSource: Send + Sync {
    /// One page of the popular listing, 1-based
    async fn popular_page(&self, page: u32) -> AppResult<TmdbPage>;

    /// Full details for one film, including credits and keywords, ready to store
    async fn movie_details(&self, tmdb_id: i64) -> AppResult<NewFilm>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
