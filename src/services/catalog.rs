use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{CatalogMetadata, Film, FilmId, PopularQuery},
};

/// Read access to the film catalog
///
/// The similarity engine needs `list_items` for recomputes and `get_items` for
/// rating lookups; the remaining methods back the browsing endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FilmCatalog: Send + Sync {
    /// Every film in the catalog, in a stable order
    async fn list_items(&self) -> AppResult<Vec<Film>>;

    /// Films for the given ids; unknown ids are absent from the map
    async fn get_items(&self, ids: &[FilmId]) -> AppResult<HashMap<FilmId, Film>>;

    /// A single film, `None` when it does not exist
    async fn get_item(&self, id: FilmId) -> AppResult<Option<Film>> {
        let mut found = self.get_items(&[id]).await?;
        Ok(found.remove(&id))
    }

    /// Case-insensitive title search, most popular first
    async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<Film>>;

    /// Filtered, paginated popular listing
    async fn popular(&self, query: &PopularQuery) -> AppResult<Vec<Film>>;

    /// Distinct genres and the release year range
    async fn metadata(&self) -> AppResult<CatalogMetadata>;
}

/// Resolves `ids` against `films`, keeping the order of `ids`
///
/// Ids without a film are skipped.
pub fn in_order(ids: &[FilmId], films: &HashMap<FilmId, Film>) -> Vec<Film> {
    ids.iter().filter_map(|id| films.get(id).cloned()).collect()
}
