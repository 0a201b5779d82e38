//! Content-based similarity engine.
//!
//! A recompute turns the whole catalog into TF-IDF vectors, keeps the 20 best
//! cosine neighbours of every film and swaps the resulting graph in as a new
//! immutable snapshot. Queries read whichever snapshot is current when they
//! start and never block each other.

pub mod features;
pub mod graph;
pub mod scorer;
pub mod similarity;
pub mod stop_words;
pub mod vectorizer;

use chrono::Utc;
use rayon::prelude::*;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult, EngineError},
    models::{Film, FilmId, RecommendationRequest, SimilarityEdge},
    services::catalog::FilmCatalog,
};

pub use graph::{GraphStore, SimilarityGraph};
pub use scorer::{RecommendationScorer, Signals};

use similarity::SimilarityComputer;
use vectorizer::Vectorizer;

/// Builds a fresh similarity graph for `films`
///
/// CPU bound; document building and row scoring run on the rayon pool. Fails
/// with `InsufficientCorpus` for fewer than two films.
pub fn build_graph(films: &[Film]) -> Result<SimilarityGraph, EngineError> {
    let documents: Vec<features::Document> = films.par_iter().map(features::build).collect();

    let (model, matrix) = Vectorizer::default().fit_transform(&documents)?;
    tracing::debug!(
        films = films.len(),
        vocabulary = model.vocabulary_len(),
        "Vectorizer fitted"
    );

    let neighbours = SimilarityComputer::default().compute(&matrix);

    let edges = neighbours
        .into_iter()
        .enumerate()
        .flat_map(|(row, targets)| {
            let source = films[row].id;
            targets.into_iter().map(move |(target, score)| SimilarityEdge {
                source,
                target: films[target].id,
                score,
            })
        });

    Ok(SimilarityGraph::from_edges(edges, Utc::now()))
}

/// Holds the current graph snapshot and runs recomputes against it
pub struct Recommender {
    snapshot: RwLock<Arc<SimilarityGraph>>,
    recompute_lock: Mutex<()>,
}

impl Default for Recommender {
    fn default() -> Self {
        Self::new(SimilarityGraph::empty())
    }
}

impl Recommender {
    pub fn new(graph: SimilarityGraph) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(graph)),
            recompute_lock: Mutex::new(()),
        }
    }

    /// Creates a recommender serving the graph persisted in `store`
    pub async fn load(store: &dyn GraphStore) -> AppResult<Self> {
        let edges = store.load().await?;
        let graph = SimilarityGraph::from_edges(edges, Utc::now());

        tracing::info!(
            edges = graph.edge_count(),
            films = graph.source_count(),
            "Loaded similarity graph"
        );

        Ok(Self::new(graph))
    }

    /// The current snapshot; stays valid for as long as the caller holds it
    pub fn snapshot(&self) -> Arc<SimilarityGraph> {
        let guard = self
            .snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn install(&self, graph: SimilarityGraph) {
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(graph);
    }

    /// Rebuilds the graph from the current catalog, persists it and makes it current
    ///
    /// Recomputes are serialized and the catalog is read inside the
    /// serialized section, so the last recompute to finish always reflects
    /// the latest catalog. The new snapshot is only installed once the store
    /// has committed it; a failed write leaves the previous graph both stored
    /// and served. Returns the number of edges written.
    pub async fn recompute(
        &self,
        catalog: &dyn FilmCatalog,
        store: &dyn GraphStore,
    ) -> AppResult<usize> {
        let _guard = self.recompute_lock.lock().await;
        let start = Instant::now();

        let films = catalog.list_items().await?;
        let film_count = films.len();

        let graph = tokio::task::spawn_blocking(move || build_graph(&films))
            .await
            .map_err(|e| AppError::Internal(format!("Recompute task failed: {}", e)))??;

        let edges: Vec<SimilarityEdge> = graph.edges().collect();
        let written = store.replace_all(&edges).await?;
        self.install(graph);

        tracing::info!(
            films = film_count,
            edges = written,
            processing_time_ms = start.elapsed().as_millis(),
            "Similarity graph recomputed"
        );

        Ok(written)
    }

    /// Ids of the `limit` films most similar to `id`, best first
    pub fn similar(&self, id: FilmId, limit: usize) -> Vec<FilmId> {
        self.snapshot()
            .top_similar(id, limit)
            .into_iter()
            .map(|(target, _)| target)
            .collect()
    }

    /// Ranked recommendation ids for a request
    ///
    /// Ratings for the candidate pool come from `catalog`; candidates it
    /// cannot resolve are left out. No positives means no recommendations.
    pub async fn recommend(
        &self,
        catalog: &dyn FilmCatalog,
        request: &RecommendationRequest,
    ) -> AppResult<Vec<FilmId>> {
        let signals = Signals::from_request(request);
        let graph = self.snapshot();

        let pool = RecommendationScorer::new(&graph).candidate_pool(&signals, request.limit);
        if pool.is_empty() {
            return Ok(Vec::new());
        }

        let pooled_ids: Vec<FilmId> = pool.iter().map(|c| c.id).collect();
        let films = catalog.get_items(&pooled_ids).await?;

        let ranked = scorer::rerank(
            pool,
            |id| films.get(&id).map(|film| film.vote_average),
            request.limit,
        );

        Ok(ranked.into_iter().map(|c| c.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::MockFilmCatalog;
    use graph::MockGraphStore;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn film(id: i64, genres: &[&str], rating: f64) -> Film {
        Film {
            id: FilmId(id),
            tmdb_id: id * 10,
            title: format!("Film {}", id),
            original_title: None,
            original_language: None,
            release_date: None,
            release_year: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            keywords: vec![],
            director: None,
            cast: vec![],
            overview: None,
            poster_url: None,
            popularity: 0.0,
            vote_average: rating,
            vote_count: 100,
        }
    }

    fn corpus() -> Vec<Film> {
        vec![
            film(10, &["Comedy"], 6.0),
            film(20, &["Comedy"], 7.0),
            film(30, &["Drama"], 8.0),
        ]
    }

    fn accepting_store() -> MockGraphStore {
        let mut store = MockGraphStore::new();
        store
            .expect_replace_all()
            .returning(|edges| Ok(edges.len()));
        store
    }

    fn request(
        selected: &[i64],
        liked: &[i64],
        disliked: &[i64],
        limit: usize,
    ) -> RecommendationRequest {
        RecommendationRequest {
            selected_film_ids: selected.iter().map(|&n| FilmId(n)).collect(),
            liked_film_ids: liked.iter().map(|&n| FilmId(n)).collect(),
            disliked_film_ids: disliked.iter().map(|&n| FilmId(n)).collect(),
            limit,
        }
    }

    fn listing(films: Vec<Film>) -> MockFilmCatalog {
        let mut catalog = MockFilmCatalog::new();
        catalog
            .expect_list_items()
            .returning(move || Ok(films.clone()));
        catalog
    }

    fn catalog_of(films: Vec<Film>) -> MockFilmCatalog {
        let by_id: HashMap<FilmId, Film> = films.into_iter().map(|f| (f.id, f)).collect();
        let mut catalog = MockFilmCatalog::new();
        catalog.expect_get_items().returning(move |ids| {
            Ok(ids
                .iter()
                .filter_map(|id| by_id.get(id).map(|f| (*id, f.clone())))
                .collect())
        });
        catalog
    }

    #[test]
    fn test_comedy_pair_scenario() {
        let graph = build_graph(&corpus()).unwrap();

        assert_eq!(graph.top_similar(FilmId(10), 1)[0].0, FilmId(20));

        let score = |a: i64, b: i64| {
            graph
                .neighbours(FilmId(a))
                .iter()
                .find(|(t, _)| *t == FilmId(b))
                .map(|(_, s)| *s)
                .unwrap_or(0.0)
        };
        assert!(score(10, 20) > score(10, 30));
    }

    #[test]
    fn test_build_graph_insufficient_corpus() {
        let err = build_graph(&corpus()[..1]).unwrap_err();
        assert_eq!(err, EngineError::InsufficientCorpus { found: 1 });
    }

    #[test]
    fn test_build_graph_is_idempotent() {
        let films: Vec<Film> = (1..=25)
            .map(|i| {
                let genre = ["Action", "Comedy", "Horror"][i as usize % 3];
                film(i, &[genre, "Adventure"], 5.0)
            })
            .collect();

        let first: Vec<SimilarityEdge> = build_graph(&films).unwrap().edges().collect();
        let second: Vec<SimilarityEdge> = build_graph(&films).unwrap().edges().collect();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_recompute_installs_snapshot() {
        let recommender = Recommender::default();
        let store = accepting_store();

        let written = recommender.recompute(&listing(corpus()), &store).await.unwrap();

        assert!(written > 0);
        assert_eq!(recommender.snapshot().edge_count(), written);
        assert_eq!(recommender.similar(FilmId(10), 1), vec![FilmId(20)]);
    }

    #[tokio::test]
    async fn test_recompute_skips_insufficient_corpus() {
        let recommender = Recommender::default();
        let mut store = MockGraphStore::new();
        store.expect_replace_all().never();

        let result = recommender.recompute(&listing(vec![]), &store).await;

        assert!(matches!(
            result,
            Err(AppError::Engine(EngineError::InsufficientCorpus { found: 0 }))
        ));
        assert!(recommender.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failed_swap_keeps_previous_snapshot() {
        let recommender = Recommender::default();
        recommender
            .recompute(&listing(corpus()), &accepting_store())
            .await
            .unwrap();
        let before = recommender.snapshot();

        let mut failing = MockGraphStore::new();
        failing
            .expect_replace_all()
            .returning(|_| Err(AppError::Internal("disk full".to_string())));

        let mut grown = corpus();
        grown.push(film(40, &["Comedy"], 9.0));
        let result = recommender.recompute(&listing(grown), &failing).await;

        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &recommender.snapshot()));
        assert!(recommender.similar(FilmId(40), 5).is_empty());
    }

    #[tokio::test]
    async fn test_recompute_reads_catalog_inside_serialized_section() {
        let recommender = Arc::new(Recommender::default());
        let reads = Arc::new(AtomicUsize::new(0));

        let mut catalog = MockFilmCatalog::new();
        let counter = Arc::clone(&reads);
        catalog.expect_list_items().times(1).returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(corpus())
        });

        // Stand in for a recompute that is still running
        let running = recommender.recompute_lock.lock().await;

        let task = {
            let recommender = Arc::clone(&recommender);
            tokio::spawn(async move {
                recommender
                    .recompute(&catalog, &accepting_store())
                    .await
            })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(reads.load(Ordering::SeqCst), 0);

        drop(running);
        let written = task.await.unwrap().unwrap();

        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(recommender.snapshot().edge_count(), written);
    }

    #[tokio::test]
    async fn test_recompute_propagates_catalog_failure() {
        let recommender = Recommender::default();
        let mut catalog = MockFilmCatalog::new();
        catalog
            .expect_list_items()
            .returning(|| Err(AppError::Internal("catalog offline".to_string())));
        let mut store = MockGraphStore::new();
        store.expect_replace_all().never();

        let result = recommender.recompute(&catalog, &store).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(recommender.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let mut store = MockGraphStore::new();
        store.expect_load().returning(|| {
            Ok(vec![SimilarityEdge {
                source: FilmId(1),
                target: FilmId(2),
                score: 0.42,
            }])
        });

        let recommender = Recommender::load(&store).await.unwrap();

        assert_eq!(recommender.similar(FilmId(1), 3), vec![FilmId(2)]);
    }

    #[tokio::test]
    async fn test_recommend_excludes_all_signals() {
        let films: Vec<Film> = (1..=8).map(|i| film(i, &["Thriller"], 5.0)).collect();
        let recommender = Recommender::default();
        recommender
            .recompute(&listing(films.clone()), &accepting_store())
            .await
            .unwrap();
        let catalog = catalog_of(films);

        let ids = recommender
            .recommend(&catalog, &request(&[1], &[2], &[3], 10))
            .await
            .unwrap();

        let excluded: HashSet<FilmId> = [1, 2, 3].into_iter().map(FilmId).collect();
        assert!(!ids.is_empty());
        assert!(ids.iter().all(|id| !excluded.contains(id)));
    }

    #[tokio::test]
    async fn test_recommend_without_positives_is_empty() {
        let recommender = Recommender::default();
        recommender
            .recompute(&listing(corpus()), &accepting_store())
            .await
            .unwrap();
        let mut catalog = MockFilmCatalog::new();
        catalog.expect_get_items().never();

        let ids = recommender
            .recommend(&catalog, &request(&[], &[], &[10], 5))
            .await
            .unwrap();

        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_recommend_prefers_higher_rating_on_equal_similarity() {
        // 2 and 3 are identical documents, so equally similar to 1
        let films = vec![
            film(1, &["Western"], 5.0),
            film(2, &["Western"], 4.0),
            film(3, &["Western"], 9.0),
        ];
        let recommender = Recommender::default();
        recommender
            .recompute(&listing(films.clone()), &accepting_store())
            .await
            .unwrap();

        let ids = recommender
            .recommend(&catalog_of(films), &request(&[1], &[], &[], 2))
            .await
            .unwrap();

        assert_eq!(ids, vec![FilmId(3), FilmId(2)]);
    }

    #[tokio::test]
    async fn test_recommend_drops_unresolved_candidates() {
        let films: Vec<Film> = (1..=4).map(|i| film(i, &["Noir"], 5.0)).collect();
        let recommender = Recommender::default();
        recommender
            .recompute(&listing(films.clone()), &accepting_store())
            .await
            .unwrap();

        // Film 4 disappeared from the catalog after the recompute
        let catalog = catalog_of(films.into_iter().take(3).collect());
        let ids = recommender
            .recommend(&catalog, &request(&[1], &[], &[], 5))
            .await
            .unwrap();

        assert_eq!(ids, vec![FilmId(2), FilmId(3)]);
    }
}
