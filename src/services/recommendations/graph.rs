use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::{
    error::AppResult,
    models::{FilmId, SimilarityEdge},
};

/// Persistence contract for the similarity graph
///
/// The engine only ever swaps the whole graph; individual edges are never
/// inserted, updated or removed on their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    /// Atomically replaces every stored edge with `edges`
    ///
    /// Either all edges become visible or, on failure, the previously stored
    /// graph is left untouched. Returns the number of edges written.
    async fn replace_all(&self, edges: &[SimilarityEdge]) -> AppResult<usize>;

    /// Loads the stored graph, edges of one source in stored rank order
    async fn load(&self) -> AppResult<Vec<SimilarityEdge>>;
}

/// Immutable similarity graph for one corpus snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityGraph {
    neighbours: BTreeMap<FilmId, Vec<(FilmId, f64)>>,
    edge_count: usize,
    computed_at: DateTime<Utc>,
}

impl Default for SimilarityGraph {
    fn default() -> Self {
        Self::empty()
    }
}

impl SimilarityGraph {
    /// A graph with no edges, served until the first snapshot is installed
    pub fn empty() -> Self {
        Self {
            neighbours: BTreeMap::new(),
            edge_count: 0,
            computed_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Groups edges by source, keeping the order in which they are given
    ///
    /// Edges are expected best-first per source, as produced by the similarity
    /// computation or read back from the store.
    pub fn from_edges(
        edges: impl IntoIterator<Item = SimilarityEdge>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let mut neighbours: BTreeMap<FilmId, Vec<(FilmId, f64)>> = BTreeMap::new();
        let mut edge_count = 0;

        for edge in edges {
            neighbours
                .entry(edge.source)
                .or_default()
                .push((edge.target, edge.score));
            edge_count += 1;
        }

        Self {
            neighbours,
            edge_count,
            computed_at,
        }
    }

    /// Outgoing edges of `id`, best first; empty when the film has none
    pub fn neighbours(&self, id: FilmId) -> &[(FilmId, f64)] {
        self.neighbours.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The `limit` most similar films to `id`, best first
    pub fn top_similar(&self, id: FilmId, limit: usize) -> Vec<(FilmId, f64)> {
        self.neighbours(id).iter().take(limit).copied().collect()
    }

    /// All edges, grouped by ascending source id, best first within a source
    pub fn edges(&self) -> impl Iterator<Item = SimilarityEdge> + '_ {
        self.neighbours.iter().flat_map(|(&source, targets)| {
            targets.iter().map(move |&(target, score)| SimilarityEdge {
                source,
                target,
                score,
            })
        })
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of films with at least one outgoing edge
    pub fn source_count(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// When the snapshot was computed or loaded
    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    /// Version tag of the snapshot, used to key derived caches
    pub fn version(&self) -> i64 {
        self.computed_at.timestamp_millis()
    }
}
