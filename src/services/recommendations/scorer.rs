//! Query-time aggregation over the similarity graph.
//!
//! Positive films add the scores of their neighbours, negative films take
//! half of theirs back, and the best `3 × limit` candidates are re-ranked by a
//! quality boost derived from each film's average rating.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use super::graph::SimilarityGraph;
use crate::models::{FilmId, RecommendationRequest};

/// Fraction of a disliked film's edge score subtracted from a candidate
pub const NEGATIVE_PENALTY: f64 = 0.5;

/// Candidates pooled per requested recommendation before re-ranking
pub const POOL_FACTOR: usize = 3;

/// Highest rating on the catalog scale
pub const MAX_RATING: f64 = 10.0;

/// Positive and negative signals of one request, deduplicated
///
/// A film given as both positive and negative is treated as positive only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    positives: BTreeSet<FilmId>,
    negatives: BTreeSet<FilmId>,
}

impl Signals {
    pub fn new(selected: &[FilmId], liked: &[FilmId], disliked: &[FilmId]) -> Self {
        let positives: BTreeSet<FilmId> = selected.iter().chain(liked).copied().collect();
        let negatives = disliked
            .iter()
            .copied()
            .filter(|id| !positives.contains(id))
            .collect();

        Self {
            positives,
            negatives,
        }
    }

    pub fn from_request(request: &RecommendationRequest) -> Self {
        Self::new(
            &request.selected_film_ids,
            &request.liked_film_ids,
            &request.disliked_film_ids,
        )
    }

    pub fn positives(&self) -> &BTreeSet<FilmId> {
        &self.positives
    }

    pub fn negatives(&self) -> &BTreeSet<FilmId> {
        &self.negatives
    }

    /// True when the film was acted on and must never be recommended
    pub fn contains(&self, id: FilmId) -> bool {
        self.positives.contains(&id) || self.negatives.contains(&id)
    }
}

/// A candidate after graph aggregation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: FilmId,
    pub running_score: f64,
}

/// A candidate after the quality re-rank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate {
    pub id: FilmId,
    pub running_score: f64,
    pub final_score: f64,
}

/// Walks one graph snapshot to score candidates for a set of signals
pub struct RecommendationScorer<'g> {
    graph: &'g SimilarityGraph,
}

impl<'g> RecommendationScorer<'g> {
    pub fn new(graph: &'g SimilarityGraph) -> Self {
        Self { graph }
    }

    /// Running score per candidate
    ///
    /// Only neighbours of positive films become candidates; neighbours of
    /// negative films can lower an existing score but never add an entry.
    pub fn accumulate(&self, signals: &Signals) -> HashMap<FilmId, f64> {
        let mut scores: HashMap<FilmId, f64> = HashMap::new();

        for &positive in signals.positives() {
            for &(target, score) in self.graph.neighbours(positive) {
                if signals.contains(target) {
                    continue;
                }
                *scores.entry(target).or_insert(0.0) += score;
            }
        }

        for &negative in signals.negatives() {
            for &(target, score) in self.graph.neighbours(negative) {
                if let Some(running) = scores.get_mut(&target) {
                    *running -= NEGATIVE_PENALTY * score;
                }
            }
        }

        scores
    }

    /// The leading `POOL_FACTOR × limit` candidates by running score
    ///
    /// Ties are broken by ascending film id.
    pub fn candidate_pool(&self, signals: &Signals, limit: usize) -> Vec<Candidate> {
        if signals.positives().is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut pool: Vec<Candidate> = self
            .accumulate(signals)
            .into_iter()
            .map(|(id, running_score)| Candidate { id, running_score })
            .collect();

        pool.sort_by(|a, b| {
            b.running_score
                .total_cmp(&a.running_score)
                .then_with(|| a.id.cmp(&b.id))
        });
        pool.truncate(POOL_FACTOR.saturating_mul(limit));
        pool
    }
}

/// Multiplicative boost in [0, 0.5] from a 0-10 rating
pub fn quality_boost(rating: f64) -> f64 {
    rating.clamp(0.0, MAX_RATING) / 20.0
}

/// Re-ranks a candidate pool by quality and keeps the best `limit`
///
/// `rating_of` resolves a film's average rating; candidates it cannot resolve
/// are dropped.
pub fn rerank<F>(pool: Vec<Candidate>, rating_of: F, limit: usize) -> Vec<RankedCandidate>
where
    F: Fn(FilmId) -> Option<f64>,
{
    let pooled = pool.len();

    let mut ranked: Vec<RankedCandidate> = pool
        .into_iter()
        .filter_map(|candidate| {
            let rating = rating_of(candidate.id)?;
            let final_score = candidate.running_score * (1.0 + quality_boost(rating));
            Some(RankedCandidate {
                id: candidate.id,
                running_score: candidate.running_score,
                final_score,
            })
        })
        .collect();

    let unresolved = pooled - ranked.len();
    if unresolved > 0 {
        tracing::debug!(unresolved, pooled, "Dropped candidates without metadata");
    }

    ranked.sort_by(compare_ranked);
    ranked.truncate(limit);
    ranked
}

fn compare_ranked(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| b.running_score.total_cmp(&a.running_score))
        .then_with(|| a.id.cmp(&b.id))
}
