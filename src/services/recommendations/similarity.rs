use rayon::prelude::*;

use super::vectorizer::SparseMatrix;

/// Neighbours kept per film
pub const TOP_N: usize = 20;

/// Scores at or below this are never stored
pub const MIN_SCORE: f64 = 0.1;

/// Pruned neighbour list of one row: (target row, score), best first
pub type Neighbours = Vec<(usize, f64)>;

/// Computes pairwise cosine similarity and prunes it to a top-N list per row
///
/// Every row is scored against every other row, so time grows with the square
/// of the corpus. Rows are processed independently and in parallel; each
/// worker only holds one row of scores at a time.
#[derive(Debug, Clone)]
pub struct SimilarityComputer {
    top_n: usize,
    min_score: f64,
}

impl Default for SimilarityComputer {
    fn default() -> Self {
        Self {
            top_n: TOP_N,
            min_score: MIN_SCORE,
        }
    }
}

impl SimilarityComputer {
    pub fn new(top_n: usize, min_score: f64) -> Self {
        Self { top_n, min_score }
    }

    /// Returns the pruned neighbours of every row, indexed like the matrix
    ///
    /// Per row the diagonal is excluded, entries are ordered by score
    /// descending with the lower target index first on ties, at most `top_n`
    /// are kept and anything not above `min_score` is dropped.
    pub fn compute(&self, matrix: &SparseMatrix) -> Vec<Neighbours> {
        let n = matrix.n_rows();

        // Column → (row, weight), rows ascending
        let mut postings: Vec<Vec<(usize, f64)>> = vec![Vec::new(); matrix.n_cols()];
        for (row, vector) in matrix.rows().iter().enumerate() {
            for &(col, value) in vector.entries() {
                postings[col].push((row, value));
            }
        }

        matrix
            .rows()
            .par_iter()
            .enumerate()
            .map(|(source, vector)| {
                let mut scores = vec![0.0_f64; n];
                for &(col, value) in vector.entries() {
                    for &(target, weight) in &postings[col] {
                        scores[target] += value * weight;
                    }
                }
                self.prune(source, &scores)
            })
            .collect()
    }

    fn prune(&self, source: usize, scores: &[f64]) -> Neighbours {
        let mut neighbours: Neighbours = scores
            .iter()
            .enumerate()
            .filter(|&(target, &score)| target != source && score > self.min_score)
            .map(|(target, &score)| (target, score.min(1.0)))
            .collect();

        neighbours.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        neighbours.truncate(self.top_n);
        neighbours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Film, FilmId};
    use crate::services::recommendations::{features, vectorizer::Vectorizer};
    use approx::assert_abs_diff_eq;

    fn film(id: i64, genres: &[&str], keywords: &[&str]) -> Film {
        Film {
            id: FilmId(id),
            tmdb_id: id,
            title: String::new(),
            original_title: None,
            original_language: None,
            release_date: None,
            release_year: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            director: None,
            cast: vec![],
            overview: None,
            poster_url: None,
            popularity: 0.0,
            vote_average: 0.0,
            vote_count: 0,
        }
    }

    fn neighbours_of(films: &[Film]) -> Vec<Neighbours> {
        let documents: Vec<_> = films.iter().map(features::build).collect();
        let (_, matrix) = Vectorizer::default().fit_transform(&documents).unwrap();
        SimilarityComputer::default().compute(&matrix)
    }

    #[test]
    fn test_same_genre_ranks_above_other_genre() {
        let films = vec![
            film(1, &["Comedy", "Romance"], &["wedding"]),
            film(2, &["Comedy", "Romance"], &["divorce"]),
            film(3, &["Drama", "Romance"], &["war"]),
        ];

        let neighbours = neighbours_of(&films);
        let a = &neighbours[0];

        assert_eq!(a[0].0, 1);
        let score_ab = a[0].1;
        let score_ac = a.iter().find(|(t, _)| *t == 2).map(|(_, s)| *s).unwrap_or(0.0);
        assert!(score_ab > score_ac);
    }

    #[test]
    fn test_identical_documents_score_one() {
        let films = vec![
            film(1, &["Western"], &["bounty hunter"]),
            film(2, &["Western"], &["bounty hunter"]),
            film(3, &["Animation"], &["talking animals"]),
        ];

        let neighbours = neighbours_of(&films);

        assert_eq!(neighbours[0][0].0, 1);
        assert_abs_diff_eq!(neighbours[0][0].1, 1.0, epsilon = 1e-6);
        assert_eq!(neighbours[1][0].0, 0);
        assert_abs_diff_eq!(neighbours[1][0].1, 1.0, epsilon = 1e-6);
        // Disjoint vocabularies never clear the threshold
        assert!(neighbours[2].is_empty());
    }

    #[test]
    fn test_no_self_edges_and_bounded_sorted_lists() {
        // 30 films sharing a genre produce more than TOP_N candidates each
        let films: Vec<Film> = (0..30)
            .map(|i| {
                let keyword = format!("topic{}", i % 7);
                film(i, &["Thriller"], &[keyword.as_str()])
            })
            .collect();

        for (source, row) in neighbours_of(&films).iter().enumerate() {
            assert!(row.len() <= TOP_N);
            assert!(row.iter().all(|(target, _)| *target != source));
            assert!(row.iter().all(|(_, score)| *score > MIN_SCORE && *score <= 1.0));
            for pair in row.windows(2) {
                let ordered =
                    pair[0].1 > pair[1].1 || (pair[0].1 == pair[1].1 && pair[0].0 < pair[1].0);
                assert!(ordered, "row {} out of order: {:?}", source, pair);
            }
        }
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        let films = vec![
            film(1, &["Horror"], &["ghost"]),
            film(2, &["Horror"], &["ghost"]),
            film(3, &["Horror"], &["ghost"]),
            film(4, &["Musical"], &[]),
        ];

        let neighbours = neighbours_of(&films);

        let targets: Vec<usize> = neighbours[1].iter().map(|(t, _)| *t).collect();
        assert_eq!(targets, vec![0, 2]);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let films: Vec<Film> = (0..12)
            .map(|i| film(i, &["Crime", if i % 2 == 0 { "Mystery" } else { "Thriller" }], &[]))
            .collect();

        assert_eq!(neighbours_of(&films), neighbours_of(&films));
    }

    #[test]
    fn test_custom_limits() {
        let films: Vec<Film> = (0..5).map(|i| film(i, &["Documentary"], &[])).collect();
        let documents: Vec<_> = films.iter().map(features::build).collect();
        let (_, matrix) = Vectorizer::default().fit_transform(&documents).unwrap();

        let neighbours = SimilarityComputer::new(2, 0.1).compute(&matrix);
        assert!(neighbours.iter().all(|row| row.len() == 2));
        assert_eq!(neighbours[0].iter().map(|(t, _)| *t).collect::<Vec<_>>(), vec![1, 2]);
    }
}
