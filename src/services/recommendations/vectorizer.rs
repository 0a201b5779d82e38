//! TF-IDF vectorization over the full film corpus.
//!
//! The analyzer lower-cases, extracts runs of two or more word characters,
//! drops English stop words and emits unigrams plus bigrams. Terms are
//! weighted by raw count times smoothed inverse document frequency, and each
//! row is L2-normalised so that a dot product is a cosine similarity.
//!
//! The model is fitted from scratch on every recompute and is never updated
//! in place.

use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use super::{features::Document, stop_words};
use crate::error::EngineError;

/// Vocabulary cap, most frequent terms win
pub const MAX_FEATURES: usize = 5000;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// One L2-normalised document vector, entries sorted by column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sparse dot product; both sides are sorted by column
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_col, a_val) = self.entries[i];
            let (b_col, b_val) = other.entries[j];
            match a_col.cmp(&b_col) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_val * b_val;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Document-term matrix, one row per input document
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: Vec<SparseVector>,
    n_cols: usize,
}

impl SparseMatrix {
    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }
}

/// Fitted vocabulary and IDF weights for one corpus snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct TfidfModel {
    /// Term → column, columns assigned in alphabetical term order
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfModel {
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn column(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.column(term).map(|col| self.idf[col])
    }

    fn fit(counts: &[HashMap<String, u32>], max_features: usize) -> Self {
        let n_docs = counts.len() as f64;

        let mut corpus_frequency: HashMap<&str, u64> = HashMap::new();
        let mut document_frequency: HashMap<&str, u32> = HashMap::new();
        for doc in counts {
            for (term, count) in doc {
                *corpus_frequency.entry(term.as_str()).or_default() += u64::from(*count);
                *document_frequency.entry(term.as_str()).or_default() += 1;
            }
        }

        let mut ranked: Vec<(&str, u64)> = corpus_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort_unstable();

        let idf = terms
            .iter()
            .map(|term| {
                let df = f64::from(document_frequency[term]);
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(col, term)| (term.to_string(), col))
            .collect();

        Self { vocabulary, idf }
    }

    fn project(&self, counts: &[HashMap<String, u32>]) -> SparseMatrix {
        let rows = counts
            .par_iter()
            .map(|doc| {
                let mut entries: Vec<(usize, f64)> = doc
                    .iter()
                    .filter_map(|(term, count)| {
                        self.column(term)
                            .map(|col| (col, f64::from(*count) * self.idf[col]))
                    })
                    .collect();
                entries.sort_unstable_by_key(|(col, _)| *col);

                let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, v) in entries.iter_mut() {
                        *v /= norm;
                    }
                }

                SparseVector { entries }
            })
            .collect();

        SparseMatrix {
            rows,
            n_cols: self.vocabulary.len(),
        }
    }
}

/// Fits a TF-IDF model and projects the corpus into it
#[derive(Debug, Clone)]
pub struct Vectorizer {
    max_features: usize,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self {
            max_features: MAX_FEATURES,
        }
    }
}

impl Vectorizer {
    pub fn with_max_features(max_features: usize) -> Self {
        Self { max_features }
    }

    /// Fits the vocabulary on `documents` and returns one row per document
    ///
    /// Fails with `InsufficientCorpus` for fewer than two documents.
    pub fn fit_transform(
        &self,
        documents: &[Document],
    ) -> Result<(TfidfModel, SparseMatrix), EngineError> {
        if documents.len() < 2 {
            return Err(EngineError::InsufficientCorpus {
                found: documents.len(),
            });
        }

        let counts: Vec<HashMap<String, u32>> = documents
            .par_iter()
            .map(|doc| term_counts(doc.as_str()))
            .collect();

        let model = TfidfModel::fit(&counts, self.max_features);
        let matrix = model.project(&counts);

        Ok((model, matrix))
    }
}

/// Unigram and bigram counts for one document
fn term_counts(text: &str) -> HashMap<String, u32> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !stop_words::ENGLISH.contains(*token))
        .collect();

    let mut counts: HashMap<String, u32> = HashMap::new();
    for token in &tokens {
        *counts.entry((*token).to_string()).or_default() += 1;
    }
    for pair in tokens.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1;
    }

    counts
}
