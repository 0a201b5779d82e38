//! Film → weighted text document.
//!
//! Field importance is expressed purely through repetition: genre tokens are
//! emitted three times, keyword tokens twice, everything else once. All fields
//! then share one vocabulary in the vectorizer.

use crate::models::Film;

/// Times each genre is repeated in a document
pub const GENRE_WEIGHT: usize = 3;

/// Times each keyword is repeated in a document
pub const KEYWORD_WEIGHT: usize = 2;

/// Derived text representation of one film, input to the vectorizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document(String);

impl Document {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds the weighted document for a film
///
/// Missing fields contribute nothing. The output only depends on the film's
/// attributes, so rebuilding an unchanged corpus yields identical documents.
pub fn build(film: &Film) -> Document {
    let mut tokens: Vec<String> = Vec::new();

    for _ in 0..GENRE_WEIGHT {
        tokens.extend(film.genres.iter().cloned());
    }

    for _ in 0..KEYWORD_WEIGHT {
        tokens.extend(film.keywords.iter().cloned());
    }

    if let Some(director) = &film.director {
        tokens.push(director.clone());
    }

    tokens.extend(film.cast.iter().cloned());
    tokens.extend(lowercase_words(&film.title));

    if let Some(overview) = &film.overview {
        tokens.extend(lowercase_words(overview));
    }

    tokens.retain(|t| !t.trim().is_empty());
    Document(tokens.join(" "))
}

fn lowercase_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(str::to_lowercase)
}
