//! Genre index: the distinct, normalized, sorted set of genres in a catalog.

use std::cmp::Ordering;
use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::book::BookRecord;
use crate::filter::ALL_GENRES;

/// Uppercase the first character of each word, leave the rest unchanged.
///
/// Words are split on whitespace and rejoined with single spaces.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-folded text with diacritics stripped (primary collation level).
fn fold_primary(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case-folded text with diacritics kept (secondary collation level).
fn fold_secondary(s: &str) -> String {
    s.nfd().flat_map(char::to_lowercase).collect()
}

/// Locale-style string comparison.
///
/// Base letters first, then accents, then case with lowercase ahead of
/// uppercase, so `"apple" < "Apple" < "Banana"` and `"éclair"` sorts next to
/// `"eclair"` instead of after `"z"`.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    fold_primary(a)
        .cmp(&fold_primary(b))
        .then_with(|| fold_secondary(a).cmp(&fold_secondary(b)))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

/// Derive the genre list from a full catalog.
///
/// Each entry is title-cased before deduplication, so `"science fiction"` and
/// `"Science fiction"` collapse into `"Science Fiction"`.
pub fn build_genre_index(books: &[BookRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut genres: Vec<String> = books
        .iter()
        .flat_map(|b| b.genre.iter())
        .map(|g| title_case(g))
        .filter(|g| !g.is_empty())
        .filter(|g| seen.insert(g.clone()))
        .collect();
    genres.sort_by(|a, b| locale_cmp(a, b));
    genres
}

/// Sorted genre list built once from the unfiltered catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreIndex {
    genres: Vec<String>,
}

impl GenreIndex {
    pub fn from_records(books: &[BookRecord]) -> Self {
        Self {
            genres: build_genre_index(books),
        }
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    /// Dropdown entries: the `"All"` sentinel followed by every genre.
    pub fn with_all(&self) -> Vec<String> {
        std::iter::once(ALL_GENRES.to_string())
            .chain(self.genres.iter().cloned())
            .collect()
    }

    /// Genres whose lowercase form contains the lowercase input, in index order.
    pub fn suggestions(&self, input: &str) -> Vec<String> {
        let needle = input.to_lowercase();
        self.genres
            .iter()
            .filter(|g| g.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}
