//! Genre filter and the autocomplete search state machine.

use std::fmt;
use std::ops::Range;
use std::time::{Duration, Instant};

use crate::book::BookRecord;
use crate::genre::GenreIndex;

/// Sentinel genre meaning "no filter".
pub const ALL_GENRES: &str = "All";

/// Active genre filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum GenreFilter {
    #[default]
    All,
    Genre(String),
}

impl GenreFilter {
    /// Interpret user text: blank or `"All"` means no filter.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == ALL_GENRES {
            Self::All
        } else {
            Self::Genre(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_GENRES,
            Self::Genre(g) => g,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn matches(&self, book: &BookRecord) -> bool {
        match self {
            Self::All => true,
            Self::Genre(g) => book.has_genre(g),
        }
    }
}

impl fmt::Display for GenreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of the genre search box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub genre_filter: GenreFilter,
    pub search_input: String,
    /// Suggestions derived from the genre index for the current input.
    pub filtered_genres: Vec<String>,
    pub suggestions_visible: bool,
}

/// Drives [`FilterState`] from user input.
///
/// Every transition returns `Some(filter)` when the effective genre filter
/// changed; callers forward that value to the fetch scheduler.
#[derive(Debug, Clone)]
pub struct FilterController {
    state: FilterState,
    index: GenreIndex,
    blur_grace: Duration,
    /// Pending hide after a blur.
    hide_at: Option<Instant>,
}

impl FilterController {
    pub fn new(index: GenreIndex, blur_grace: Duration) -> Self {
        let filtered_genres = index.genres().to_vec();
        Self {
            state: FilterState {
                filtered_genres,
                ..FilterState::default()
            },
            index,
            blur_grace,
            hide_at: None,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn genre_filter(&self) -> &GenreFilter {
        &self.state.genre_filter
    }

    pub fn search_input(&self) -> &str {
        &self.state.search_input
    }

    pub fn filtered_genres(&self) -> &[String] {
        &self.state.filtered_genres
    }

    pub fn suggestions_visible(&self) -> bool {
        self.state.suggestions_visible
    }

    pub fn index(&self) -> &GenreIndex {
        &self.index
    }

    /// Replace the genre index (it arrives after the first catalog load).
    pub fn set_index(&mut self, index: GenreIndex) {
        self.index = index;
        self.state.filtered_genres = self.index.suggestions(&self.state.search_input);
    }

    fn set_filter(&mut self, filter: GenreFilter) -> Option<GenreFilter> {
        if self.state.genre_filter == filter {
            return None;
        }
        self.state.genre_filter = filter.clone();
        Some(filter)
    }

    /// The search text changed.
    ///
    /// Only an empty input touches the genre filter (resetting it to all);
    /// otherwise the filter waits for an explicit selection or submit.
    pub fn input_changed(&mut self, text: &str) -> Option<GenreFilter> {
        self.state.search_input = text.to_string();
        self.state.filtered_genres = self.index.suggestions(text);
        self.state.suggestions_visible = true;
        self.hide_at = None;
        if text.is_empty() {
            self.set_filter(GenreFilter::All)
        } else {
            None
        }
    }

    /// A genre was picked from the suggestion list or the dropdown.
    pub fn select_genre(&mut self, genre: &str) -> Option<GenreFilter> {
        let filter = GenreFilter::parse(genre);
        if filter.is_all() {
            return self.clear();
        }
        self.state.search_input = filter.as_str().to_string();
        self.state.filtered_genres = self.index.suggestions(&self.state.search_input);
        self.state.suggestions_visible = false;
        self.hide_at = None;
        self.set_filter(filter)
    }

    pub fn clear(&mut self) -> Option<GenreFilter> {
        self.state.search_input.clear();
        self.state.filtered_genres = self.index.genres().to_vec();
        self.state.suggestions_visible = false;
        self.hide_at = None;
        self.set_filter(GenreFilter::All)
    }

    /// Enter pressed: filter by the typed text as-is (trimmed).
    pub fn submit(&mut self) -> Option<GenreFilter> {
        let filter = GenreFilter::parse(&self.state.search_input);
        self.set_filter(filter)
    }

    pub fn focus(&mut self) {
        self.state.suggestions_visible = true;
        self.hide_at = None;
    }

    /// Schedule hiding the suggestions after the grace delay so a click on a
    /// suggestion still lands.
    pub fn blur(&mut self, now: Instant) {
        if self.state.suggestions_visible {
            self.hide_at = Some(now + self.blur_grace);
        }
    }

    /// Apply a pending blur. Returns true if the suggestions were hidden.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(deadline) if now >= deadline => {
                self.hide_at = None;
                self.state.suggestions_visible = false;
                true
            }
            _ => false,
        }
    }

    /// Step through the dropdown entries (`"All"` followed by every genre).
    pub fn cycle_genre(&mut self, step: isize) -> Option<GenreFilter> {
        let entries = self.index.with_all();
        let current = self.state.genre_filter.as_str().to_lowercase();
        let pos = entries
            .iter()
            .position(|e| e.to_lowercase() == current)
            .unwrap_or(0) as isize;
        let next = (pos + step).rem_euclid(entries.len() as isize) as usize;
        let genre = entries[next].clone();
        self.select_genre(&genre)
    }
}

fn lower_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Byte range of the first case-insensitive occurrence of `input` in `genre`.
pub fn highlight_match(genre: &str, input: &str) -> Option<Range<usize>> {
    if input.is_empty() {
        return None;
    }
    let needle: Vec<char> = input.chars().map(lower_char).collect();
    for (start, _) in genre.char_indices() {
        let mut matched = 0;
        let mut end = start;
        for (offset, c) in genre[start..].char_indices() {
            if matched == needle.len() || lower_char(c) != needle[matched] {
                break;
            }
            matched += 1;
            end = start + offset + c.len_utf8();
        }
        if matched == needle.len() {
            return Some(start..end);
        }
    }
    None
}
