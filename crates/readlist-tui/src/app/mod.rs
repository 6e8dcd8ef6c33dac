mod catalog;
mod update;

use std::time::Instant;

use ratatui::layout::Rect;

use readlist_core::{
    BookQuery, Config, FavoritesStore, FetchHandle, FilterController, GenreFilter, GenreIndex,
    LoadState, SortConfig,
};

use crate::model::table::BookTable;
use crate::theme::Theme;

/// Input mode determines how keyboard input is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

/// Screen regions recorded by the last render, for mouse hit-testing.
#[derive(Debug, Clone, Default)]
pub struct HitAreas {
    pub search: Option<Rect>,
    pub table: Option<Rect>,
    /// Column rects of the table, in header order.
    pub columns: Vec<Rect>,
    pub suggestions: Option<Rect>,
    /// Index of the first suggestion drawn in `suggestions`.
    pub suggestion_offset: usize,
    /// Index of the first book row drawn in `table`.
    pub table_offset: usize,
}

/// Main application state.
pub struct App {
    pub table: BookTable,
    pub sort: SortConfig,
    pub filter: FilterController,
    pub favorites: FavoritesStore,
    pub load: LoadState,
    /// Genre the table currently shows (set when a fetch result is installed).
    pub shown_genre: GenreFilter,
    pub genres_error: Option<String>,
    /// Records per table fetch; `None` disables truncation.
    pub page_size: Option<usize>,
    /// Channel to the fetch scheduler. `None` until the runtime is up.
    pub fetch: Option<FetchHandle>,

    pub input_mode: InputMode,
    /// Highlighted entry in the suggestion list.
    pub suggestion_cursor: Option<usize>,
    pub show_help: bool,
    pub should_quit: bool,
    pub tick: usize,
    pub theme: Theme,
    /// Height of the visible table area (set on resize, used for page up/down).
    pub visible_rows: usize,
    pub hit: HitAreas,
}

impl App {
    pub fn new(config: &Config, theme: Theme, favorites: FavoritesStore) -> Self {
        Self {
            table: BookTable::default(),
            sort: SortConfig::default(),
            filter: FilterController::new(GenreIndex::default(), config.blur_grace),
            favorites,
            load: LoadState::new(),
            shown_genre: GenreFilter::All,
            genres_error: None,
            page_size: config.page_size,
            fetch: None,
            input_mode: InputMode::Normal,
            suggestion_cursor: None,
            show_help: false,
            should_quit: false,
            tick: 0,
            theme,
            visible_rows: 20,
            hit: HitAreas::default(),
        }
    }

    /// Kick off the initial loads: the genre index and the first page.
    pub fn start(&mut self) {
        if let Some(fetch) = &self.fetch {
            fetch.load_genre_index();
        }
        self.request_books(self.filter.genre_filter().clone(), true);
    }

    fn query_for(&self, genre: GenreFilter) -> BookQuery {
        BookQuery::genre(genre).with_limit(self.page_size)
    }

    /// Ask the scheduler for books under `genre`. Filter edits go through the
    /// debounce window; loads and reloads skip it.
    pub(crate) fn request_books(&self, genre: GenreFilter, immediate: bool) {
        let query = self.query_for(genre);
        match &self.fetch {
            Some(fetch) if immediate => fetch.request_now(query),
            Some(fetch) => fetch.request(query),
            None => tracing::debug!(genre = %query.genre, "no fetch scheduler, request dropped"),
        }
    }

    /// Forward a filter change reported by the controller.
    pub(crate) fn on_filter_change(&mut self, changed: Option<GenreFilter>) {
        if let Some(genre) = changed {
            tracing::debug!(genre = %genre, "genre filter changed");
            self.suggestion_cursor = None;
            self.request_books(genre, false);
        }
    }

    /// Recompute the table order after a sort or favorite change.
    pub fn recompute_sorted_indices(&mut self) {
        let favorites = &self.favorites;
        self.table
            .resort(&self.sort, |b| favorites.is_book_favorite(b));
    }

    /// Suggestions currently offered under the search box.
    pub fn visible_suggestions(&self) -> &[String] {
        if self.filter.suggestions_visible() {
            self.filter.filtered_genres()
        } else {
            &[]
        }
    }

    /// Apply timers that depend on wall-clock time.
    pub(crate) fn on_tick(&mut self, now: Instant) {
        self.tick = self.tick.wrapping_add(1);
        if self.filter.tick(now) {
            self.suggestion_cursor = None;
        }
    }

    /// Render the current screen.
    pub fn view(&mut self, f: &mut ratatui::Frame) {
        let area = f.area();
        crate::view::books::render_in(f, self, area);

        if self.show_help {
            crate::view::help::render(f, &self.theme);
        }
    }
}

#[cfg(test)]
mod tests;
