use readlist_core::CatalogEvent;

use super::App;

impl App {
    /// Fold a scheduler event into the UI state.
    pub fn handle_catalog_event(&mut self, event: CatalogEvent) {
        match event {
            CatalogEvent::GenresLoaded(index) => {
                tracing::debug!(genres = index.len(), "genre index ready");
                self.filter.set_index(index);
                self.genres_error = None;
                self.clamp_suggestion_cursor();
            }
            CatalogEvent::GenresFailed(error) => {
                self.genres_error = Some(error);
            }
            other => {
                if let Some((query, books)) = self.load.apply(other) {
                    tracing::debug!(genre = %query.genre, count = books.len(), "showing books");
                    self.shown_genre = query.genre;
                    let favorites = &self.favorites;
                    self.table
                        .replace(books, &self.sort, |b| favorites.is_book_favorite(b));
                }
            }
        }
    }

    pub(super) fn clamp_suggestion_cursor(&mut self) {
        let len = self.visible_suggestions().len();
        self.suggestion_cursor = match self.suggestion_cursor {
            Some(i) if i < len => Some(i),
            Some(_) if len > 0 => Some(len - 1),
            _ => None,
        };
    }
}
