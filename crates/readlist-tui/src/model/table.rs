use readlist_core::{BookRecord, SortConfig, sorted_indices};

/// Books currently shown in the table plus their display order.
#[derive(Debug, Default)]
pub struct BookTable {
    books: Vec<BookRecord>,
    /// Maps visual row index → index into `books` (recomputed on sort/load).
    order: Vec<usize>,
    pub cursor: usize,
}

impl BookTable {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Books in display order.
    pub fn rows(&self) -> impl Iterator<Item = &BookRecord> {
        self.order.iter().map(|&i| &self.books[i])
    }

    pub fn selected(&self) -> Option<&BookRecord> {
        self.order.get(self.cursor).map(|&i| &self.books[i])
    }

    /// Install a freshly fetched list. The cursor stays on the same book when
    /// it is still present, otherwise it is clamped.
    pub fn replace(
        &mut self,
        books: Vec<BookRecord>,
        sort: &SortConfig,
        is_favorite: impl Fn(&BookRecord) -> bool,
    ) {
        let prev_key = self.selected().map(BookRecord::favorite_key);
        self.books = books;
        self.order = sorted_indices(&self.books, sort, is_favorite);
        self.cursor = prev_key
            .and_then(|key| self.rows().position(|b| b.favorite_key() == key))
            .unwrap_or(0);
    }

    /// Recompute the display order, keeping the cursor on the same book.
    pub fn resort(&mut self, sort: &SortConfig, is_favorite: impl Fn(&BookRecord) -> bool) {
        let prev = self.order.get(self.cursor).copied();
        self.order = sorted_indices(&self.books, sort, is_favorite);
        if let Some(book_idx) = prev
            && let Some(pos) = self.order.iter().position(|&i| i == book_idx)
        {
            self.cursor = pos;
        } else {
            self.clamp_cursor();
        }
    }

    pub fn move_down(&mut self, n: usize) {
        self.cursor = (self.cursor + n).min(self.len().saturating_sub(1));
    }

    pub fn move_up(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_sub(n);
    }

    pub fn go_bottom(&mut self) {
        self.cursor = self.len().saturating_sub(1);
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.len().saturating_sub(1));
    }
}
