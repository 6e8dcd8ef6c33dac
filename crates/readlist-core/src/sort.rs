//! Client-side column sorting for the book table.

use crate::book::BookRecord;

/// Sortable table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Author,
    Year,
    Favorite,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Year => "year",
            Self::Favorite => "currently reading",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            Self::Ascending => "\u{25B2}",
            Self::Descending => "\u{25BC}",
        }
    }
}

/// Active sort column and direction. `key == None` keeps catalog order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortConfig {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortConfig {
    /// Header clicked: toggle direction on the active column, otherwise sort
    /// the new column ascending.
    pub fn select(&mut self, key: SortKey) {
        if self.key == Some(key) {
            self.direction = self.direction.toggled();
        } else {
            self.key = Some(key);
            self.direction = SortDirection::Ascending;
        }
    }

    /// Arrow shown next to `key`'s header, if it is the active column.
    pub fn indicator(&self, key: SortKey) -> Option<&'static str> {
        (self.key == Some(key)).then(|| self.direction.indicator())
    }
}

/// Precomputed comparison value. Numeric values order before text, which
/// puts unparseable years after every numeric one.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Numeric(i64),
    Text(String),
}

impl SortValue {
    fn of(book: &BookRecord, key: SortKey, is_favorite: &impl Fn(&BookRecord) -> bool) -> Self {
        match key {
            SortKey::Title => Self::Text(book.title.to_lowercase()),
            SortKey::Author => Self::Text(book.author.to_lowercase()),
            SortKey::Year => match book.year.numeric() {
                Some(n) => Self::Numeric(n),
                None => Self::Text(book.year.to_string().to_lowercase()),
            },
            SortKey::Favorite => Self::Numeric(i64::from(is_favorite(book))),
        }
    }
}

/// Display order of `books` as indices into the slice.
///
/// Stable in both directions: descending reverses the comparison, not the
/// output, so equal keys keep their catalog order.
pub fn sorted_indices<F>(books: &[BookRecord], config: &SortConfig, is_favorite: F) -> Vec<usize>
where
    F: Fn(&BookRecord) -> bool,
{
    let mut indices: Vec<usize> = (0..books.len()).collect();
    let Some(key) = config.key else {
        return indices;
    };

    let values: Vec<SortValue> = books
        .iter()
        .map(|b| SortValue::of(b, key, &is_favorite))
        .collect();

    indices.sort_by(|&a, &b| {
        let ord = values[a].cmp(&values[b]);
        match config.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    indices
}

/// Sorted view of `books`; the slice itself is left untouched.
pub fn sort_books<'a, F>(
    books: &'a [BookRecord],
    config: &SortConfig,
    is_favorite: F,
) -> Vec<&'a BookRecord>
where
    F: Fn(&BookRecord) -> bool,
{
    sorted_indices(books, config, is_favorite)
        .into_iter()
        .map(|i| &books[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_favorites(_: &BookRecord) -> bool {
        false
    }

    fn titles(books: &[&BookRecord]) -> Vec<String> {
        books.iter().map(|b| b.title.clone()).collect()
    }

    fn sort_by(key: SortKey, direction: SortDirection) -> SortConfig {
        SortConfig {
            key: Some(key),
            direction,
        }
    }

    fn ascending(key: SortKey) -> SortConfig {
        sort_by(key, SortDirection::Ascending)
    }

    fn descending(key: SortKey) -> SortConfig {
        sort_by(key, SortDirection::Descending)
    }

    #[test]
    fn scenario_sort_by_year_ascending() {
        let books = vec![
            BookRecord::new("Dune", "Herbert", 1965, &["science fiction"]),
            BookRecord::new("Emma", "Austen", 1815, &["romance"]),
        ];
        let sorted = sort_books(&books, &ascending(SortKey::Year), no_favorites);
        assert_eq!(titles(&sorted), vec!["Emma", "Dune"]);
        // input untouched
        assert_eq!(books[0].title, "Dune");
    }

    #[test]
    fn no_key_keeps_input_order() {
        let books = vec![
            BookRecord::new("b", "x", 2, &[]),
            BookRecord::new("a", "y", 1, &[]),
        ];
        assert_eq!(sorted_indices(&books, &SortConfig::default(), no_favorites), vec![0, 1]);
    }

    #[test]
    fn descending_is_exact_reverse_without_ties() {
        let books = vec![
            BookRecord::new("A", "x", 1990, &[]),
            BookRecord::new("B", "x", 1850, &[]),
            BookRecord::new("C", "x", 2020, &[]),
            BookRecord::new("D", "x", 1700, &[]),
        ];
        let asc = sorted_indices(&books, &ascending(SortKey::Year), no_favorites);
        let mut desc = sorted_indices(&books, &descending(SortKey::Year), no_favorites);
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn ties_keep_input_order_in_both_directions() {
        let books = vec![
            BookRecord::new("First", "x", 2000, &[]),
            BookRecord::new("Old", "x", 1900, &[]),
            BookRecord::new("Second", "x", 2000, &[]),
            BookRecord::new("Third", "x", 2000, &[]),
        ];
        let asc = sort_books(&books, &ascending(SortKey::Year), no_favorites);
        assert_eq!(titles(&asc), vec!["Old", "First", "Second", "Third"]);
        let desc = sort_books(&books, &descending(SortKey::Year), no_favorites);
        assert_eq!(titles(&desc), vec!["First", "Second", "Third", "Old"]);
    }

    #[test]
    fn title_and_author_compare_case_insensitively() {
        let books = vec![
            BookRecord::new("cherry", "Bob", 1, &[]),
            BookRecord::new("Banana", "alice", 2, &[]),
            BookRecord::new("apple", "Carol", 3, &[]),
        ];
        let by_title = sort_books(&books, &ascending(SortKey::Title), no_favorites);
        assert_eq!(titles(&by_title), vec!["apple", "Banana", "cherry"]);
        let by_author = sort_books(&books, &ascending(SortKey::Author), no_favorites);
        assert_eq!(titles(&by_author), vec!["Banana", "cherry", "apple"]);
    }

    #[test]
    fn favorites_sort_as_flags() {
        let books = vec![
            BookRecord::new("A", "x", 1, &[]),
            BookRecord::new("B", "x", 2, &[]),
            BookRecord::new("C", "x", 3, &[]),
        ];
        let is_fav = |b: &BookRecord| b.title == "B";
        let desc = sort_books(&books, &descending(SortKey::Favorite), is_fav);
        assert_eq!(titles(&desc), vec!["B", "A", "C"]);
        let asc = sort_books(&books, &ascending(SortKey::Favorite), is_fav);
        assert_eq!(titles(&asc), vec!["A", "C", "B"]);
    }

    #[test]
    fn text_years_sort_after_numeric_years() {
        let books = vec![
            BookRecord::new("Meditations", "x", crate::Year::Text("c. 180".into()), &[]),
            BookRecord::new("Diary", "x", crate::Year::Text("1947".into()), &[]),
            BookRecord::new("Emma", "x", 1815, &[]),
        ];
        let asc = sort_books(&books, &ascending(SortKey::Year), no_favorites);
        assert_eq!(titles(&asc), vec!["Emma", "Diary", "Meditations"]);
    }

    #[test]
    fn select_toggles_same_key_and_resets_on_new_key() {
        let mut config = SortConfig::default();
        config.select(SortKey::Title);
        assert_eq!(config, sort_by(SortKey::Title, SortDirection::Ascending));
        config.select(SortKey::Title);
        assert_eq!(config.direction, SortDirection::Descending);
        assert_eq!(config.indicator(SortKey::Title), Some("\u{25BC}"));
        assert_eq!(config.indicator(SortKey::Year), None);
        config.select(SortKey::Year);
        assert_eq!(config, sort_by(SortKey::Year, SortDirection::Ascending));
    }
}
