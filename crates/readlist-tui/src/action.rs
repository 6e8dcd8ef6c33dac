use readlist_core::SortKey;

/// User intents produced by [`crate::input::map_event`] and consumed by
/// [`crate::app::App::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    GoTop,
    GoBottom,
    /// Flip "currently reading" on the selected book.
    ToggleFavorite,
    /// Header activated: sort by the column or flip its direction.
    SortBy(SortKey),
    /// Focus the genre search box.
    StartSearch,
    SearchInput(char),
    SearchBackspace,
    /// Ctrl+U in the search box: erase the typed text.
    SearchErase,
    /// Enter: pick the highlighted suggestion or filter by the typed text.
    SearchConfirm,
    /// Esc: leave the search box; suggestions hide after the grace delay.
    SearchCancel,
    SuggestionNext,
    SuggestionPrev,
    /// Reset the genre filter to all books.
    ClearFilter,
    /// Step through the genre list (`"All"` first).
    CycleGenre(isize),
    Reload,
    ToggleHelp,
    ClickAt(u16, u16),
    Resize(u16, u16),
    Tick,
    None,
}
