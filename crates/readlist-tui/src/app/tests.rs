use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use readlist_core::{
    BookRecord, CatalogEvent, FAVORITES_STORAGE_KEY, FetchCommand, MemoryStorage, SortKey,
    StoragePort,
};
use tokio::sync::mpsc;

use super::*;
use crate::action::Action;

type Commands = mpsc::UnboundedReceiver<FetchCommand>;

/// Create an App wired to an inspectable command channel and volatile storage.
fn test_app() -> (App, Commands, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let favorites = FavoritesStore::hydrate(storage.clone());
    let mut app = App::new(&Config::default(), Theme::hacker(), favorites);
    let (tx, rx) = mpsc::unbounded_channel();
    app.fetch = Some(FetchHandle::new(tx));
    (app, rx, storage)
}

fn books() -> Vec<BookRecord> {
    vec![
        BookRecord::new("Dune", "Frank Herbert", 1965, &["science fiction", "adventure"])
            .with_id("1"),
        BookRecord::new("Emma", "Jane Austen", 1815, &["romance", "classic"]).with_id("2"),
        BookRecord::new("Cosmos", "Carl Sagan", 1980, &["astronomy", "non-fiction"])
            .with_id("9"),
        BookRecord::new("Gone Girl", "Gillian Flynn", 2012, &["mystery", "thriller"])
            .with_id("16"),
    ]
}

/// Deliver a complete fetch cycle for `genre` and return its sequence number.
fn deliver(app: &mut App, genre: GenreFilter, books: Vec<BookRecord>) -> u64 {
    let seq = app.load.latest_seq() + 1;
    let query = BookQuery::genre(genre).with_limit(app.page_size);
    app.handle_catalog_event(CatalogEvent::Started {
        seq,
        query: query.clone(),
    });
    app.handle_catalog_event(CatalogEvent::Loaded { seq, query, books });
    app.handle_catalog_event(CatalogEvent::Finished { seq });
    seq
}

/// App with the genre index and the first page already loaded.
fn loaded_app() -> (App, Commands, Arc<MemoryStorage>) {
    let (mut app, mut rx, storage) = test_app();
    app.handle_catalog_event(CatalogEvent::GenresLoaded(GenreIndex::from_records(&books())));
    deliver(&mut app, GenreFilter::All, books());
    drain(&mut rx);
    (app, rx, storage)
}

fn drain(rx: &mut Commands) -> Vec<FetchCommand> {
    let mut out = Vec::new();
    while let Ok(cmd) = rx.try_recv() {
        out.push(cmd);
    }
    out
}

fn debounced(genre: &str) -> FetchCommand {
    FetchCommand::Debounced(BookQuery::genre(GenreFilter::parse(genre)).with_limit(Some(10)))
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.update(Action::SearchInput(c));
    }
}

fn titles(app: &App) -> Vec<&str> {
    app.table.rows().map(|b| b.title.as_str()).collect()
}

// ── Startup ─────────────────────────────────────────────────────

#[test]
fn start_loads_genres_and_first_page_immediately() {
    let (mut app, mut rx, _) = test_app();
    app.start();
    assert_eq!(
        drain(&mut rx),
        vec![
            FetchCommand::GenreIndex,
            FetchCommand::Immediate(BookQuery::all().with_limit(Some(10))),
        ]
    );
}

#[test]
fn loaded_books_fill_the_table_in_catalog_order() {
    let (app, _rx, _) = loaded_app();
    assert_eq!(titles(&app), vec!["Dune", "Emma", "Cosmos", "Gone Girl"]);
    assert!(!app.load.is_loading());
    assert_eq!(app.shown_genre, GenreFilter::All);
}

// ── Search box and suggestions ──────────────────────────────────

#[test]
fn typing_does_not_fetch_until_a_genre_is_chosen() {
    let (mut app, mut rx, _) = loaded_app();
    app.update(Action::StartSearch);
    type_text(&mut app, "my");
    assert!(drain(&mut rx).is_empty());
    assert_eq!(app.visible_suggestions(), ["Astronomy", "Mystery"]);
}

#[test]
fn confirming_a_highlighted_suggestion_requests_that_genre() {
    let (mut app, mut rx, _) = loaded_app();
    app.update(Action::StartSearch);
    type_text(&mut app, "my");
    app.update(Action::SuggestionNext);
    app.update(Action::SuggestionNext);
    app.update(Action::SearchConfirm);

    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.filter.search_input(), "Mystery");
    assert_eq!(drain(&mut rx), vec![debounced("Mystery")]);
}

#[test]
fn confirming_without_highlight_submits_typed_text() {
    let (mut app, mut rx, _) = loaded_app();
    app.update(Action::StartSearch);
    type_text(&mut app, "thriller");
    app.update(Action::SearchConfirm);
    assert_eq!(drain(&mut rx), vec![debounced("thriller")]);
}

#[test]
fn erasing_the_search_text_resets_to_all_genres() {
    let (mut app, mut rx, _) = loaded_app();
    app.update(Action::StartSearch);
    type_text(&mut app, "romance");
    app.update(Action::SearchConfirm);
    drain(&mut rx);

    app.update(Action::StartSearch);
    app.update(Action::SearchErase);
    assert_eq!(drain(&mut rx), vec![debounced("All")]);
    assert_eq!(app.filter.genre_filter(), &GenreFilter::All);
}

#[test]
fn suggestion_navigation_wraps_around() {
    let (mut app, _rx, _) = loaded_app();
    app.update(Action::StartSearch);
    let count = app.visible_suggestions().len();
    assert!(count > 2);

    app.update(Action::SuggestionPrev);
    assert_eq!(app.suggestion_cursor, Some(count - 1));
    app.update(Action::SuggestionNext);
    assert_eq!(app.suggestion_cursor, Some(0));
}

#[test]
fn suggestions_hide_after_blur_grace() {
    let (mut app, _rx, _) = loaded_app();
    app.update(Action::StartSearch);
    app.update(Action::SearchCancel);
    assert_eq!(app.input_mode, InputMode::Normal);
    // Still visible during the grace window
    assert!(!app.visible_suggestions().is_empty());

    app.on_tick(Instant::now() + Duration::from_secs(1));
    assert!(app.visible_suggestions().is_empty());
}

#[test]
fn clear_filter_is_noop_when_already_all() {
    let (mut app, mut rx, _) = loaded_app();
    app.update(Action::ClearFilter);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn cycle_genre_steps_through_dropdown_entries() {
    let (mut app, mut rx, _) = loaded_app();
    app.update(Action::CycleGenre(1));
    assert_eq!(drain(&mut rx), vec![debounced("Adventure")]);
    app.update(Action::CycleGenre(-1));
    assert_eq!(drain(&mut rx), vec![debounced("All")]);
}

// ── Stale responses ─────────────────────────────────────────────

#[test]
fn stale_response_does_not_replace_newer_request() {
    let (mut app, _rx, _) = loaded_app();
    let base = app.load.latest_seq();
    let old = BookQuery::genre(GenreFilter::parse("romance")).with_limit(Some(10));
    let new = BookQuery::genre(GenreFilter::parse("mystery")).with_limit(Some(10));

    app.handle_catalog_event(CatalogEvent::Started {
        seq: base + 1,
        query: old.clone(),
    });
    app.handle_catalog_event(CatalogEvent::Started {
        seq: base + 2,
        query: new.clone(),
    });
    app.handle_catalog_event(CatalogEvent::Loaded {
        seq: base + 1,
        query: old,
        books: vec![books()[1].clone()],
    });
    assert_eq!(app.shown_genre, GenreFilter::All);
    assert_eq!(app.table.len(), 4);
    assert!(app.load.is_loading());

    app.handle_catalog_event(CatalogEvent::Loaded {
        seq: base + 2,
        query: new,
        books: vec![books()[3].clone()],
    });
    app.handle_catalog_event(CatalogEvent::Finished { seq: base + 2 });
    assert_eq!(titles(&app), vec!["Gone Girl"]);
    assert_eq!(app.shown_genre, GenreFilter::parse("mystery"));
    assert!(!app.load.is_loading());
}

#[test]
fn failed_fetch_keeps_previous_rows_and_records_error() {
    let (mut app, _rx, _) = loaded_app();
    let seq = app.load.latest_seq() + 1;
    let query = BookQuery::all().with_limit(Some(10));
    app.handle_catalog_event(CatalogEvent::Started {
        seq,
        query: query.clone(),
    });
    app.handle_catalog_event(CatalogEvent::Failed {
        seq,
        query,
        error: "timeout".to_string(),
    });
    app.handle_catalog_event(CatalogEvent::Finished { seq });

    assert_eq!(app.table.len(), 4);
    assert_eq!(app.load.last_error(), Some("timeout"));
    assert!(!app.load.is_loading());
}

// ── Favorites ───────────────────────────────────────────────────

#[test]
fn toggle_favorite_persists_under_book_key() {
    let (mut app, _rx, storage) = loaded_app();
    app.update(Action::ToggleFavorite);
    assert!(app.favorites.is_favorite("id:1"));
    assert!(storage.read(FAVORITES_STORAGE_KEY).unwrap().is_some());

    let reopened = FavoritesStore::hydrate(storage.clone());
    assert!(reopened.is_favorite("id:1"));

    app.update(Action::ToggleFavorite);
    assert!(!app.favorites.is_favorite("id:1"));
}

#[test]
fn favorite_sort_follows_toggles() {
    let (mut app, _rx, _) = loaded_app();
    app.update(Action::SortBy(SortKey::Favorite));
    app.update(Action::SortBy(SortKey::Favorite)); // descending: reading first
    app.update(Action::GoBottom);
    app.update(Action::ToggleFavorite); // Gone Girl

    assert_eq!(titles(&app)[0], "Gone Girl");
    assert_eq!(app.table.selected().unwrap().title, "Gone Girl");
}

#[test]
fn failed_persist_keeps_in_memory_flag() {
    let (mut app, _rx, storage) = loaded_app();
    storage.set_fail_writes(true);
    app.update(Action::ToggleFavorite);
    assert!(app.favorites.is_favorite("id:1"));
    assert!(app.favorites.last_persist_error().is_some());
}

// ── Sorting and navigation ──────────────────────────────────────

#[test]
fn sort_keeps_cursor_on_selected_book() {
    let (mut app, _rx, _) = loaded_app();
    app.update(Action::MoveDown); // Emma
    app.update(Action::SortBy(SortKey::Title));
    assert_eq!(titles(&app), vec!["Cosmos", "Dune", "Emma", "Gone Girl"]);
    assert_eq!(app.table.selected().unwrap().title, "Emma");

    app.update(Action::SortBy(SortKey::Title));
    assert_eq!(titles(&app), vec!["Gone Girl", "Emma", "Dune", "Cosmos"]);
    assert_eq!(app.sort.indicator(SortKey::Title), Some("\u{25BC}"));
    assert_eq!(app.table.selected().unwrap().title, "Emma");
}

#[test]
fn sort_by_year_is_numeric() {
    let (mut app, _rx, _) = loaded_app();
    app.update(Action::SortBy(SortKey::Year));
    assert_eq!(titles(&app), vec!["Emma", "Dune", "Cosmos", "Gone Girl"]);
}

#[test]
fn page_movement_uses_visible_rows() {
    let (mut app, _rx, _) = loaded_app();
    app.update(Action::Resize(80, 10)); // 2 visible rows
    app.update(Action::PageDown);
    assert_eq!(app.table.cursor, 2);
    app.update(Action::PageDown);
    assert_eq!(app.table.cursor, 3);
    app.update(Action::GoTop);
    assert_eq!(app.table.cursor, 0);
}

// ── Reload ──────────────────────────────────────────────────────

#[test]
fn reload_requests_current_genre_immediately() {
    let (mut app, mut rx, _) = loaded_app();
    app.update(Action::Reload);
    assert_eq!(
        drain(&mut rx),
        vec![FetchCommand::Immediate(BookQuery::all().with_limit(Some(10)))]
    );
}

#[test]
fn reload_retries_genre_index_after_failure() {
    let (mut app, mut rx, _) = test_app();
    app.handle_catalog_event(CatalogEvent::GenresFailed("offline".to_string()));
    assert_eq!(app.genres_error.as_deref(), Some("offline"));

    app.update(Action::Reload);
    let cmds = drain(&mut rx);
    assert_eq!(cmds[0], FetchCommand::GenreIndex);
    assert_eq!(cmds.len(), 2);
}

// ── Mouse ───────────────────────────────────────────────────────

/// Lay out hit areas the way an 80-column render would.
fn set_table_hit_areas(app: &mut App) {
    app.hit.table = Some(Rect::new(0, 4, 80, 10));
    app.hit.columns = vec![
        Rect::new(1, 5, 20, 8),
        Rect::new(22, 5, 22, 8),
        Rect::new(45, 5, 8, 8),
        Rect::new(54, 5, 16, 8),
        Rect::new(71, 5, 8, 8),
    ];
}

#[test]
fn click_on_header_sorts_by_column() {
    let (mut app, _rx, _) = loaded_app();
    set_table_hit_areas(&mut app);
    app.update(Action::ClickAt(25, 5)); // Author header
    assert_eq!(app.sort.key, Some(SortKey::Author));

    // Genre column has no sort key
    app.update(Action::ClickAt(60, 5));
    assert_eq!(app.sort.key, Some(SortKey::Author));
}

#[test]
fn click_on_row_selects_and_reading_cell_toggles() {
    let (mut app, _rx, _) = loaded_app();
    set_table_hit_areas(&mut app);

    app.update(Action::ClickAt(5, 8)); // third row
    assert_eq!(app.table.cursor, 2);
    assert!(app.favorites.is_empty());

    app.update(Action::ClickAt(72, 7)); // second row, reading column
    assert_eq!(app.table.cursor, 1);
    assert!(app.favorites.is_favorite("id:2"));
}

#[test]
fn click_on_suggestion_selects_genre() {
    let (mut app, mut rx, _) = loaded_app();
    app.update(Action::StartSearch);
    type_text(&mut app, "my");
    app.hit.suggestions = Some(Rect::new(1, 3, 40, 4));

    app.update(Action::ClickAt(5, 5)); // second entry
    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(drain(&mut rx), vec![debounced("Mystery")]);
}

/// Search mode with ten suggestions, more than the popup draws at once.
fn app_with_ten_suggestions() -> (App, Commands) {
    let (mut app, rx, _) = test_app();
    let genres: Vec<String> = (1..=10).map(|i| format!("a{i}")).collect();
    let refs: Vec<&str> = genres.iter().map(String::as_str).collect();
    let catalog = [BookRecord::new("T", "A", 2000, &refs)];
    app.handle_catalog_event(CatalogEvent::GenresLoaded(GenreIndex::from_records(&catalog)));
    app.update(Action::StartSearch);
    type_text(&mut app, "a");
    // 8 rows plus borders
    app.hit.suggestions = Some(Rect::new(1, 3, 40, 10));
    (app, rx)
}

#[test]
fn click_on_last_drawn_suggestion_selects_it() {
    let (mut app, mut rx) = app_with_ten_suggestions();
    assert_eq!(app.visible_suggestions().len(), 10);

    app.update(Action::ClickAt(5, 11)); // eighth row
    assert_eq!(drain(&mut rx), vec![debounced("A7")]);
}

#[test]
fn click_on_suggestion_popup_border_is_ignored() {
    let (mut app, mut rx) = app_with_ten_suggestions();

    app.update(Action::ClickAt(5, 12)); // bottom border
    app.update(Action::ClickAt(5, 3)); // top border
    assert!(drain(&mut rx).is_empty());
    assert_eq!(app.input_mode, InputMode::Search);
}

#[test]
fn click_on_search_box_focuses_it() {
    let (mut app, _rx, _) = loaded_app();
    app.hit.search = Some(Rect::new(0, 1, 80, 3));
    app.update(Action::ClickAt(10, 2));
    assert_eq!(app.input_mode, InputMode::Search);
    assert!(app.filter.suggestions_visible());
}

// ── Help overlay ────────────────────────────────────────────────

#[test]
fn help_overlay_swallows_navigation() {
    let (mut app, mut rx, _) = loaded_app();
    app.update(Action::ToggleHelp);
    assert!(app.show_help);

    app.update(Action::MoveDown);
    assert_eq!(app.table.cursor, 0);

    app.update(Action::ClearFilter);
    assert!(!app.show_help);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn quit_works_from_help() {
    let (mut app, _rx, _) = loaded_app();
    app.update(Action::ToggleHelp);
    assert!(app.update(Action::Quit));
    assert!(app.should_quit);
}
