use std::time::Instant;

use ratatui::layout::Position;
use readlist_core::SortKey;

use super::{App, InputMode};
use crate::action::Action;
use crate::view::books::COLUMN_KEYS;

/// Column index of "Currently Reading" in the table.
const FAVORITE_COLUMN: usize = 4;

impl App {
    /// Process a user action and update state. Returns true if the app should quit.
    pub fn update(&mut self, action: Action) -> bool {
        // Help overlay intercepts everything but quit and timers
        if self.show_help {
            match action {
                Action::Quit => {
                    self.should_quit = true;
                    return true;
                }
                Action::ToggleHelp | Action::ClearFilter | Action::SearchCancel => {
                    self.show_help = false;
                }
                Action::Tick => self.on_tick(Instant::now()),
                Action::Resize(_w, h) => self.on_resize(h),
                _ => {}
            }
            return false;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
                return true;
            }
            Action::ToggleHelp => {
                self.show_help = true;
            }
            Action::MoveDown => self.table.move_down(1),
            Action::MoveUp => self.table.move_up(1),
            Action::PageDown => self.table.move_down(self.visible_rows.max(1)),
            Action::PageUp => self.table.move_up(self.visible_rows.max(1)),
            Action::GoTop => self.table.cursor = 0,
            Action::GoBottom => self.table.go_bottom(),
            Action::ToggleFavorite => self.toggle_selected_favorite(),
            Action::SortBy(key) => {
                self.sort.select(key);
                tracing::debug!(
                    key = key.label(),
                    direction = ?self.sort.direction,
                    "sort changed"
                );
                self.recompute_sorted_indices();
            }
            Action::StartSearch => {
                self.input_mode = InputMode::Search;
                self.suggestion_cursor = None;
                self.filter.focus();
            }
            Action::SearchInput(c) => {
                let mut text = self.filter.search_input().to_string();
                text.push(c);
                self.set_search_text(&text);
            }
            Action::SearchBackspace => {
                let mut text = self.filter.search_input().to_string();
                text.pop();
                self.set_search_text(&text);
            }
            Action::SearchErase => self.set_search_text(""),
            Action::SearchConfirm => {
                let picked = self
                    .suggestion_cursor
                    .and_then(|i| self.visible_suggestions().get(i).cloned());
                let changed = match picked {
                    Some(genre) => self.filter.select_genre(&genre),
                    None => self.filter.submit(),
                };
                self.leave_search(Instant::now());
                self.on_filter_change(changed);
            }
            Action::SearchCancel => self.leave_search(Instant::now()),
            Action::SuggestionNext => self.step_suggestion(1),
            Action::SuggestionPrev => self.step_suggestion(-1),
            Action::ClearFilter => {
                let changed = self.filter.clear();
                self.on_filter_change(changed);
            }
            Action::CycleGenre(step) => {
                let changed = self.filter.cycle_genre(step);
                self.on_filter_change(changed);
            }
            Action::Reload => {
                if (self.genres_error.is_some() || self.filter.index().is_empty())
                    && let Some(fetch) = &self.fetch
                {
                    fetch.load_genre_index();
                }
                self.request_books(self.filter.genre_filter().clone(), true);
            }
            Action::ClickAt(x, y) => self.handle_click(x, y, Instant::now()),
            Action::Tick => self.on_tick(Instant::now()),
            Action::Resize(_w, h) => self.on_resize(h),
            Action::None => {}
        }
        false
    }

    fn on_resize(&mut self, height: u16) {
        // header + search box + table borders/header + footer
        self.visible_rows = (height as usize).saturating_sub(8);
    }

    fn set_search_text(&mut self, text: &str) {
        let changed = self.filter.input_changed(text);
        self.suggestion_cursor = None;
        self.on_filter_change(changed);
    }

    fn leave_search(&mut self, now: Instant) {
        self.input_mode = InputMode::Normal;
        self.filter.blur(now);
    }

    fn step_suggestion(&mut self, step: isize) {
        let len = self.visible_suggestions().len();
        if len == 0 {
            self.suggestion_cursor = None;
            return;
        }
        let next = match self.suggestion_cursor {
            None if step < 0 => len - 1,
            None => 0,
            Some(i) => (i as isize + step).rem_euclid(len as isize) as usize,
        };
        self.suggestion_cursor = Some(next);
    }

    fn toggle_selected_favorite(&mut self) {
        let Some(book) = self.table.selected() else {
            return;
        };
        let key = book.favorite_key();
        let title = book.title.clone();
        let reading = self.favorites.toggle(&key);
        tracing::info!(title = %title, reading, "toggled currently reading");
        if self.sort.key == Some(SortKey::Favorite) {
            self.recompute_sorted_indices();
        }
    }

    fn pick_suggestion(&mut self, index: usize) {
        let Some(genre) = self.visible_suggestions().get(index).cloned() else {
            return;
        };
        let changed = self.filter.select_genre(&genre);
        self.input_mode = InputMode::Normal;
        self.on_filter_change(changed);
    }

    pub(super) fn handle_click(&mut self, x: u16, y: u16, now: Instant) {
        let pos = Position::new(x, y);

        // Suggestions overlay the table, so they get the click first
        if let Some(area) = self.hit.suggestions
            && area.contains(pos)
            && !self.visible_suggestions().is_empty()
        {
            // Rows between the top and bottom borders
            if y > area.y && y < area.bottom().saturating_sub(1) {
                let row = (y - area.y - 1) as usize;
                self.pick_suggestion(self.hit.suggestion_offset + row);
            }
            return;
        }

        if let Some(area) = self.hit.search
            && area.contains(pos)
        {
            self.update(Action::StartSearch);
            return;
        }

        if self.input_mode == InputMode::Search {
            self.leave_search(now);
        }

        let Some(table_area) = self.hit.table else {
            return;
        };
        if !table_area.contains(pos) {
            return;
        }
        let column = self.hit.columns.iter().position(|c| x >= c.x && x < c.x + c.width);

        // Border (1) + header row (1)
        let header_y = table_area.y + 1;
        if y == header_y {
            if let Some(key) = column.and_then(|c| COLUMN_KEYS.get(c).copied().flatten()) {
                self.update(Action::SortBy(key));
            }
            return;
        }
        if y > header_y {
            let row = self.hit.table_offset + (y - header_y - 1) as usize;
            if row < self.table.len() {
                self.table.cursor = row;
                if column == Some(FAVORITE_COLUMN) {
                    self.toggle_selected_favorite();
                }
            }
        }
    }
}
