use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Margin, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Row,
    Table, TableState,
};
use readlist_core::SortKey;
use readlist_core::filter::highlight_match;

use crate::app::{App, InputMode};
use crate::theme::Theme;
use crate::view::{spinner_char, truncate};

/// Table columns in display order, with the sort key each header activates.
pub const COLUMN_KEYS: [Option<SortKey>; 5] = [
    Some(SortKey::Title),
    Some(SortKey::Author),
    Some(SortKey::Year),
    None,
    Some(SortKey::Favorite),
];

const COLUMN_TITLES: [&str; 5] = ["Title", "Author", "Year", "Genre", "Currently Reading"];

/// Most suggestions shown at once.
const MAX_SUGGESTIONS: usize = 8;

const COLUMN_SPACING: u16 = 1;

fn column_widths() -> [Constraint; 5] {
    [
        Constraint::Min(20),
        Constraint::Length(22),
        Constraint::Length(8),
        Constraint::Min(16),
        Constraint::Length(19),
    ]
}

/// Column rects inside the bordered table `area`, laid out as the `Table`
/// widget lays them out (no selection gutter, same flex and spacing).
pub fn column_rects(area: Rect) -> Vec<Rect> {
    Layout::horizontal(column_widths())
        .flex(Flex::Start)
        .spacing(COLUMN_SPACING)
        .split(area.inner(Margin::new(1, 1)))
        .to_vec()
}

/// Render the book list screen: header, search box, table, footer, and the
/// suggestion overlay on top.
pub fn render_in(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(1), // header
        Constraint::Length(3), // search box
        Constraint::Min(5),    // table
        Constraint::Length(1), // footer
    ])
    .split(area);

    render_header(f, chunks[0], app);
    render_search_box(f, chunks[1], app);
    render_table(f, chunks[2], app);
    render_footer(f, chunks[3], app);
    app.hit.search = Some(chunks[1]);

    app.hit.suggestions = None;
    if !app.visible_suggestions().is_empty() {
        render_suggestions(f, chunks[1], area, app);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let mut spans = vec![
        Span::styled(" readlist ", theme.header_style()),
        Span::styled(
            format!(" Genre: {}", app.shown_genre),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
    ];

    // Filter picked but its fetch has not landed yet
    if app.filter.genre_filter() != &app.shown_genre {
        spans.push(Span::styled(
            format!(" \u{2192} {}", app.filter.genre_filter()),
            Style::default().fg(theme.dim),
        ));
    }

    if app.load.is_loading() {
        spans.push(Span::styled(
            format!(" {} Loading\u{2026}", spinner_char(app.tick)),
            Style::default()
                .fg(theme.spinner)
                .add_modifier(Modifier::BOLD),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_search_box(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let focused = app.input_mode == InputMode::Search;
    let input = app.filter.search_input();

    let line = if input.is_empty() && !focused {
        Line::from(Span::styled(
            " Search genres\u{2026}",
            Style::default().fg(theme.dim),
        ))
    } else {
        let cursor = if focused { "\u{2588}" } else { "" };
        Line::from(vec![
            Span::styled(
                " /",
                Style::default()
                    .fg(theme.active)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(input.to_string(), Style::default().fg(theme.text)),
            Span::styled(cursor, Style::default().fg(theme.active)),
        ])
    };

    let border = if focused {
        Style::default().fg(theme.active)
    } else {
        theme.border_style()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(" Genre (/) ");
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn header_label(app: &App, idx: usize) -> String {
    let title = COLUMN_TITLES[idx];
    match COLUMN_KEYS[idx].and_then(|key| app.sort.indicator(key)) {
        Some(arrow) => format!("{title} {arrow}"),
        None => title.to_string(),
    }
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    app.hit.table = Some(area);
    app.hit.columns = column_rects(area);

    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(format!(" Books ({}) ", app.table.len()));

    if app.table.is_empty() {
        let message = if app.load.is_loading() {
            format!(" {} Loading books\u{2026}", spinner_char(app.tick))
        } else if let Some(error) = app.load.last_error() {
            format!(" Failed to load books: {error}")
        } else {
            format!(" No books found for genre \"{}\"", app.shown_genre)
        };
        f.render_widget(
            Paragraph::new(Span::styled(message, Style::default().fg(theme.dim))).block(block),
            area,
        );
        app.hit.table_offset = 0;
        return;
    }

    let header = Row::new((0..COLUMN_TITLES.len()).map(|i| {
        Cell::from(header_label(app, i))
            .style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD))
    }))
    .height(1);

    let title_width = app.hit.columns.first().map_or(20, |c| c.width as usize);
    let genre_width = app.hit.columns.get(3).map_or(16, |c| c.width as usize);

    let rows: Vec<Row> = app
        .table
        .rows()
        .map(|book| {
            let reading = app.favorites.is_book_favorite(book);
            let reading_cell = if reading {
                Cell::from("\u{2605} reading").style(Style::default().fg(theme.favorite))
            } else {
                Cell::from("\u{2606}").style(Style::default().fg(theme.dim))
            };
            Row::new(vec![
                Cell::from(truncate(&book.title, title_width)),
                Cell::from(book.author.clone()),
                Cell::from(book.year.to_string()),
                Cell::from(truncate(&book.genre_label(), genre_width))
                    .style(Style::default().fg(theme.dim)),
                reading_cell,
            ])
        })
        .collect();

    let table = Table::new(rows, column_widths())
        .header(header)
        .flex(Flex::Start)
        .column_spacing(COLUMN_SPACING)
        .highlight_spacing(HighlightSpacing::Never)
        .block(block)
        .row_highlight_style(theme.highlight_style());

    let mut state = TableState::default().with_offset(app.hit.table_offset);
    state.select(Some(app.table.cursor));
    f.render_stateful_widget(table, area, &mut state);
    app.hit.table_offset = state.offset();
}

fn render_suggestions(f: &mut Frame, search_area: Rect, screen: Rect, app: &mut App) {
    let theme = &app.theme;
    let suggestions = app.visible_suggestions();
    let input = app.filter.search_input();

    let top = search_area.y + search_area.height;
    let rows = suggestions.len().min(MAX_SUGGESTIONS) as u16;
    let height = (rows + 2).min(screen.height.saturating_sub(top));
    if height < 3 {
        return;
    }
    let popup = Rect {
        x: search_area.x + 1,
        y: top.saturating_sub(1),
        width: search_area.width.saturating_sub(2).min(40),
        height,
    };

    let items: Vec<ListItem> = suggestions
        .iter()
        .map(|genre| ListItem::new(highlighted(genre, input, theme)))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.active))
                .title(format!(" {} genres ", suggestions.len())),
        )
        .highlight_style(theme.highlight_style());

    let mut state = ListState::default();
    state.select(app.suggestion_cursor);

    f.render_widget(Clear, popup);
    f.render_stateful_widget(list, popup, &mut state);
    app.hit.suggestions = Some(popup);
    app.hit.suggestion_offset = state.offset();
}

/// Suggestion text with the typed fragment emphasised.
fn highlighted<'a>(genre: &'a str, input: &str, theme: &Theme) -> Line<'a> {
    let text = Style::default().fg(theme.text);
    match highlight_match(genre, input) {
        Some(range) => Line::from(vec![
            Span::styled(&genre[..range.start], text),
            Span::styled(&genre[range.clone()], theme.match_style()),
            Span::styled(&genre[range.end..], text),
        ]),
        None => Line::from(Span::styled(genre, text)),
    }
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let mut spans: Vec<Span> = Vec::new();

    if let Some(error) = app.load.last_error() {
        spans.push(Span::styled(
            format!(" Failed to load books: {error} (r to retry) "),
            Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(error) = app.favorites.last_persist_error() {
        spans.push(Span::styled(
            format!(" Favorites not saved: {error} "),
            Style::default().fg(theme.error),
        ));
    } else if let Some(error) = &app.genres_error {
        spans.push(Span::styled(
            format!(" Genre list unavailable: {error} "),
            Style::default().fg(theme.error),
        ));
    } else {
        spans.push(Span::styled(
            format!(
                " {} books \u{00B7} {} reading ",
                app.table.len(),
                app.favorites.len()
            ),
            Style::default().fg(theme.text),
        ));
    }

    let hints = match app.input_mode {
        InputMode::Search => {
            " Enter:apply  \u{2191}\u{2193}:suggestions  Esc:close  Ctrl+U:erase  Ctrl+C:quit"
        }
        InputMode::Normal => {
            " /:search  [ ]:genre  x:clear  t/a/y/f:sort  Space:reading  r:reload  ?:help  q:quit"
        }
    };
    spans.push(Span::styled(hints, theme.footer_style()));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
