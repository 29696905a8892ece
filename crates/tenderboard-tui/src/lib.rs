// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tenderboard_app::{
    AppCommand, AppEvent, AppMode, AppState, FilteredView, PortalAction, StatusTone, Tender,
    format_date_time, format_filter_date, status_meta,
};
use time::UtcOffset;

const SIDEBAR_WIDTH: u16 = 22;
const SKELETON_BAR: &str = "░░░░░░░░░░░░░░░░░░░░░░░░░░░░";
const SKELETON_TITLE: &str = "░░░░░░░░░░░░░░";
const ERROR_FALLBACK: &str = "could not load the tender list; try again";
const CARD_SEPARATOR: &str = "────";

/// What the body should show for the current load state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Failed(String),
    Ready,
}

/// Everything the dashboard needs from the outside world.
pub trait AppRuntime {
    /// Starts the initial load.
    fn activate(&mut self);
    /// Cancels outstanding work; called once when the UI exits.
    fn deactivate(&mut self);
    /// Applies finished background work. Returns whether anything changed.
    fn pump(&mut self) -> bool;
    fn load_state(&self) -> LoadState;
    fn tenders(&self) -> &[Tender];
    /// Bumped whenever `tenders` is replaced.
    fn generation(&self) -> u64;
    fn retry(&mut self);
    /// Hands the portal URL for `action` to the system opener.
    fn open_portal(&mut self, action: PortalAction) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub utc_offset: UtcOffset,
    pub skeleton_cards: usize,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            utc_offset: UtcOffset::UTC,
            skeleton_cards: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyView<'a> {
    Skeleton,
    Error(&'a str),
    Empty,
    Cards,
}

#[derive(Debug, Clone, Default)]
struct ViewData {
    options: UiOptions,
    filtered: FilteredView,
    cursor: usize,
    status_token: u64,
}

impl ViewData {
    fn new(options: UiOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();

    runtime.activate();

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);
        runtime.pump();
        sync_view(state, runtime, &mut view_data);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &*runtime, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    runtime.deactivate();
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

/// Re-filters when the list or the filters changed and keeps the cursor in range.
fn sync_view<R: AppRuntime>(state: &AppState, runtime: &R, view_data: &mut ViewData) {
    view_data.filtered.refresh(
        runtime.generation(),
        runtime.tenders(),
        &state.filters,
        view_data.options.utc_offset,
    );
    view_data.cursor = view_data
        .cursor
        .min(view_data.filtered.len().saturating_sub(1));
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn dispatch(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    for event in state.dispatch(command) {
        match event {
            AppEvent::FiltersChanged => view_data.cursor = 0,
            AppEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(internal_tx, view_data.status_token);
            }
            AppEvent::ModeChanged(_)
            | AppEvent::SidebarToggled(_)
            | AppEvent::HelpToggled(_)
            | AppEvent::StatusCleared => {}
        }
    }
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    dispatch(
        state,
        view_data,
        internal_tx,
        AppCommand::SetStatus(message.into()),
    );
}

/// Returns `true` when the UI should exit.
fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if state.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            dispatch(state, view_data, internal_tx, AppCommand::ToggleHelp);
        }
        return false;
    }

    match state.mode {
        AppMode::Search => {
            handle_search_key(state, view_data, internal_tx, key);
            false
        }
        AppMode::Date => {
            handle_date_key(state, view_data, internal_tx, key);
            false
        }
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
}

fn handle_search_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let command = match key.code {
        KeyCode::Esc | KeyCode::Enter => AppCommand::ExitToNav,
        KeyCode::Backspace => AppCommand::SearchBackspace,
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            AppCommand::SearchInput(ch)
        }
        _ => return,
    };
    dispatch(state, view_data, internal_tx, command);
}

fn handle_date_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let command = match key.code {
        KeyCode::Esc => AppCommand::ExitToNav,
        KeyCode::Enter => AppCommand::ApplyDate,
        KeyCode::Backspace => AppCommand::DateBackspace,
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            AppCommand::DateInput(ch)
        }
        _ => return,
    };
    dispatch(state, view_data, internal_tx, command);
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let command = match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => return true,
        (KeyCode::Char('/'), _) => AppCommand::EnterSearch,
        (KeyCode::Char('d'), _) => AppCommand::EnterDate,
        (KeyCode::Char('s'), KeyModifiers::NONE) => AppCommand::NextStatus,
        (KeyCode::Char('S'), _) => AppCommand::PrevStatus,
        (KeyCode::Char('x'), _) => AppCommand::ClearFilters,
        (KeyCode::Char('?'), _) => AppCommand::ToggleHelp,
        (KeyCode::Tab, _) => AppCommand::ToggleSidebar,
        (KeyCode::Char('j') | KeyCode::Down, _) => {
            move_cursor(view_data, 1);
            return false;
        }
        (KeyCode::Char('k') | KeyCode::Up, _) => {
            move_cursor(view_data, -1);
            return false;
        }
        (KeyCode::Char('r'), _) => {
            if matches!(runtime.load_state(), LoadState::Failed(_)) {
                runtime.retry();
                emit_status(state, view_data, internal_tx, "reloading tenders");
            }
            return false;
        }
        (KeyCode::Enter, _) => {
            let Some(tender) = selected_tender(runtime, view_data) else {
                return false;
            };
            let action = PortalAction::OpenTender(tender.id);
            return open_portal(state, runtime, view_data, internal_tx, action);
        }
        (KeyCode::Char(ch), _) => {
            let Some(action) = portal_action_for_key(ch) else {
                return false;
            };
            return open_portal(state, runtime, view_data, internal_tx, action);
        }
        _ => return false,
    };
    dispatch(state, view_data, internal_tx, command);
    false
}

fn portal_action_for_key(ch: char) -> Option<PortalAction> {
    match ch {
        'l' => Some(PortalAction::Login),
        'm' => Some(PortalAction::MyBids),
        'u' => Some(PortalAction::Users),
        'g' => Some(PortalAction::Settings),
        _ => None,
    }
}

/// Leaves the dashboard once the opener accepted the URL.
fn open_portal<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: PortalAction,
) -> bool {
    match runtime.open_portal(action) {
        Ok(_) => true,
        Err(error) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("open {} failed: {error:#}", action.label()),
            );
            false
        }
    }
}

fn move_cursor(view_data: &mut ViewData, delta: isize) {
    let len = view_data.filtered.len();
    if len == 0 {
        view_data.cursor = 0;
        return;
    }
    let next = view_data.cursor.saturating_add_signed(delta);
    view_data.cursor = next.min(len - 1);
}

fn selected_tender<'a, R: AppRuntime>(runtime: &'a R, view_data: &ViewData) -> Option<&'a Tender> {
    let index = *view_data.filtered.indices().get(view_data.cursor)?;
    runtime.tenders().get(index)
}

fn body_view<'a>(load: &'a LoadState, view_data: &ViewData) -> BodyView<'a> {
    match load {
        LoadState::Loading => BodyView::Skeleton,
        LoadState::Failed(message) => BodyView::Error(message),
        LoadState::Ready if view_data.filtered.is_empty() => BodyView::Empty,
        LoadState::Ready => BodyView::Cards,
    }
}

fn render<R: AppRuntime>(
    frame: &mut ratatui::Frame<'_>,
    state: &AppState,
    runtime: &R,
    view_data: &ViewData,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_line())
        .block(Block::default().title("tenderboard").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let main = if state.sidebar_open {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
            .split(layout[1]);
        let sidebar = Paragraph::new(sidebar_lines())
            .block(Block::default().title("menu").borders(Borders::ALL));
        frame.render_widget(sidebar, columns[0]);
        columns[1]
    } else {
        layout[1]
    };

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(main);

    let filter_style = if state.mode == AppMode::Nav {
        Style::default()
    } else {
        Style::default().fg(Color::Cyan)
    };
    let filters = Paragraph::new(filter_bar_text(state)).block(
        Block::default()
            .title("filters")
            .borders(Borders::ALL)
            .border_style(filter_style),
    );
    frame.render_widget(filters, sections[0]);

    render_body(frame, sections[1], runtime, view_data);

    let status = Paragraph::new(status_text(state, &runtime.load_state()))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, layout[2]);

    if state.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_body<R: AppRuntime>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    runtime: &R,
    view_data: &ViewData,
) {
    let load = runtime.load_state();
    let title = match body_view(&load, view_data) {
        BodyView::Cards => format!(
            "tenders {}/{}",
            view_data.filtered.len(),
            runtime.tenders().len()
        ),
        _ => "tenders".to_owned(),
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let width = usize::from(block.inner(area).width);
    let height = usize::from(block.inner(area).height);

    let (lines, scroll) = match body_view(&load, view_data) {
        BodyView::Skeleton => (skeleton_lines(view_data.options.skeleton_cards), 0),
        BodyView::Error(message) => (error_lines(message), 0),
        BodyView::Empty => (empty_lines(), 0),
        BodyView::Cards => card_list_lines(runtime.tenders(), view_data, width, height),
    };

    let body = Paragraph::new(lines)
        .block(block)
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0));
    frame.render_widget(body, area);
}

fn header_line() -> Line<'static> {
    Line::from(vec![
        Span::styled(
            "RED PETROLEUM",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  tender dashboard   "),
        Span::styled("[l] login", Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled("[m] my bids", Style::default().fg(Color::Cyan)),
    ])
}

fn sidebar_lines() -> Vec<Line<'static>> {
    let active = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
    vec![
        Line::from(Span::styled("▸ tenders", active)),
        Line::from("  [m] my bids"),
        Line::from("  [u] users"),
        Line::from("  [g] settings"),
    ]
}

fn filter_bar_text(state: &AppState) -> String {
    let search_cursor = if state.mode == AppMode::Search {
        "▏"
    } else {
        ""
    };
    let status = state
        .filters
        .status
        .as_ref()
        .map_or_else(|| "any".to_owned(), |status| status_meta(status).label.into_owned());
    let date = if state.mode == AppMode::Date {
        format!("{}▏", state.date_input)
    } else {
        state
            .filters
            .date
            .map_or_else(|| "any".to_owned(), format_filter_date)
    };
    format!(
        "search: {}{search_cursor} | status: {status} | date: {date}",
        state.filters.search_query
    )
}

fn skeleton_lines(cards: usize) -> Vec<Line<'static>> {
    let style = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::from(Span::styled(
        "⟳ loading tenders…",
        Style::default().fg(Color::Gray),
    ))];
    for _ in 0..cards {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(SKELETON_TITLE, style)));
        lines.push(Line::from(Span::styled(SKELETON_BAR, style)));
        lines.push(Line::from(Span::styled(SKELETON_BAR, style)));
    }
    lines
}

fn error_lines(message: &str) -> Vec<Line<'static>> {
    let message = if message.trim().is_empty() {
        ERROR_FALLBACK
    } else {
        message
    };
    vec![
        Line::from(Span::styled(
            "⚠ failed to load tenders",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(message.to_owned()),
        Line::default(),
        Line::from(Span::styled(
            "press r to retry",
            Style::default().fg(Color::Red),
        )),
    ]
}

fn empty_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            "nothing found",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from("change the filters or try another query (x clears them)"),
    ]
}

/// Lines for every filtered card plus the scroll offset that keeps the
/// selected card in view.
fn card_list_lines(
    tenders: &[Tender],
    view_data: &ViewData,
    width: usize,
    height: usize,
) -> (Vec<Line<'static>>, usize) {
    let mut lines = Vec::new();
    let mut selected_span = (0, 0);
    for (position, tender) in view_data.filtered.tenders(tenders).enumerate() {
        if position > 0 {
            lines.push(Line::from(Span::styled(
                CARD_SEPARATOR,
                Style::default().fg(Color::DarkGray),
            )));
        }
        let start = lines.len();
        let selected = position == view_data.cursor;
        lines.extend(card_lines(
            tender,
            view_data.options.utc_offset,
            width,
            selected,
        ));
        if selected {
            selected_span = (start, lines.len());
        }
    }

    let (_, end) = selected_span;
    let scroll = end.saturating_sub(height);
    (lines, scroll)
}

fn card_lines(
    tender: &Tender,
    offset: UtcOffset,
    width: usize,
    selected: bool,
) -> Vec<Line<'static>> {
    let meta = status_meta(&tender.status);
    let marker = if selected { "▌ " } else { "  " };
    let marker_style = Style::default().fg(Color::Red);
    let mut name_style = Style::default().add_modifier(Modifier::BOLD);
    if selected {
        name_style = name_style.fg(Color::Red);
    }
    let body_width = width.saturating_sub(2);

    let mut lines = vec![Line::from(vec![
        Span::styled(marker, marker_style),
        Span::styled(truncate_label(&tender.name, body_width), name_style),
    ])];
    lines.push(Line::from(vec![
        Span::styled(marker, marker_style),
        Span::styled("● ", Style::default().fg(tone_color(meta.dot))),
        Span::styled(
            meta.label.into_owned(),
            Style::default()
                .fg(tone_color(meta.badge))
                .add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(Line::from(vec![
        Span::styled(marker, marker_style),
        Span::styled(
            truncate_label(&tender.description, body_width),
            Style::default().fg(Color::Gray),
        ),
    ]));
    if let Some(terms) = tender.terms_text() {
        lines.push(labelled_line(marker, "terms: ", terms, body_width));
    }
    if let Some(reason) = tender.close_reason_text() {
        lines.push(labelled_line(marker, "close reason: ", reason, body_width));
    }
    lines.push(Line::from(vec![
        Span::styled(marker, marker_style),
        Span::styled(
            format!("id {}", tender.id),
            Style::default().fg(Color::Blue),
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                "published {}",
                format_date_time(&tender.created_at, offset)
            ),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(
            format!("by {}", tender.created_by.display_name()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("ends {}", format_date_time(&tender.end_date, offset)),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    ]));
    lines
}

fn labelled_line(marker: &'static str, label: &'static str, value: &str, width: usize) -> Line<'static> {
    Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Red)),
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(truncate_label(value, width.saturating_sub(label.len()))),
    ])
}

fn tone_color(tone: StatusTone) -> Color {
    match tone {
        StatusTone::Green => Color::Green,
        StatusTone::Blue => Color::Blue,
        StatusTone::Yellow => Color::Yellow,
        StatusTone::Purple => Color::Magenta,
        StatusTone::Red => Color::Red,
        StatusTone::Neutral => Color::Gray,
        StatusTone::Muted => Color::DarkGray,
    }
}

fn truncate_label(value: &str, max_chars: usize) -> String {
    let count = value.chars().count();
    if count <= max_chars {
        return value.to_owned();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out = value.chars().take(max_chars - 1).collect::<String>();
    out.push('…');
    out
}

fn status_text(state: &AppState, load: &LoadState) -> String {
    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Search => "SEARCH",
        AppMode::Date => "DATE",
    };
    let hints = match state.mode {
        AppMode::Search => "type to search | enter/esc done".to_owned(),
        AppMode::Date => "YYYY-MM-DD | enter apply (empty clears) | esc cancel".to_owned(),
        AppMode::Nav => {
            let retry = if matches!(load, LoadState::Failed(_)) {
                " | r retry"
            } else {
                ""
            };
            format!("j/k move | enter open | / search | s/S status | d date | x clear{retry} | ? help | q quit")
        }
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help | tab sidebar\n\
nav: j/k or up/down move | enter open tender in portal | q quit\n\
filters: / search | s/S next/prev status | d date (YYYY-MM-DD) | x clear all\n\
portal: l login | m my bids | u users | g settings\n\
errors: r retry\n\
search/date: type to edit | backspace delete | enter apply | esc back"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
