// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FilterState, TenderId, TenderStatus, format_filter_date, parse_filter_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Search,
    Date,
}

/// Everything that leaves the dashboard for the admin portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalAction {
    Login,
    MyBids,
    Tenders,
    Users,
    Settings,
    OpenTender(TenderId),
}

impl PortalAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::MyBids => "my bids",
            Self::Tenders => "tenders",
            Self::Users => "users",
            Self::Settings => "settings",
            Self::OpenTender(_) => "tender",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub filters: FilterState,
    pub date_input: String,
    pub sidebar_open: bool,
    pub help_visible: bool,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            filters: FilterState::default(),
            date_input: String::new(),
            sidebar_open: true,
            help_visible: false,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    EnterSearch,
    EnterDate,
    ExitToNav,
    SearchInput(char),
    SearchBackspace,
    DateInput(char),
    DateBackspace,
    ApplyDate,
    NextStatus,
    PrevStatus,
    ClearFilters,
    ToggleSidebar,
    ToggleHelp,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    FiltersChanged,
    SidebarToggled(bool),
    HelpToggled(bool),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::EnterSearch => {
                self.mode = AppMode::Search;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::EnterDate => {
                self.mode = AppMode::Date;
                self.date_input = self.filters.date.map(format_filter_date).unwrap_or_default();
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                self.date_input.clear();
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SearchInput(ch) => {
                self.filters.search_query.push(ch);
                vec![AppEvent::FiltersChanged]
            }
            AppCommand::SearchBackspace => {
                if self.filters.search_query.pop().is_some() {
                    vec![AppEvent::FiltersChanged]
                } else {
                    Vec::new()
                }
            }
            AppCommand::DateInput(ch) => {
                if ch.is_ascii_digit() || ch == '-' {
                    self.date_input.push(ch);
                }
                Vec::new()
            }
            AppCommand::DateBackspace => {
                self.date_input.pop();
                Vec::new()
            }
            AppCommand::ApplyDate => self.apply_date(),
            AppCommand::NextStatus => self.rotate_status(1),
            AppCommand::PrevStatus => self.rotate_status(-1),
            AppCommand::ClearFilters => {
                self.filters = FilterState::default();
                vec![AppEvent::FiltersChanged, self.set_status("filters cleared")]
            }
            AppCommand::ToggleSidebar => {
                self.sidebar_open = !self.sidebar_open;
                vec![AppEvent::SidebarToggled(self.sidebar_open)]
            }
            AppCommand::ToggleHelp => {
                self.help_visible = !self.help_visible;
                vec![AppEvent::HelpToggled(self.help_visible)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn apply_date(&mut self) -> Vec<AppEvent> {
        let raw = self.date_input.trim();
        let next = if raw.is_empty() {
            None
        } else {
            match parse_filter_date(raw) {
                Some(date) => Some(date),
                None => {
                    let message = format!("invalid date {raw:?}; use YYYY-MM-DD");
                    return vec![self.set_status(&message)];
                }
            }
        };

        self.mode = AppMode::Nav;
        self.date_input.clear();
        self.filters.date = next;
        vec![AppEvent::ModeChanged(self.mode), AppEvent::FiltersChanged]
    }

    fn rotate_status(&mut self, delta: isize) -> Vec<AppEvent> {
        // Slot 0 is "any status"; 1..=5 map onto the known codes.
        let slots = TenderStatus::KNOWN.len() as isize + 1;
        let current = self
            .filters
            .status
            .as_ref()
            .and_then(|status| TenderStatus::KNOWN.iter().position(|known| known == status))
            .map_or(0, |index| index as isize + 1);
        let next = (current + delta).rem_euclid(slots) as usize;
        self.filters.status = next
            .checked_sub(1)
            .map(|index| TenderStatus::KNOWN[index].clone());
        vec![AppEvent::FiltersChanged]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
