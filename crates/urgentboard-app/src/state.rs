// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;

use crate::{
    Composition, EqualsFilter, FieldAnnotations, FieldCatalog, FieldId, FilterWarning, ItemQuery,
    Resolution, SearchField, SortCommand, SortDirection, SortKey, SortRow, SortState, compose,
    compose_presets, initial_search_fields,
};

/// Host-granted permissions for the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardSettings {
    pub allow_create: bool,
    pub allow_update: bool,
    pub allow_search: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            allow_create: true,
            allow_update: true,
            allow_search: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    Sort(FieldId, SortCommand),
    MoveSortUp(FieldId),
    MoveSortDown(FieldId),
    /// Rebuild the sort from decoded `(field, direction)` pairs in one step.
    ReplaceSort(Vec<(FieldId, SortDirection)>),
    SelectSearchField(FieldId, bool),
    Search(String),
    SetDateRange {
        from: Option<Date>,
        to: Option<Date>,
    },
    SetPresets {
        materials: Vec<String>,
        descriptions: Vec<String>,
    },
    SetSelection(usize),
    SetAllowCreate(bool),
    SetAllowUpdate(bool),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// The active sort keys changed; the new order should be stored.
    SortChanged(Vec<SortKey>),
    FilterChanged,
    FilterWarning(FilterWarning),
    SelectionChanged(usize),
    SettingsChanged(BoardSettings),
    StatusUpdated(String),
    StatusCleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSession {
    catalog: FieldCatalog,
    sort: SortState,
    search_fields: Vec<SearchField>,
    search_term: String,
    date_from: Option<Date>,
    date_to: Option<Date>,
    presets: Vec<EqualsFilter>,
    annotations: FieldAnnotations,
    pub settings: BoardSettings,
    pub selected_count: usize,
    pub status_line: Option<String>,
}

impl BoardSession {
    pub fn new(catalog: FieldCatalog, sort: SortState) -> Self {
        let search_fields = initial_search_fields(&catalog);
        Self {
            catalog,
            sort,
            search_fields,
            search_term: String::new(),
            date_from: None,
            date_to: None,
            presets: Vec::new(),
            annotations: FieldAnnotations::default(),
            settings: BoardSettings::default(),
            selected_count: 0,
            status_line: None,
        }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn sort_rows(&self) -> Vec<SortRow> {
        self.sort.rows()
    }

    pub fn search_fields(&self) -> &[SearchField] {
        &self.search_fields
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn annotations(&self) -> &FieldAnnotations {
        &self.annotations
    }

    /// Free-text and date filters plus any host presets.
    pub fn composition(&self) -> Composition {
        let term = self.settings.allow_search.then_some(self.search_term.as_str());
        let mut composition = compose(&self.search_fields, term, self.date_from, self.date_to);
        composition.filter.presets = self.presets.clone();
        composition
    }

    pub fn query(&self) -> ItemQuery {
        ItemQuery {
            filter: self.composition().filter,
            sort: self.sort.sort_keys(),
        }
    }

    pub fn create_button_visible(&self) -> bool {
        self.settings.allow_create && self.selected_count == 0
    }

    pub fn filter_sort_visible(&self) -> bool {
        self.settings.allow_search && self.selected_count == 0
    }

    pub fn dispatch(&mut self, command: BoardCommand) -> Vec<BoardEvent> {
        match command {
            BoardCommand::Sort(field, sort_command) => {
                let changed = self.sort.apply(field, sort_command);
                self.sort_events(changed)
            }
            BoardCommand::MoveSortUp(field) => {
                let changed = self.sort.move_active(field, -1);
                self.sort_events(changed)
            }
            BoardCommand::MoveSortDown(field) => {
                let changed = self.sort.move_active(field, 1);
                self.sort_events(changed)
            }
            BoardCommand::ReplaceSort(defaults) => {
                let next = SortState::initialize(&self.catalog, Some(&defaults));
                let changed = next.sort_keys() != self.sort.sort_keys();
                self.sort = next;
                self.sort_events(changed)
            }
            BoardCommand::SelectSearchField(field, selected) => {
                let Some(entry) = self.search_fields.iter_mut().find(|f| f.path == field) else {
                    return Vec::new();
                };
                if entry.selected == selected {
                    return Vec::new();
                }
                entry.selected = selected;
                self.filter_events()
            }
            BoardCommand::Search(term) => {
                if !self.settings.allow_search {
                    return vec![self.set_status("search is disabled while preset filters apply")];
                }
                self.search_term = term.trim().to_owned();
                self.filter_events()
            }
            BoardCommand::SetDateRange { from, to } => {
                self.date_from = from;
                self.date_to = to;
                self.filter_events()
            }
            BoardCommand::SetPresets {
                materials,
                descriptions,
            } => {
                self.presets = compose_presets(&materials, &descriptions);
                self.settings.allow_search = false;
                self.search_term.clear();
                let mut events = vec![BoardEvent::SettingsChanged(self.settings)];
                events.extend(self.filter_events());
                events
            }
            BoardCommand::SetSelection(count) => {
                self.selected_count = count;
                vec![BoardEvent::SelectionChanged(count)]
            }
            BoardCommand::SetAllowCreate(allow) => {
                self.settings.allow_create = allow;
                vec![BoardEvent::SettingsChanged(self.settings)]
            }
            BoardCommand::SetAllowUpdate(allow) => {
                self.settings.allow_update = allow;
                vec![BoardEvent::SettingsChanged(self.settings)]
            }
            BoardCommand::ClearStatus => {
                self.status_line = None;
                vec![BoardEvent::StatusCleared]
            }
        }
    }

    /// Fold a finished mutation into annotations and the status line.
    pub fn apply_resolution(&mut self, resolution: &Resolution) -> Vec<BoardEvent> {
        self.annotations = resolution.annotate(&self.annotations);
        if matches!(resolution, Resolution::Deleted(_) | Resolution::BatchDeleted { .. }) {
            self.selected_count = 0;
        }
        vec![self.set_status(&resolution.notice())]
    }

    fn sort_events(&self, changed: bool) -> Vec<BoardEvent> {
        if changed {
            vec![BoardEvent::SortChanged(self.sort.sort_keys())]
        } else {
            Vec::new()
        }
    }

    fn filter_events(&mut self) -> Vec<BoardEvent> {
        let mut events = vec![BoardEvent::FilterChanged];
        if let Some(warning) = self.composition().warning {
            events.push(BoardEvent::FilterWarning(warning));
            events.push(self.set_status(warning.message()));
        }
        events
    }

    fn set_status(&mut self, message: &str) -> BoardEvent {
        self.status_line = Some(message.to_owned());
        BoardEvent::StatusUpdated(message.to_owned())
    }
}
