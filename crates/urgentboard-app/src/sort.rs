// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{FieldCatalog, FieldId, SortDirection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortField {
    pub path: FieldId,
    pub label: &'static str,
    /// Index in the full sequence; rewritten after every structural change.
    pub position: usize,
    /// `None` exactly when the field is inactive.
    pub direction: Option<SortDirection>,
}

impl SortField {
    pub fn is_active(&self) -> bool {
        self.direction.is_some()
    }
}

/// A sort field annotated with which reorder buttons apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRow {
    pub field: SortField,
    pub can_move_up: bool,
    pub can_move_down: bool,
}

/// What the data source's sort facility receives, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub path: FieldId,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortCommand {
    Ascending,
    Descending,
    Remove,
}

/// Sort fields as one sequence: the active fields form a prefix, the
/// inactive ones follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    fields: Vec<SortField>,
}

impl SortState {
    pub fn initialize(
        catalog: &FieldCatalog,
        defaults: Option<&[(FieldId, SortDirection)]>,
    ) -> Self {
        let mut fields = Vec::new();

        for &(path, direction) in defaults.unwrap_or_default() {
            if !catalog.is_sortable(path) || fields.iter().any(|f: &SortField| f.path == path) {
                continue;
            }
            fields.push(SortField {
                path,
                label: catalog.label(path),
                position: 0,
                direction: Some(direction),
            });
        }

        let mut rest: Vec<_> = catalog
            .sortable()
            .enumerate()
            .filter(|(_, entry)| !fields.iter().any(|f| f.path == entry.id))
            .collect();
        rest.sort_by_key(|(index, entry)| {
            (entry.initial_sort_position.unwrap_or(usize::MAX), *index)
        });
        fields.extend(rest.into_iter().map(|(_, entry)| SortField {
            path: entry.id,
            label: entry.label,
            position: 0,
            direction: None,
        }));

        let mut state = Self { fields };
        state.renumber();
        state
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    pub fn get(&self, path: FieldId) -> Option<&SortField> {
        self.fields.iter().find(|field| field.path == path)
    }

    pub fn active_count(&self) -> usize {
        active_count(&self.fields)
    }

    pub fn rows(&self) -> Vec<SortRow> {
        recompute_movability(&self.fields)
    }

    pub fn sort_keys(&self) -> Vec<SortKey> {
        self.fields
            .iter()
            .filter_map(|field| {
                field.direction.map(|direction| SortKey {
                    path: field.path,
                    direction,
                })
            })
            .collect()
    }

    /// Appends an inactive field to the active prefix by swapping it with the
    /// first inactive field. Returns whether anything changed.
    pub fn activate(&mut self, path: FieldId, direction: SortDirection) -> bool {
        let Some(index) = self.index_of(path) else {
            return false;
        };
        if self.fields[index].is_active() {
            return false;
        }
        let first_inactive = self.active_count();
        self.fields.swap(index, first_inactive);
        self.fields[first_inactive].direction = Some(direction);
        self.renumber();
        true
    }

    pub fn set_direction(&mut self, path: FieldId, direction: SortDirection) -> bool {
        let Some(index) = self.index_of(path) else {
            return false;
        };
        let field = &mut self.fields[index];
        if !field.is_active() || field.direction == Some(direction) {
            return false;
        }
        field.direction = Some(direction);
        true
    }

    /// Clears the direction and sinks the field one swap at a time until it
    /// is the first inactive field.
    pub fn deactivate(&mut self, path: FieldId) -> bool {
        let Some(index) = self.index_of(path) else {
            return false;
        };
        if !self.fields[index].is_active() {
            return false;
        }
        let last_active = self.active_count() - 1;
        self.fields[index].direction = None;
        for x in index..last_active {
            self.fields.swap(x, x + 1);
        }
        self.renumber();
        true
    }

    /// Swaps an active field with its neighbour. No-op when the target is out
    /// of range or inactive, so the active prefix stays contiguous.
    pub fn move_active(&mut self, path: FieldId, delta: isize) -> bool {
        let Some(index) = self.index_of(path) else {
            return false;
        };
        if !self.fields[index].is_active() {
            return false;
        }
        let Some(target) = index.checked_add_signed(delta) else {
            return false;
        };
        if target >= self.fields.len() || !self.fields[target].is_active() {
            return false;
        }
        self.fields.swap(index, target);
        self.renumber();
        true
    }

    /// Maps a direction button press onto activate / set direction / deactivate.
    pub fn apply(&mut self, path: FieldId, command: SortCommand) -> bool {
        let direction = match command {
            SortCommand::Ascending => SortDirection::Asc,
            SortCommand::Descending => SortDirection::Desc,
            SortCommand::Remove => return self.deactivate(path),
        };
        match self.get(path) {
            Some(field) if field.is_active() => self.set_direction(path, direction),
            Some(_) => self.activate(path, direction),
            None => false,
        }
    }

    fn index_of(&self, path: FieldId) -> Option<usize> {
        self.fields.iter().position(|field| field.path == path)
    }

    fn renumber(&mut self) {
        for (index, field) in self.fields.iter_mut().enumerate() {
            field.position = index;
        }
    }
}

pub fn active_count(fields: &[SortField]) -> usize {
    fields.iter().filter(|field| field.is_active()).count()
}

pub fn recompute_movability(fields: &[SortField]) -> Vec<SortRow> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let active = field.is_active();
            SortRow {
                field: field.clone(),
                can_move_up: active && index > 0,
                can_move_down: active && fields.get(index + 1).is_some_and(SortField::is_active),
            }
        })
        .collect()
}
