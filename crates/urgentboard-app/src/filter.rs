// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::macros::time;
use time::{Date, PrimitiveDateTime, Time};

use crate::{FieldCatalog, FieldId};

pub const DATE_FILTER_FIELD: FieldId = FieldId::DueDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchField {
    pub path: FieldId,
    pub selected: bool,
}

/// Every searchable catalog field, selected.
pub fn initial_search_fields(catalog: &FieldCatalog) -> Vec<SearchField> {
    catalog
        .searchable()
        .map(|entry| SearchField {
            path: entry.id,
            selected: true,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFilter {
    pub path: FieldId,
    pub contains: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualsFilter {
    pub path: FieldId,
    pub equals: String,
}

/// Inclusive bounds; `from` starts at 00:00:00 and `to` ends at 23:59:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub path: FieldId,
    pub from: Option<PrimitiveDateTime>,
    pub to: Option<PrimitiveDateTime>,
}

impl DateRange {
    pub fn contains(&self, date: Date) -> bool {
        let start = date.with_time(Time::MIDNIGHT);
        self.from.is_none_or(|from| start >= from) && self.to.is_none_or(|to| start <= to)
    }
}

/// Text filters OR-combined, AND the date range, AND the preset OR-group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    pub text_filters: Vec<TextFilter>,
    pub date_range: Option<DateRange>,
    pub presets: Vec<EqualsFilter>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.text_filters.is_empty() && self.date_range.is_none() && self.presets.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterWarning {
    NoSearchFieldsSelected,
}

impl FilterWarning {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoSearchFieldsSelected => {
                "Nothing will be found because no search fields have been selected"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub filter: FilterSpec,
    pub warning: Option<FilterWarning>,
}

pub fn compose(
    search_fields: &[SearchField],
    term: Option<&str>,
    date_from: Option<Date>,
    date_to: Option<Date>,
) -> Composition {
    let term = term.map(str::trim).unwrap_or_default();
    let mut warning = None;
    let mut text_filters = Vec::new();

    if !term.is_empty() {
        text_filters = search_fields
            .iter()
            .filter(|field| field.selected)
            .map(|field| TextFilter {
                path: field.path,
                contains: term.to_owned(),
            })
            .collect();
        if text_filters.is_empty() {
            warning = Some(FilterWarning::NoSearchFieldsSelected);
        }
    }

    Composition {
        filter: FilterSpec {
            text_filters,
            date_range: date_range(date_from, date_to),
            presets: Vec::new(),
        },
        warning,
    }
}

fn date_range(date_from: Option<Date>, date_to: Option<Date>) -> Option<DateRange> {
    let (from, to) = match (date_from, date_to) {
        (None, None) => return None,
        (Some(from), None) => (Some(from), Some(from)),
        (Some(from), Some(to)) if to < from => (Some(to), Some(from)),
        (from, to) => (from, to),
    };
    Some(DateRange {
        path: DATE_FILTER_FIELD,
        from: from.map(|day| day.with_time(Time::MIDNIGHT)),
        to: to.map(end_of_day),
    })
}

fn end_of_day(day: Date) -> PrimitiveDateTime {
    day.with_time(time!(23:59:59))
}

/// Host-supplied exact matches on material and description, OR-combined.
pub fn compose_presets(materials: &[String], descriptions: &[String]) -> Vec<EqualsFilter> {
    let materials = materials.iter().map(|value| EqualsFilter {
        path: FieldId::Material,
        equals: value.clone(),
    });
    let descriptions = descriptions.iter().map(|value| EqualsFilter {
        path: FieldId::Description,
        equals: value.clone(),
    });
    materials.chain(descriptions).collect()
}
