// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use tracing::{debug, warn};

use crate::{FieldCatalog, FieldId, SettingKey, SortDirection, SortField, SortState};

/// Key-value preference storage owned by the host.
pub trait SettingsStore {
    fn read_setting(&self, key: SettingKey) -> Result<Option<String>>;
    fn write_setting(&self, key: SettingKey, value: &str) -> Result<()>;
}

/// `MATERIAL(A);DESCRIPTION(D);` for the active fields, in order.
pub fn encode(fields: &[SortField]) -> String {
    fields
        .iter()
        .filter_map(|field| {
            field.direction.map(|direction| {
                format!(
                    "{}({});",
                    field.path.as_str().to_ascii_uppercase(),
                    direction.code()
                )
            })
        })
        .collect()
}

pub fn decode(raw: &str) -> Vec<(FieldId, SortDirection)> {
    raw.split(';')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let Some((name, rest)) = token.split_once('(') else {
                debug!(token, "dropping sort token without direction");
                return None;
            };
            let Some(field) = FieldId::parse(name) else {
                debug!(token, "dropping sort token for unknown field");
                return None;
            };
            let direction = if rest.starts_with('A') {
                SortDirection::Asc
            } else {
                SortDirection::Desc
            };
            Some((field, direction))
        })
        .collect()
}

/// Startup: stored preference if any, otherwise the catalog ordering.
pub fn load(store: &dyn SettingsStore, catalog: &FieldCatalog) -> SortState {
    match store.read_setting(SettingKey::Sort) {
        Ok(Some(raw)) => SortState::initialize(catalog, Some(&decode(&raw))),
        Ok(None) => SortState::initialize(catalog, None),
        Err(error) => {
            warn!(error = %error, "reading stored sort failed; using defaults");
            SortState::initialize(catalog, None)
        }
    }
}

/// Fire-and-forget: a failed write is logged and otherwise ignored.
pub fn save(store: &dyn SettingsStore, fields: &[SortField]) {
    let encoded = encode(fields);
    if let Err(error) = store.write_setting(SettingKey::Sort, &encoded) {
        warn!(error = %error, value = %encoded, "storing sort preference failed");
    }
}
