// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::fmt;

use crate::{FieldCatalog, FieldId, ItemDraft, OrderType};

impl ItemDraft {
    pub fn blank() -> Self {
        Self {
            material: String::new(),
            description: String::new(),
            order_type: OrderType::None,
            object_key: String::new(),
            line: String::new(),
            quantity: None,
            unlimited_quantity: false,
            quantity_issued: 0,
            uom: "EA".to_owned(),
            due_date: None,
            deliver_to: String::new(),
            comments: String::new(),
            entered_by_name: String::new(),
            supplier_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueState {
    None,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAnnotation {
    pub state: ValueState,
    pub text: String,
}

impl FieldAnnotation {
    pub fn clear() -> Self {
        Self {
            state: ValueState::None,
            text: String::new(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            state: ValueState::Error,
            text: text.into(),
        }
    }
}

/// Per-field value states. Every update returns a new collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldAnnotations {
    fields: BTreeMap<FieldId, FieldAnnotation>,
}

impl FieldAnnotations {
    pub fn get(&self, field: FieldId) -> Option<&FieldAnnotation> {
        self.fields.get(&field)
    }

    pub fn with(&self, field: FieldId, annotation: FieldAnnotation) -> Self {
        let mut fields = self.fields.clone();
        if annotation.state == ValueState::None {
            fields.remove(&field);
        } else {
            fields.insert(field, annotation);
        }
        Self { fields }
    }

    pub fn has_error(&self) -> bool {
        self.fields
            .values()
            .any(|annotation| annotation.state == ValueState::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = (FieldId, &str)> {
        self.fields
            .iter()
            .filter(|(_, annotation)| annotation.state == ValueState::Error)
            .map(|(field, annotation)| (*field, annotation.text.as_str()))
    }
}

/// Result of the local required-field check run before create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub annotations: FieldAnnotations,
    /// Set for fields that carry no value state of their own.
    pub form_message: Option<String>,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.form_message {
            return f.write_str(message);
        }
        match self.annotations.errors().next() {
            Some((_, text)) => f.write_str(text),
            None => f.write_str("form is invalid"),
        }
    }
}

impl std::error::Error for ValidationReport {}

pub fn validate_draft(
    catalog: &FieldCatalog,
    draft: &ItemDraft,
) -> std::result::Result<(), ValidationReport> {
    let mut annotations = FieldAnnotations::default();
    let mut form_message = None;

    for entry in catalog.entries() {
        if !entry.requirement.is_required(draft) || !draft.value(entry.id).is_blank() {
            continue;
        }
        let text = format!("'{}' is required", entry.label);
        if entry.no_value_state {
            form_message = Some(text.clone());
        }
        annotations = annotations.with(entry.id, FieldAnnotation::error(text));
    }

    if annotations.has_error() {
        Err(ValidationReport {
            annotations,
            form_message,
        })
    } else {
        Ok(())
    }
}
