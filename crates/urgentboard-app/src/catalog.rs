// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FieldId, ItemDraft, OrderType};

/// When a create-form field must carry a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Optional,
    Always,
    /// Required only while the other field is blank.
    UnlessFilled(FieldId),
    /// Required once an order type is chosen.
    WhenOrderTyped,
    /// Required unless the quantity is flagged unlimited.
    UnlessUnlimited,
}

impl Requirement {
    pub fn is_required(self, draft: &ItemDraft) -> bool {
        match self {
            Self::Optional => false,
            Self::Always => true,
            Self::UnlessFilled(other) => draft.value(other).is_blank(),
            Self::WhenOrderTyped => draft.order_type != OrderType::None,
            Self::UnlessUnlimited => !draft.unlimited_quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub id: FieldId,
    pub label: &'static str,
    pub can_search: bool,
    pub can_sort: bool,
    pub initial_sort_position: Option<usize>,
    pub requirement: Requirement,
    /// Errors on this field go to the form message instead of the field.
    pub no_value_state: bool,
}

impl FieldSpec {
    const fn new(id: FieldId, label: &'static str) -> Self {
        Self {
            id,
            label,
            can_search: false,
            can_sort: false,
            initial_sort_position: None,
            requirement: Requirement::Optional,
            no_value_state: false,
        }
    }

    const fn searchable(mut self) -> Self {
        self.can_search = true;
        self
    }

    const fn sortable(mut self) -> Self {
        self.can_sort = true;
        self
    }

    const fn initial_sort(mut self, position: usize) -> Self {
        self.initial_sort_position = Some(position);
        self
    }

    const fn required(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    const fn without_value_state(mut self) -> Self {
        self.no_value_state = true;
        self
    }
}

/// Ordered field metadata for the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCatalog {
    entries: Vec<FieldSpec>,
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl FieldCatalog {
    pub fn new(entries: Vec<FieldSpec>) -> Self {
        Self { entries }
    }

    pub fn standard() -> Self {
        use FieldId as F;
        Self::new(vec![
            FieldSpec::new(F::Material, "Part Number")
                .searchable()
                .sortable()
                .initial_sort(0)
                .required(Requirement::UnlessFilled(F::Description)),
            FieldSpec::new(F::Description, "Part Description")
                .searchable()
                .sortable()
                .required(Requirement::UnlessFilled(F::Material)),
            FieldSpec::new(F::Type, "Order type")
                .sortable()
                .without_value_state(),
            FieldSpec::new(F::ObjectKey, "Order id")
                .searchable()
                .sortable()
                .required(Requirement::WhenOrderTyped),
            FieldSpec::new(F::Line, "Item id").sortable(),
            FieldSpec::new(F::Quantity, "Quantity required")
                .sortable()
                .required(Requirement::UnlessUnlimited),
            FieldSpec::new(F::UnlimitedQuantity, "Unlimited"),
            FieldSpec::new(F::QuantityIssued, "Quantity issued"),
            FieldSpec::new(F::Uom, "Unit of measure").required(Requirement::Always),
            FieldSpec::new(F::DueDate, "Due date").sortable(),
            FieldSpec::new(F::DeliverTo, "Deliver to").sortable(),
            FieldSpec::new(F::Comments, "Comments"),
            FieldSpec::new(F::EnteredByName, "Contact")
                .searchable()
                .sortable(),
            FieldSpec::new(F::SupplierName, "Supplier").searchable(),
        ])
    }

    pub fn entries(&self) -> &[FieldSpec] {
        &self.entries
    }

    pub fn get(&self, id: FieldId) -> Option<&FieldSpec> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn label(&self, id: FieldId) -> &'static str {
        self.get(id).map_or(id.as_str(), |entry| entry.label)
    }

    pub fn searchable(&self) -> impl Iterator<Item = &FieldSpec> {
        self.entries.iter().filter(|entry| entry.can_search)
    }

    pub fn sortable(&self) -> impl Iterator<Item = &FieldSpec> {
        self.entries.iter().filter(|entry| entry.can_sort)
    }

    pub fn is_sortable(&self, id: FieldId) -> bool {
        self.get(id).is_some_and(|entry| entry.can_sort)
    }
}
