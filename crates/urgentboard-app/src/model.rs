// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldId {
    Material,
    Description,
    Type,
    ObjectKey,
    Line,
    Quantity,
    UnlimitedQuantity,
    QuantityIssued,
    Uom,
    DueDate,
    DeliverTo,
    Comments,
    EnteredByName,
    SupplierName,
}

impl FieldId {
    pub const ALL: [Self; 14] = [
        Self::Material,
        Self::Description,
        Self::Type,
        Self::ObjectKey,
        Self::Line,
        Self::Quantity,
        Self::UnlimitedQuantity,
        Self::QuantityIssued,
        Self::Uom,
        Self::DueDate,
        Self::DeliverTo,
        Self::Comments,
        Self::EnteredByName,
        Self::SupplierName,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::Description => "description",
            Self::Type => "type",
            Self::ObjectKey => "objectkey",
            Self::Line => "line",
            Self::Quantity => "quantity",
            Self::UnlimitedQuantity => "unlimitedQuantity",
            Self::QuantityIssued => "quantityIssued",
            Self::Uom => "uom",
            Self::DueDate => "dueDate",
            Self::DeliverTo => "deliverTo",
            Self::Comments => "comments",
            Self::EnteredByName => "enteredByName",
            Self::SupplierName => "supplierName",
        }
    }

    /// Case-insensitive: stored sort preferences carry upper-cased names.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(value))
    }

    pub const fn column(self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::Description => "description",
            Self::Type => "order_type",
            Self::ObjectKey => "object_key",
            Self::Line => "line",
            Self::Quantity => "quantity",
            Self::UnlimitedQuantity => "unlimited_quantity",
            Self::QuantityIssued => "quantity_issued",
            Self::Uom => "uom",
            Self::DueDate => "due_date",
            Self::DeliverTo => "deliver_to",
            Self::Comments => "comments",
            Self::EnteredByName => "entered_by_name",
            Self::SupplierName => "supplier_name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    None,
    Purchase,
    Sales,
    Production,
}

impl OrderType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Purchase => "P",
            Self::Sales => "S",
            Self::Production => "D",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "" => Some(Self::None),
            "P" => Some(Self::Purchase),
            "S" => Some(Self::Sales),
            "D" => Some(Self::Production),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Purchase => "Purchase Order",
            Self::Sales => "Sales Order",
            Self::Production => "Production Order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn code(self) -> char {
        match self {
            Self::Asc => 'A',
            Self::Desc => 'D',
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    Sort,
}

impl SettingKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sort => "SORT",
        }
    }
}

/// Create-form payload: every item field except identity and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub material: String,
    pub description: String,
    pub order_type: OrderType,
    pub object_key: String,
    pub line: String,
    pub quantity: Option<i64>,
    pub unlimited_quantity: bool,
    pub quantity_issued: i64,
    pub uom: String,
    pub due_date: Option<Date>,
    pub deliver_to: String,
    pub comments: String,
    pub entered_by_name: String,
    pub supplier_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub material: String,
    pub description: String,
    pub order_type: OrderType,
    pub object_key: String,
    pub line: String,
    pub quantity: Option<i64>,
    pub unlimited_quantity: bool,
    pub quantity_issued: i64,
    pub uom: String,
    pub due_date: Option<Date>,
    pub deliver_to: String,
    pub comments: String,
    pub entered_by_name: String,
    pub supplier_name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Quantity(Option<i64>),
    Flag(bool),
    Date(Option<Date>),
    OrderType(OrderType),
}

impl FieldValue {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(value) => value.trim().is_empty(),
            Self::Quantity(value) => value.is_none(),
            Self::Flag(value) => !value,
            Self::Date(value) => value.is_none(),
            Self::OrderType(value) => *value == OrderType::None,
        }
    }

    /// Text used for substring matching and display.
    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Quantity(value) => value.map(|q| q.to_string()).unwrap_or_default(),
            Self::Flag(value) => if *value { "yes" } else { "" }.to_owned(),
            Self::Date(value) => value.map(format_date).unwrap_or_default(),
            Self::OrderType(value) => value.as_str().to_owned(),
        }
    }
}

/// One inline edit: the field the user changed and its new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub field: FieldId,
    pub value: FieldValue,
}

impl ItemPatch {
    pub fn new(field: FieldId, value: FieldValue) -> Self {
        Self { field, value }
    }
}

impl ItemDraft {
    pub fn value(&self, field: FieldId) -> FieldValue {
        match field {
            FieldId::Material => FieldValue::Text(self.material.clone()),
            FieldId::Description => FieldValue::Text(self.description.clone()),
            FieldId::Type => FieldValue::OrderType(self.order_type),
            FieldId::ObjectKey => FieldValue::Text(self.object_key.clone()),
            FieldId::Line => FieldValue::Text(self.line.clone()),
            FieldId::Quantity => FieldValue::Quantity(self.quantity),
            FieldId::UnlimitedQuantity => FieldValue::Flag(self.unlimited_quantity),
            FieldId::QuantityIssued => FieldValue::Quantity(Some(self.quantity_issued)),
            FieldId::Uom => FieldValue::Text(self.uom.clone()),
            FieldId::DueDate => FieldValue::Date(self.due_date),
            FieldId::DeliverTo => FieldValue::Text(self.deliver_to.clone()),
            FieldId::Comments => FieldValue::Text(self.comments.clone()),
            FieldId::EnteredByName => FieldValue::Text(self.entered_by_name.clone()),
            FieldId::SupplierName => FieldValue::Text(self.supplier_name.clone()),
        }
    }

    pub fn set(&mut self, field: FieldId, value: FieldValue) -> Result<()> {
        match (field, value) {
            (FieldId::Material, FieldValue::Text(value)) => self.material = value,
            (FieldId::Description, FieldValue::Text(value)) => self.description = value,
            (FieldId::Type, FieldValue::OrderType(value)) => self.order_type = value,
            (FieldId::ObjectKey, FieldValue::Text(value)) => self.object_key = value,
            (FieldId::Line, FieldValue::Text(value)) => self.line = value,
            (FieldId::Quantity, FieldValue::Quantity(value)) => self.quantity = value,
            (FieldId::UnlimitedQuantity, FieldValue::Flag(value)) => {
                self.unlimited_quantity = value;
            }
            (FieldId::QuantityIssued, FieldValue::Quantity(value)) => {
                self.quantity_issued = value.unwrap_or(0);
            }
            (FieldId::Uom, FieldValue::Text(value)) => self.uom = value,
            (FieldId::DueDate, FieldValue::Date(value)) => self.due_date = value,
            (FieldId::DeliverTo, FieldValue::Text(value)) => self.deliver_to = value,
            (FieldId::Comments, FieldValue::Text(value)) => self.comments = value,
            (FieldId::EnteredByName, FieldValue::Text(value)) => self.entered_by_name = value,
            (FieldId::SupplierName, FieldValue::Text(value)) => self.supplier_name = value,
            (field, value) => bail!(
                "field `{}` cannot hold {value:?}; pick a value of the right kind",
                field.as_str()
            ),
        }
        Ok(())
    }
}

impl Item {
    pub fn draft(&self) -> ItemDraft {
        ItemDraft {
            material: self.material.clone(),
            description: self.description.clone(),
            order_type: self.order_type,
            object_key: self.object_key.clone(),
            line: self.line.clone(),
            quantity: self.quantity,
            unlimited_quantity: self.unlimited_quantity,
            quantity_issued: self.quantity_issued,
            uom: self.uom.clone(),
            due_date: self.due_date,
            deliver_to: self.deliver_to.clone(),
            comments: self.comments.clone(),
            entered_by_name: self.entered_by_name.clone(),
            supplier_name: self.supplier_name.clone(),
        }
    }

    pub fn value(&self, field: FieldId) -> FieldValue {
        self.draft().value(field)
    }

    /// "objectkey/line", with the line dropped when it is not a non-zero number.
    pub fn order_text(&self) -> String {
        if self.object_key.is_empty() {
            return String::new();
        }
        match self.line.trim().parse::<i64>() {
            Ok(line) if line != 0 => format!("{}/{line}", self.object_key),
            _ => self.object_key.clone(),
        }
    }

    /// "issued / required", with "∞" standing in for unlimited quantities.
    pub fn quantity_text(&self) -> String {
        let required = if self.unlimited_quantity {
            "∞".to_owned()
        } else {
            self.quantity.map(|q| q.to_string()).unwrap_or_default()
        };
        if self.quantity_issued > 0 {
            format!("{} / {required}", self.quantity_issued)
        } else {
            required
        }
    }
}

pub fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}

#[cfg(test)]
mod tests {
    use super::{FieldId, FieldValue, Item, ItemDraft, OrderType};
    use crate::ItemId;
    use time::OffsetDateTime;

    fn item(object_key: &str, line: &str) -> Item {
        Item {
            id: ItemId::new(1),
            material: "100-200".to_owned(),
            description: "Bearing".to_owned(),
            order_type: OrderType::Purchase,
            object_key: object_key.to_owned(),
            line: line.to_owned(),
            quantity: Some(4),
            unlimited_quantity: false,
            quantity_issued: 0,
            uom: "EA".to_owned(),
            due_date: None,
            deliver_to: String::new(),
            comments: String::new(),
            entered_by_name: String::new(),
            supplier_name: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn field_parse_ignores_case() {
        assert_eq!(FieldId::parse("MATERIAL"), Some(FieldId::Material));
        assert_eq!(FieldId::parse("enteredbyname"), Some(FieldId::EnteredByName));
        assert_eq!(FieldId::parse("nope"), None);
    }

    #[test]
    fn order_text_drops_zero_line() {
        assert_eq!(item("4500001", "00010").order_text(), "4500001/10");
        assert_eq!(item("4500001", "0000").order_text(), "4500001");
        assert_eq!(item("", "10").order_text(), "");
    }

    #[test]
    fn quantity_text_shows_issued_and_unlimited() {
        let mut row = item("", "");
        assert_eq!(row.quantity_text(), "4");
        row.quantity_issued = 2;
        assert_eq!(row.quantity_text(), "2 / 4");
        row.unlimited_quantity = true;
        assert_eq!(row.quantity_text(), "2 / ∞");
    }

    #[test]
    fn draft_set_rejects_mismatched_value_kind() {
        let mut draft: ItemDraft = item("", "").draft();
        assert!(
            draft
                .set(FieldId::Quantity, FieldValue::Text("x".to_owned()))
                .is_err()
        );
        draft
            .set(FieldId::Quantity, FieldValue::Quantity(Some(9)))
            .expect("quantity accepts quantity value");
        assert_eq!(draft.quantity, Some(9));
    }
}
