// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use time::macros::format_description;
use urgentboard_app::{FieldId, FieldValue, ItemId, ItemPatch, OrderType};

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidDate,
    InvalidQuantity,
    InvalidId,
    InvalidFlag,
    InvalidOrderType,
    UnknownField,
    MissingAssignment,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate => write!(f, "invalid date value; expected {DATE_LAYOUT}"),
            Self::InvalidQuantity => f.write_str("invalid quantity value"),
            Self::InvalidId => f.write_str("invalid item id"),
            Self::InvalidFlag => f.write_str("invalid flag value; expected true or false"),
            Self::InvalidOrderType => f.write_str("invalid order type; expected P, S, D or empty"),
            Self::UnknownField => f.write_str("unknown field name"),
            Self::MissingAssignment => f.write_str("expected FIELD=VALUE"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub fn parse_required_date(input: &str) -> ValidationResult<Date> {
    parse_date(input.trim())
}

pub fn parse_optional_date(input: &str) -> ValidationResult<Option<Date>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_date(trimmed).map(Some)
}

pub fn parse_optional_quantity(input: &str) -> ValidationResult<Option<i64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidQuantity)?;
    if value < 0 {
        return Err(ValidationError::InvalidQuantity);
    }
    Ok(Some(value))
}

/// `"3, 5,8"` into ids; empty segments are skipped.
pub fn parse_item_ids(input: &str) -> ValidationResult<Vec<ItemId>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .parse::<i64>()
                .ok()
                .filter(|id| *id > 0)
                .map(ItemId::new)
                .ok_or(ValidationError::InvalidId)
        })
        .collect()
}

pub fn parse_field_value(field: FieldId, input: &str) -> ValidationResult<FieldValue> {
    let trimmed = input.trim();
    match field {
        FieldId::Type => OrderType::parse(&trimmed.to_ascii_uppercase())
            .map(FieldValue::OrderType)
            .ok_or(ValidationError::InvalidOrderType),
        FieldId::Quantity | FieldId::QuantityIssued => {
            parse_optional_quantity(trimmed).map(FieldValue::Quantity)
        }
        FieldId::UnlimitedQuantity => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(FieldValue::Flag(true)),
            "false" | "no" | "0" | "" => Ok(FieldValue::Flag(false)),
            _ => Err(ValidationError::InvalidFlag),
        },
        FieldId::DueDate => parse_optional_date(trimmed).map(FieldValue::Date),
        _ => Ok(FieldValue::Text(input.to_owned())),
    }
}

/// `"comments=call first"` into a single-field patch.
pub fn parse_assignment(input: &str) -> ValidationResult<ItemPatch> {
    let (name, value) = input
        .split_once('=')
        .ok_or(ValidationError::MissingAssignment)?;
    let field = FieldId::parse(name).ok_or(ValidationError::UnknownField)?;
    Ok(ItemPatch::new(field, parse_field_value(field, value)?))
}

fn parse_date(input: &str) -> ValidationResult<Date> {
    Date::parse(input, &format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate)
}
