// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::remote::error_message_from_body;
use crate::{GroupId, ItemDraft, ItemId, ItemPatch};

pub const MISSING_BATCH_DATA: &str = "Unexpected problem / missing data in batch response.";
pub const MALFORMED_BATCH_ENTRY: &str = "Unexpected error type/format in batch response.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create(ItemDraft),
    Update(ItemId, ItemPatch),
    Delete(ItemId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Pending,
    Submitted,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationBatch {
    pub group_id: GroupId,
    pub operations: Vec<Operation>,
    pub state: BatchState,
}

impl MutationBatch {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            operations: Vec::new(),
            state: BatchState::Pending,
        }
    }

    pub fn deletes(group_id: GroupId, ids: &[ItemId]) -> Self {
        Self {
            operations: ids.iter().copied().map(Operation::Delete).collect(),
            ..Self::new(group_id)
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Succeeded(u16),
    Failed {
        status: Option<u16>,
        message: String,
    },
}

impl OperationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub per_operation_status: Vec<OperationStatus>,
    /// Message of the last failing operation. `None` means full success.
    pub aggregate_error_message: Option<String>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.aggregate_error_message.is_none()
    }

    pub fn success_count(&self) -> usize {
        self.per_operation_status
            .iter()
            .filter(|status| status.is_success())
            .count()
    }

    /// The batch as a whole failed; no per-operation detail is available.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            per_operation_status: Vec::new(),
            aggregate_error_message: Some(message.into()),
        }
    }
}

/// Reduce a `{"__batchResponses": [...]}` payload to per-entry statuses.
///
/// Every entry is scanned; a later failure overwrites the message of an
/// earlier one.
pub fn parse_batch_response(payload: &Value) -> BatchOutcome {
    let Some(entries) = payload.get("__batchResponses").and_then(Value::as_array) else {
        debug!(%payload, "batch payload missing __batchResponses");
        return BatchOutcome::failed(MISSING_BATCH_DATA);
    };

    let mut outcome = BatchOutcome::default();
    for entry in entries {
        let status = entry_status_code(entry);
        if let Some(code) = status.filter(|code| (200..300).contains(code)) {
            outcome
                .per_operation_status
                .push(OperationStatus::Succeeded(code));
            continue;
        }

        let message = entry_error_message(entry, status);
        outcome.aggregate_error_message = Some(message.clone());
        outcome
            .per_operation_status
            .push(OperationStatus::Failed { status, message });
    }
    outcome
}

fn entry_status_code(entry: &Value) -> Option<u16> {
    entry
        .get("statusCode")
        .or_else(|| entry.pointer("/response/statusCode"))
        .and_then(status_code_value)
}

fn status_code_value(value: &Value) -> Option<u16> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|code| u16::try_from(code).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn entry_error_message(entry: &Value, status: Option<u16>) -> String {
    let body = entry
        .pointer("/response/body")
        .or_else(|| entry.get("body"))
        .and_then(Value::as_str);
    let Some(body) = body else {
        return match status {
            Some(code) => format!("request failed with status {code}"),
            None => MALFORMED_BATCH_ENTRY.to_owned(),
        };
    };
    if serde_json::from_str::<Value>(body).is_err() {
        return MALFORMED_BATCH_ENTRY.to_owned();
    }
    error_message_from_body(body).unwrap_or_else(|| match status {
        Some(code) => format!("request failed with status {code}"),
        None => MALFORMED_BATCH_ENTRY.to_owned(),
    })
}
