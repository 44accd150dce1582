// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Contract with the remote tabular data source.
//!
//! Mutations are issued and answered in two steps: the source accepts a call
//! tagged with a [`CallId`] and later delivers a [`Reply`] carrying the same
//! id, typically over an `mpsc` channel the session loop drains.

use anyhow::Result;
use serde_json::Value;

use crate::{CallId, FilterSpec, Item, ItemDraft, ItemId, ItemPatch, MutationBatch, SortKey};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemQuery {
    pub filter: FilterSpec,
    pub sort: Vec<SortKey>,
}

/// A rejected request as the data source reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteFailure {
    pub status_code: Option<u16>,
    pub status_text: String,
    /// Raw response body; usually JSON with `error.message.value`.
    pub response_text: String,
}

impl RemoteFailure {
    pub fn new(status_code: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            status_text: status_text.into(),
            response_text: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    Created(Item),
    Completed,
    /// `{"__batchResponses": [...]}` as returned by `submit_changes`.
    Batch(Value),
    Failed(RemoteFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub call: CallId,
    pub payload: ReplyPayload,
}

pub trait DataSource {
    fn read(&mut self, query: &ItemQuery) -> Result<Vec<Item>>;
    fn create(&mut self, call: CallId, draft: &ItemDraft) -> Result<()>;
    fn update(&mut self, call: CallId, id: ItemId, patch: &ItemPatch) -> Result<()>;
    fn remove(&mut self, call: CallId, id: ItemId) -> Result<()>;
    fn submit_changes(&mut self, call: CallId, batch: &MutationBatch) -> Result<()>;
    /// Drops any staged, unsubmitted changes.
    fn reset_changes(&mut self);
}

/// Display text for a rejected request, optionally prefixed with the action.
pub fn parse_error(failure: &RemoteFailure, action: Option<&str>) -> String {
    let detail = error_message_from_body(&failure.response_text)
        .or_else(|| {
            let text = failure.response_text.trim();
            (!text.is_empty() && serde_json::from_str::<Value>(text).is_err())
                .then(|| text.to_owned())
        })
        .or_else(|| {
            let text = failure.status_text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        })
        .unwrap_or_else(|| match failure.status_code {
            Some(code) => format!("request failed with status {code}"),
            None => "Unknown error".to_owned(),
        });

    match action {
        Some(action) => format!("Error {action}: {detail}"),
        None => detail,
    }
}

/// `error.message.value` from a JSON body, if present.
pub fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message/value")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
