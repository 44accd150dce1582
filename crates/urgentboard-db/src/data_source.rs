// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::sync::mpsc::Sender;
use tracing::{debug, warn};
use urgentboard_app::{
    CallId, DataSource, GroupId, Item, ItemDraft, ItemId, ItemPatch, ItemQuery, MutationBatch,
    Operation, RemoteFailure, Reply, ReplyPayload,
};

use crate::Store;

/// [`DataSource`] over a local [`Store`].
///
/// Calls execute immediately; their replies are queued on the channel so the
/// caller resolves them the same way it would a remote answer.
pub struct SqliteDataSource {
    store: Store,
    replies: Sender<Reply>,
    submitted_group: Option<GroupId>,
}

impl SqliteDataSource {
    pub fn new(store: Store, replies: Sender<Reply>) -> Self {
        Self {
            store,
            replies,
            submitted_group: None,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Group id of the last batch that has not been reset yet.
    pub fn submitted_group(&self) -> Option<&GroupId> {
        self.submitted_group.as_ref()
    }

    fn send(&self, call: CallId, payload: ReplyPayload) -> Result<()> {
        self.replies
            .send(Reply { call, payload })
            .context("reply channel closed; restart the board session")
    }

    fn create_outcome(&self, draft: &ItemDraft) -> std::result::Result<Item, RemoteFailure> {
        let id = self.store.create_item(draft).map_err(server_error)?;
        self.store.get_item(id).map_err(server_error)
    }

    fn update_outcome(
        &self,
        id: ItemId,
        patch: &ItemPatch,
    ) -> std::result::Result<Item, RemoteFailure> {
        match self.store.update_item(id, patch) {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(not_found(id)),
            Err(error) => Err(RemoteFailure::new(
                400,
                "Bad Request",
                error_body(&format!("{error:#}")),
            )),
        }
    }

    fn delete_outcome(&self, id: ItemId) -> std::result::Result<(), RemoteFailure> {
        match self.store.delete_item(id) {
            Ok(true) => Ok(()),
            Ok(false) => Err(not_found(id)),
            Err(error) => Err(server_error(error)),
        }
    }
}

impl DataSource for SqliteDataSource {
    fn read(&mut self, query: &ItemQuery) -> Result<Vec<Item>> {
        self.store.list_items(query)
    }

    fn create(&mut self, call: CallId, draft: &ItemDraft) -> Result<()> {
        debug!(%call, material = %draft.material, "create item");
        let payload = match self.create_outcome(draft) {
            Ok(item) => ReplyPayload::Created(item),
            Err(failure) => ReplyPayload::Failed(failure),
        };
        self.send(call, payload)
    }

    fn update(&mut self, call: CallId, id: ItemId, patch: &ItemPatch) -> Result<()> {
        debug!(%call, %id, field = patch.field.as_str(), "update item");
        let payload = match self.update_outcome(id, patch) {
            Ok(_) => ReplyPayload::Completed,
            Err(failure) => ReplyPayload::Failed(failure),
        };
        self.send(call, payload)
    }

    fn remove(&mut self, call: CallId, id: ItemId) -> Result<()> {
        debug!(%call, %id, "remove item");
        let payload = match self.delete_outcome(id) {
            Ok(()) => ReplyPayload::Completed,
            Err(failure) => ReplyPayload::Failed(failure),
        };
        self.send(call, payload)
    }

    fn submit_changes(&mut self, call: CallId, batch: &MutationBatch) -> Result<()> {
        debug!(%call, group = %batch.group_id, operations = batch.len(), "submit batch");
        self.submitted_group = Some(batch.group_id.clone());

        let responses = batch
            .operations
            .iter()
            .map(|operation| match operation {
                Operation::Create(draft) => match self.create_outcome(draft) {
                    Ok(item) => json!({
                        "statusCode": "201",
                        "statusText": "Created",
                        "body": serde_json::to_string(&item).unwrap_or_default(),
                    }),
                    Err(failure) => failure_entry(&failure),
                },
                Operation::Update(id, patch) => match self.update_outcome(*id, patch) {
                    Ok(_) => no_content(),
                    Err(failure) => failure_entry(&failure),
                },
                Operation::Delete(id) => match self.delete_outcome(*id) {
                    Ok(()) => no_content(),
                    Err(failure) => failure_entry(&failure),
                },
            })
            .collect::<Vec<_>>();

        self.send(
            call,
            ReplyPayload::Batch(json!({ "__batchResponses": responses })),
        )
    }

    fn reset_changes(&mut self) {
        if let Some(group) = self.submitted_group.take() {
            debug!(%group, "reset submitted group");
        }
    }
}

fn error_body(message: &str) -> String {
    json!({
        "error": {
            "code": "URGENTBOARD",
            "message": { "lang": "en", "value": message },
        }
    })
    .to_string()
}

fn not_found(id: ItemId) -> RemoteFailure {
    RemoteFailure::new(
        404,
        "Not Found",
        error_body(&format!("Item {id} does not exist")),
    )
}

fn server_error(error: anyhow::Error) -> RemoteFailure {
    warn!(error = %format!("{error:#}"), "data source call failed");
    RemoteFailure::new(
        500,
        "Internal Server Error",
        error_body(&format!("{error:#}")),
    )
}

fn no_content() -> Value {
    json!({ "statusCode": "204", "statusText": "No Content" })
}

fn failure_entry(failure: &RemoteFailure) -> Value {
    json!({
        "response": {
            "statusCode": failure.status_code.map(|code| code.to_string()),
            "statusText": failure.status_text,
            "body": failure.response_text,
        }
    })
}
