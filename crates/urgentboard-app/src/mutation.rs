// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! One mutation cycle at a time against a [`DataSource`].
//!
//! A cycle starts when a call is issued and ends when its [`Reply`] is
//! resolved. While a cycle is open every new mutation is refused with
//! [`MutationError::Busy`].

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::{
    BatchOutcome, BatchState, CallId, DataSource, FieldAnnotation, FieldAnnotations,
    FieldCatalog, FieldId, GroupId, Item, ItemDraft, ItemId, ItemPatch, MutationBatch,
    RemoteFailure, Reply, ReplyPayload, ValidationReport, parse_batch_response, parse_error,
    validate_draft,
};

pub const DELETE_ONE_PROMPT: &str = "Are you sure you want to delete this item?";
const BATCH_GROUP_PREFIX: &str = "removeSelectedItems";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Busy,
    BatchPending,
    BatchSubmitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    Busy,
    Validation(ValidationReport),
    /// The data source refused the call before a reply could be scheduled.
    Dispatch(String),
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => {
                f.write_str("another change is still being saved; try again when it finishes")
            }
            Self::Validation(report) => fmt::Display::fmt(report, f),
            Self::Dispatch(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for MutationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(report) => Some(report),
            Self::Busy | Self::Dispatch(_) => None,
        }
    }
}

/// Invoked with the edited field and the error text when an update fails,
/// so the caller can reopen whatever editor produced the change.
pub type EditorContinuation = Box<dyn FnOnce(FieldId, &str)>;

enum InFlight {
    Create {
        call: CallId,
        draft: ItemDraft,
    },
    Update {
        call: CallId,
        id: ItemId,
        field: FieldId,
        on_failure: Option<EditorContinuation>,
    },
    Delete {
        call: CallId,
        id: ItemId,
    },
    Batch {
        call: CallId,
        batch: MutationBatch,
    },
}

impl InFlight {
    const fn call(&self) -> CallId {
        match self {
            Self::Create { call, .. }
            | Self::Update { call, .. }
            | Self::Delete { call, .. }
            | Self::Batch { call, .. } => *call,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Batch { .. } => "batch",
        }
    }
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { call, draft } => f
                .debug_struct("Create")
                .field("call", call)
                .field("draft", draft)
                .finish(),
            Self::Update {
                call,
                id,
                field,
                on_failure,
            } => f
                .debug_struct("Update")
                .field("call", call)
                .field("id", id)
                .field("field", field)
                .field("has_continuation", &on_failure.is_some())
                .finish(),
            Self::Delete { call, id } => f
                .debug_struct("Delete")
                .field("call", call)
                .field("id", id)
                .finish(),
            Self::Batch { call, batch } => f
                .debug_struct("Batch")
                .field("call", call)
                .field("batch", batch)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Created(Item),
    CreateFailed {
        message: String,
        draft: ItemDraft,
    },
    Updated {
        id: ItemId,
        field: FieldId,
    },
    UpdateFailed {
        id: ItemId,
        field: FieldId,
        message: String,
    },
    Deleted(ItemId),
    DeleteFailed {
        id: ItemId,
        message: String,
    },
    BatchDeleted {
        removed: usize,
        outcome: BatchOutcome,
    },
    BatchFailed {
        outcome: BatchOutcome,
    },
}

impl Resolution {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::CreateFailed { .. }
                | Self::UpdateFailed { .. }
                | Self::DeleteFailed { .. }
                | Self::BatchFailed { .. }
        )
    }

    /// User-facing toast or error text for this resolution.
    pub fn notice(&self) -> String {
        match self {
            Self::Created(item) => format!("Material '{}' added", item.description),
            Self::Updated { .. } => "Item updated.".to_owned(),
            Self::Deleted(_) => "Item removed".to_owned(),
            Self::BatchDeleted { removed, .. } => format!("{removed} item(s) removed"),
            Self::CreateFailed { message, .. }
            | Self::UpdateFailed { message, .. }
            | Self::DeleteFailed { message, .. } => message.clone(),
            Self::BatchFailed { outcome } => outcome
                .aggregate_error_message
                .clone()
                .unwrap_or_default(),
        }
    }

    /// Field annotations after this resolution; the input is left untouched.
    pub fn annotate(&self, annotations: &FieldAnnotations) -> FieldAnnotations {
        match self {
            Self::Updated { field, .. } => annotations.with(*field, FieldAnnotation::clear()),
            Self::UpdateFailed { field, message, .. } => {
                annotations.with(*field, FieldAnnotation::error(message.clone()))
            }
            _ => annotations.clone(),
        }
    }
}

#[derive(Debug)]
pub struct MutationOrchestrator {
    catalog: FieldCatalog,
    next_call: u64,
    next_group: u64,
    in_flight: Option<InFlight>,
    last_batch: Option<MutationBatch>,
}

impl Default for MutationOrchestrator {
    fn default() -> Self {
        Self::new(FieldCatalog::standard())
    }
}

impl MutationOrchestrator {
    pub fn new(catalog: FieldCatalog) -> Self {
        Self {
            catalog,
            next_call: 1,
            next_group: 1,
            in_flight: None,
            last_batch: None,
        }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn state(&self) -> CycleState {
        match &self.in_flight {
            None => CycleState::Idle,
            Some(InFlight::Batch { batch, .. }) if batch.state == BatchState::Pending => {
                CycleState::BatchPending
            }
            Some(InFlight::Batch { .. }) => CycleState::BatchSubmitted,
            Some(_) => CycleState::Busy,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight_call(&self) -> Option<CallId> {
        self.in_flight.as_ref().map(InFlight::call)
    }

    /// The most recently resolved batch, in the `Resolved` state.
    pub fn last_batch(&self) -> Option<&MutationBatch> {
        self.last_batch.as_ref()
    }

    pub fn create_record(
        &mut self,
        source: &mut dyn DataSource,
        draft: &ItemDraft,
    ) -> Result<CallId, MutationError> {
        self.ensure_idle()?;
        validate_draft(&self.catalog, draft).map_err(MutationError::Validation)?;

        let call = self.begin(InFlight::Create {
            call: self.peek_call(),
            draft: draft.clone(),
        });
        let dispatched = source.create(call, draft);
        self.finish_dispatch(source, dispatched)?;
        Ok(call)
    }

    pub fn update_record(
        &mut self,
        source: &mut dyn DataSource,
        id: ItemId,
        patch: &ItemPatch,
        on_failure: Option<EditorContinuation>,
    ) -> Result<CallId, MutationError> {
        self.ensure_idle()?;

        let call = self.begin(InFlight::Update {
            call: self.peek_call(),
            id,
            field: patch.field,
            on_failure,
        });
        let dispatched = source.update(call, id, patch);
        self.finish_dispatch(source, dispatched)?;
        Ok(call)
    }

    /// `Ok(None)` when the confirmation is declined; nothing is issued.
    pub fn delete_record(
        &mut self,
        source: &mut dyn DataSource,
        id: ItemId,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<Option<CallId>, MutationError> {
        self.ensure_idle()?;
        if !confirm(DELETE_ONE_PROMPT) {
            debug!(%id, "delete declined");
            return Ok(None);
        }

        let call = self.begin(InFlight::Delete {
            call: self.peek_call(),
            id,
        });
        let dispatched = source.remove(call, id);
        self.finish_dispatch(source, dispatched)?;
        Ok(Some(call))
    }

    /// Stage one delete per distinct id under a fresh group and submit them
    /// together. Repeated ids are staged once, in first-seen order.
    pub fn delete_batch(
        &mut self,
        source: &mut dyn DataSource,
        ids: &[ItemId],
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<Option<CallId>, MutationError> {
        self.ensure_idle()?;
        let mut seen = BTreeSet::new();
        let ids: Vec<ItemId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if ids.is_empty() {
            return Ok(None);
        }
        let prompt = format!("Are you sure you want to delete {} item(s)?", ids.len());
        if !confirm(&prompt) {
            debug!(count = ids.len(), "batch delete declined");
            return Ok(None);
        }

        let group_id = GroupId::new(format!("{BATCH_GROUP_PREFIX}-{}", self.next_group));
        self.next_group += 1;
        let batch = MutationBatch::deletes(group_id, &ids);
        let call = self.begin(InFlight::Batch {
            call: self.peek_call(),
            batch,
        });

        let dispatched = match &self.in_flight {
            Some(InFlight::Batch { batch, .. }) => source.submit_changes(call, batch),
            _ => Ok(()),
        };
        self.finish_dispatch(source, dispatched)?;
        if let Some(InFlight::Batch { batch, .. }) = &mut self.in_flight {
            batch.state = BatchState::Submitted;
        }
        Ok(Some(call))
    }

    /// Close the open cycle with `reply`. Replies for any other call are
    /// ignored and yield `None`.
    pub fn resolve(&mut self, source: &mut dyn DataSource, reply: Reply) -> Option<Resolution> {
        let Some(expected) = self.in_flight_call() else {
            warn!(call = %reply.call, "reply arrived with no mutation in flight");
            return None;
        };
        if expected != reply.call {
            warn!(call = %reply.call, %expected, "ignoring stale reply");
            return None;
        }
        let in_flight = self.in_flight.take()?;
        source.reset_changes();
        if let InFlight::Batch { batch, .. } = &in_flight {
            self.last_batch = Some(MutationBatch {
                state: BatchState::Resolved,
                ..batch.clone()
            });
        }

        let kind = in_flight.kind();
        let resolution = match (in_flight, reply.payload) {
            (InFlight::Create { .. }, ReplyPayload::Created(item)) => Resolution::Created(item),
            (InFlight::Create { draft, .. }, payload) => Resolution::CreateFailed {
                message: parse_error(&failure_of(payload), Some("creating item")),
                draft,
            },
            (
                InFlight::Update { id, field, .. },
                ReplyPayload::Completed | ReplyPayload::Created(_),
            ) => Resolution::Updated { id, field },
            (
                InFlight::Update {
                    id,
                    field,
                    on_failure,
                    ..
                },
                payload,
            ) => {
                let message = parse_error(&failure_of(payload), None);
                if let Some(reopen) = on_failure {
                    reopen(field, &message);
                }
                Resolution::UpdateFailed { id, field, message }
            }
            (InFlight::Delete { id, .. }, ReplyPayload::Completed) => Resolution::Deleted(id),
            (InFlight::Delete { id, .. }, payload) => Resolution::DeleteFailed {
                id,
                message: parse_error(&failure_of(payload), None),
            },
            (InFlight::Batch { batch, .. }, ReplyPayload::Batch(value)) => {
                let outcome = parse_batch_response(&value);
                if outcome.succeeded() {
                    Resolution::BatchDeleted {
                        removed: batch.len(),
                        outcome,
                    }
                } else {
                    Resolution::BatchFailed { outcome }
                }
            }
            (InFlight::Batch { .. }, ReplyPayload::Failed(failure)) => Resolution::BatchFailed {
                outcome: BatchOutcome::failed(parse_error(&failure, None)),
            },
            (InFlight::Batch { .. }, _) => Resolution::BatchFailed {
                outcome: parse_batch_response(&serde_json::Value::Null),
            },
        };

        if resolution.is_error() {
            info!(call = %reply.call, kind, notice = %resolution.notice(), "mutation failed");
        } else {
            info!(call = %reply.call, kind, "mutation resolved");
        }
        Some(resolution)
    }

    fn ensure_idle(&self) -> Result<(), MutationError> {
        match &self.in_flight {
            Some(open) => {
                debug!(call = %open.call(), kind = open.kind(), "refusing mutation while busy");
                Err(MutationError::Busy)
            }
            None => Ok(()),
        }
    }

    fn peek_call(&self) -> CallId {
        CallId::new(self.next_call)
    }

    fn begin(&mut self, in_flight: InFlight) -> CallId {
        let call = in_flight.call();
        self.next_call += 1;
        debug!(%call, kind = in_flight.kind(), "mutation cycle started");
        self.in_flight = Some(in_flight);
        call
    }

    fn finish_dispatch(
        &mut self,
        source: &mut dyn DataSource,
        dispatched: anyhow::Result<()>,
    ) -> Result<(), MutationError> {
        let Err(error) = dispatched else {
            return Ok(());
        };
        let kind = self.in_flight.take().map_or("none", |open| open.kind());
        source.reset_changes();
        warn!(kind, error = %format!("{error:#}"), "mutation dispatch failed");
        Err(MutationError::Dispatch(format!("{error:#}")))
    }
}

/// A non-failure payload where a failure was expected still ends the cycle
/// with an error, using whatever the payload can tell us.
fn failure_of(payload: ReplyPayload) -> RemoteFailure {
    match payload {
        ReplyPayload::Failed(failure) => failure,
        other => {
            warn!(payload = ?other, "unexpected reply payload");
            RemoteFailure::default()
        }
    }
}
