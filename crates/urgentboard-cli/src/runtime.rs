// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::fmt::Write as _;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use tracing::{debug, info};
use urgentboard_app::{
    BoardCommand, BoardEvent, BoardSession, DataSource, EditorContinuation, FieldCatalog, FieldId,
    Item, ItemDraft, ItemId, ItemPatch, MutationOrchestrator, Reply, Resolution, SettingKey,
    SortState, format_date, persistence,
};
use urgentboard_db::{SqliteDataSource, Store};

use crate::config::Config;

/// One board session over a local store.
pub struct BoardRuntime {
    source: SqliteDataSource,
    replies: Receiver<Reply>,
    orchestrator: MutationOrchestrator,
    session: BoardSession,
}

impl BoardRuntime {
    pub fn new(store: Store, config: &Config) -> Result<Self> {
        let catalog = FieldCatalog::standard();
        let sort = initial_sort(&store, &catalog, config.default_sort())?;
        let mut session = BoardSession::new(catalog.clone(), sort);
        session.dispatch(BoardCommand::SetAllowCreate(config.allow_create()));
        session.dispatch(BoardCommand::SetAllowUpdate(config.allow_update()));
        if let Some(selected) = config.search_fields() {
            let fields = session
                .search_fields()
                .iter()
                .map(|field| field.path)
                .collect::<Vec<_>>();
            for field in fields {
                session.dispatch(BoardCommand::SelectSearchField(
                    field,
                    selected.contains(&field),
                ));
            }
        }

        let (sender, replies) = mpsc::channel();
        Ok(Self {
            source: SqliteDataSource::new(store, sender),
            replies,
            orchestrator: MutationOrchestrator::new(catalog),
            session,
        })
    }

    pub fn session(&self) -> &BoardSession {
        &self.session
    }

    pub fn store(&self) -> &Store {
        self.source.store()
    }

    /// Apply a board command, storing the sort whenever it changes.
    pub fn dispatch(&mut self, command: BoardCommand) -> Vec<BoardEvent> {
        let events = self.session.dispatch(command);
        if events
            .iter()
            .any(|event| matches!(event, BoardEvent::SortChanged(_)))
        {
            persistence::save(self.source.store(), self.session.sort().fields());
        }
        events
    }

    /// Replace the active sort with an encoded `FIELD(A);FIELD(D);` list.
    /// The new order is stored once, and only when it differs.
    pub fn replace_sort(&mut self, encoded: &str) -> Vec<BoardEvent> {
        self.dispatch(BoardCommand::ReplaceSort(persistence::decode(encoded)))
    }

    pub fn items(&mut self) -> Result<Vec<Item>> {
        let query = self.session.query();
        self.source.read(&query)
    }

    pub fn create(&mut self, draft: &ItemDraft) -> Result<Option<Resolution>> {
        if !self.session.settings.allow_create {
            bail!("creating items is disabled; set [board].allow_create = true");
        }
        self.orchestrator
            .create_record(&mut self.source, draft)
            .context("create item")?;
        self.drain()
    }

    pub fn update(&mut self, id: ItemId, patch: &ItemPatch) -> Result<Option<Resolution>> {
        if !self.session.settings.allow_update {
            bail!("editing items is disabled; set [board].allow_update = true");
        }
        let reopen: EditorContinuation = Box::new(|field: FieldId, message: &str| {
            debug!(field = field.as_str(), error = message, "edit rejected; field reopened");
        });
        self.orchestrator
            .update_record(&mut self.source, id, patch, Some(reopen))
            .with_context(|| format!("update item {id}"))?;
        self.drain()
    }

    /// `confirmed` stands in for the interactive prompt.
    pub fn delete(&mut self, ids: &[ItemId], confirmed: bool) -> Result<Option<Resolution>> {
        self.session.dispatch(BoardCommand::SetSelection(ids.len()));
        let issued = match self
            .orchestrator
            .delete_batch(&mut self.source, ids, |prompt| {
                info!(prompt, confirmed, "delete confirmation");
                confirmed
            }) {
            Ok(issued) => issued,
            Err(error) => {
                self.session.dispatch(BoardCommand::SetSelection(0));
                return Err(error).context("delete items");
            }
        };
        if issued.is_none() {
            self.session.dispatch(BoardCommand::SetSelection(0));
            return Ok(None);
        }
        self.drain()
    }

    /// Resolve every queued reply; returns the last resolution applied.
    fn drain(&mut self) -> Result<Option<Resolution>> {
        let mut last = None;
        loop {
            match self.replies.try_recv() {
                Ok(reply) => {
                    if let Some(resolution) = self.orchestrator.resolve(&mut self.source, reply) {
                        self.session.apply_resolution(&resolution);
                        last = Some(resolution);
                    }
                }
                Err(TryRecvError::Empty) => return Ok(last),
                Err(TryRecvError::Disconnected) => {
                    bail!("reply channel closed; restart the board session")
                }
            }
        }
    }
}

fn initial_sort(
    store: &Store,
    catalog: &FieldCatalog,
    default_sort: Option<&str>,
) -> Result<SortState> {
    match default_sort {
        Some(raw) if store.get_setting(SettingKey::Sort)?.is_none() => Ok(SortState::initialize(
            catalog,
            Some(&persistence::decode(raw)),
        )),
        _ => Ok(persistence::load(store, catalog)),
    }
}

const LISTED_COLUMNS: [FieldId; 7] = [
    FieldId::Material,
    FieldId::Description,
    FieldId::Type,
    FieldId::Quantity,
    FieldId::DueDate,
    FieldId::DeliverTo,
    FieldId::EnteredByName,
];

fn cell(item: &Item, field: FieldId) -> String {
    match field {
        FieldId::Type => {
            let order = item.order_text();
            if order.is_empty() {
                item.order_type.label().to_owned()
            } else {
                format!("{} {order}", item.order_type.as_str())
            }
        }
        FieldId::Quantity => item.quantity_text(),
        FieldId::DueDate => item.due_date.map(format_date).unwrap_or_default(),
        other => item.value(other).display(),
    }
}

/// Tab-separated listing with a header row.
pub fn render_items(catalog: &FieldCatalog, items: &[Item]) -> String {
    let mut out = String::from("id");
    for field in LISTED_COLUMNS {
        out.push('\t');
        out.push_str(catalog.label(field));
    }
    out.push('\n');
    for item in items {
        let _ = write!(out, "{}", item.id);
        for field in LISTED_COLUMNS {
            out.push('\t');
            out.push_str(&cell(item, field));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{BoardRuntime, render_items};
    use crate::config::Config;
    use anyhow::Result;
    use urgentboard_app::{
        BoardCommand, FieldCatalog, FieldId, FieldValue, ItemId, ItemPatch, Resolution,
        SettingKey, SortDirection, SortKey,
    };
    use std::sync::mpsc;
    use urgentboard_db::Store;
    use urgentboard_testkit::fixture_draft;

    fn runtime_with(config: &Config) -> Result<BoardRuntime> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        store.create_item(&fixture_draft("100-2040", "Gasket"))?;
        store.create_item(&fixture_draft("150-4410", "Valve"))?;
        store.create_item(&fixture_draft("120-7781", "Filter"))?;
        BoardRuntime::new(store, config)
    }

    #[test]
    fn replace_sort_orders_listing_and_is_stored() -> Result<()> {
        let mut runtime = runtime_with(&Config::default())?;
        runtime.replace_sort("MATERIAL(D);");

        let materials = runtime
            .items()?
            .into_iter()
            .map(|item| item.material)
            .collect::<Vec<_>>();
        assert_eq!(materials, vec!["150-4410", "120-7781", "100-2040"]);
        assert_eq!(
            runtime.store().get_setting(SettingKey::Sort)?.as_deref(),
            Some("MATERIAL(D);")
        );
        Ok(())
    }

    #[test]
    fn default_sort_applies_only_without_stored_preference() -> Result<()> {
        let mut config = Config::default();
        config.board.default_sort = Some("DESCRIPTION(A);".to_owned());
        let runtime = runtime_with(&config)?;
        assert_eq!(
            runtime.session().sort().sort_keys(),
            vec![SortKey {
                path: FieldId::Description,
                direction: SortDirection::Asc,
            }]
        );

        let store = Store::open_memory()?;
        store.bootstrap()?;
        store.put_setting(SettingKey::Sort, "MATERIAL(A);")?;
        let runtime = BoardRuntime::new(store, &config)?;
        assert_eq!(
            runtime.session().sort().sort_keys()[0].path,
            FieldId::Material
        );
        Ok(())
    }

    #[test]
    fn search_narrows_listing() -> Result<()> {
        let mut runtime = runtime_with(&Config::default())?;
        runtime.dispatch(BoardCommand::Search("valve".to_owned()));
        let items = runtime.items()?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Valve");
        Ok(())
    }

    #[test]
    fn configured_search_fields_replace_defaults() -> Result<()> {
        let mut config = Config::default();
        config.board.search_fields = Some(vec!["material".to_owned()]);
        let mut runtime = runtime_with(&config)?;
        runtime.dispatch(BoardCommand::Search("valve".to_owned()));
        assert!(runtime.items()?.is_empty());

        runtime.dispatch(BoardCommand::Search("150-".to_owned()));
        assert_eq!(runtime.items()?.len(), 1);
        Ok(())
    }

    #[test]
    fn batch_delete_reports_partial_failure() -> Result<()> {
        let mut runtime = runtime_with(&Config::default())?;
        let resolution = runtime.delete(&[ItemId::new(1), ItemId::new(77)], true)?;
        let Some(Resolution::BatchFailed { outcome }) = resolution else {
            panic!("partial failure expected, got {resolution:?}");
        };
        assert_eq!(
            outcome.aggregate_error_message.as_deref(),
            Some("Item 77 does not exist")
        );
        assert_eq!(runtime.items()?.len(), 2);
        assert_eq!(
            runtime.session().status_line.as_deref(),
            Some("Item 77 does not exist")
        );
        Ok(())
    }

    #[test]
    fn replace_sort_stores_final_order_once() -> Result<()> {
        let mut runtime = runtime_with(&Config::default())?;
        runtime.replace_sort("DUEDATE(A);MATERIAL(D);");

        let events = runtime.replace_sort("MATERIAL(A);DESCRIPTION(D);MATERIAL(D);");
        assert_eq!(events.len(), 1);
        assert_eq!(
            runtime.store().get_setting(SettingKey::Sort)?.as_deref(),
            Some("MATERIAL(A);DESCRIPTION(D);")
        );
        assert!(runtime.replace_sort("MATERIAL(A);DESCRIPTION(D);").is_empty());
        Ok(())
    }

    #[test]
    fn failed_delete_dispatch_clears_selection() -> Result<()> {
        let mut runtime = runtime_with(&Config::default())?;
        let (_sender, closed) = mpsc::channel();
        runtime.replies = closed;

        let error = runtime
            .delete(&[ItemId::new(1), ItemId::new(2)], true)
            .expect_err("reply channel is gone");
        assert!(format!("{error:#}").contains("reply channel closed"));
        assert_eq!(runtime.session().selected_count, 0);
        assert!(runtime.session().create_button_visible());
        Ok(())
    }

    #[test]
    fn declined_delete_leaves_items() -> Result<()> {
        let mut runtime = runtime_with(&Config::default())?;
        assert!(runtime.delete(&[ItemId::new(1)], false)?.is_none());
        assert_eq!(runtime.items()?.len(), 3);
        assert_eq!(runtime.session().selected_count, 0);
        Ok(())
    }

    #[test]
    fn update_round_trips_through_orchestrator() -> Result<()> {
        let mut runtime = runtime_with(&Config::default())?;
        let patch = ItemPatch::new(FieldId::Comments, FieldValue::Text("rush".to_owned()));
        let resolution = runtime.update(ItemId::new(2), &patch)?;
        assert!(matches!(resolution, Some(Resolution::Updated { .. })));
        assert_eq!(runtime.store().get_item(ItemId::new(2))?.comments, "rush");

        let failed = runtime.update(ItemId::new(99), &patch)?;
        assert!(matches!(failed, Some(Resolution::UpdateFailed { .. })));
        Ok(())
    }

    #[test]
    fn create_respects_allow_create() -> Result<()> {
        let mut config = Config::default();
        config.board.allow_create = Some(false);
        let mut runtime = runtime_with(&config)?;
        let error = runtime
            .create(&fixture_draft("300-0001", "New"))
            .expect_err("create should be disabled");
        assert!(error.to_string().contains("allow_create"));

        let mut runtime = runtime_with(&Config::default())?;
        let created = runtime.create(&fixture_draft("300-0001", "New"))?;
        assert!(matches!(created, Some(Resolution::Created(_))));
        assert_eq!(runtime.items()?.len(), 4);
        Ok(())
    }

    #[test]
    fn render_items_lists_header_and_rows() -> Result<()> {
        let mut runtime = runtime_with(&Config::default())?;
        let items = runtime.items()?;
        let rendered = render_items(&FieldCatalog::standard(), &items);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("id\t"));
        assert!(lines[1..].iter().any(|line| line.contains("100-2040")));
        Ok(())
    }
}
