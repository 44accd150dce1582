// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::sync::mpsc;
use time::macros::date;
use urgentboard_app::{
    CallId, DataSource, FieldCatalog, FieldId, FieldValue, GroupId, ItemId, ItemPatch, ItemQuery,
    MutationBatch, Operation, ReplyPayload, SearchField, SortDirection, SortKey, compose,
    compose_presets, parse_batch_response,
};
use urgentboard_db::{MAX_QUERY_ROWS, SqliteDataSource, Store, validate_db_path};
use urgentboard_testkit::{ItemFaker, fixture_draft, temp_db_path};

fn seeded_store() -> Result<Store> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.create_item(&fixture_draft("100-2040", "Gasket, spiral wound"))?;
    store.create_item(&urgentboard_app::ItemDraft {
        due_date: Some(date!(2026 - 02 - 10)),
        entered_by_name: "Jordan Reed".to_owned(),
        ..fixture_draft("150-4410", "Valve, ball")
    })?;
    store.create_item(&urgentboard_app::ItemDraft {
        due_date: None,
        ..fixture_draft("100-2210", "Bearing 6204")
    })?;
    Ok(store)
}

fn materials(items: &[urgentboard_app::Item]) -> Vec<&str> {
    items.iter().map(|item| item.material.as_str()).collect()
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("/tmp/urgentboard.db").is_ok());
}

#[test]
fn bootstrap_is_idempotent_on_disk() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.create_item(&fixture_draft("100-2040", "Gasket"))?;
    }
    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert_eq!(store.count_items()?, 1);
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    store.raw_connection().execute_batch(
        "
            DROP TABLE settings;
            CREATE TABLE settings (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );
            ",
    )?;

    let err = store
        .bootstrap()
        .expect_err("schema validation should fail");
    let message = err.to_string();
    assert!(message.contains("table `settings` is missing required columns"));
    assert!(message.contains("updated_at"));
    Ok(())
}

#[test]
fn create_and_load_item_round_trips_fields() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let mut faker = ItemFaker::new(11);
    let draft = faker.item_draft();
    let id = store.create_item(&draft)?;
    let item = store.get_item(id)?;
    assert_eq!(item.draft(), draft);
    assert!(store.find_item(ItemId::new(id.get() + 100))?.is_none());
    Ok(())
}

#[test]
fn text_filters_are_or_combined_and_case_insensitive() -> Result<()> {
    let store = seeded_store()?;
    let fields = vec![
        SearchField {
            path: FieldId::Material,
            selected: true,
        },
        SearchField {
            path: FieldId::EnteredByName,
            selected: true,
        },
    ];

    let composed = compose(&fields, Some("REED"), None, None);
    let items = store.list_items(&ItemQuery {
        filter: composed.filter,
        sort: Vec::new(),
    })?;
    assert_eq!(materials(&items), vec!["150-4410"]);

    let composed = compose(&fields, Some("100-"), None, None);
    let items = store.list_items(&ItemQuery {
        filter: composed.filter,
        sort: Vec::new(),
    })?;
    assert_eq!(materials(&items), vec!["100-2040", "100-2210"]);
    Ok(())
}

#[test]
fn date_range_and_presets_narrow_results() -> Result<()> {
    let store = seeded_store()?;

    let composed = compose(&[], None, Some(date!(2026 - 02 - 10)), None);
    let items = store.list_items(&ItemQuery {
        filter: composed.filter,
        sort: Vec::new(),
    })?;
    assert_eq!(materials(&items), vec!["150-4410"]);

    let mut composed = compose(&[], None, None, Some(date!(2026 - 01 - 31)));
    composed.filter.presets = compose_presets(&["100-2040".to_owned(), "150-4410".to_owned()], &[]);
    let items = store.list_items(&ItemQuery {
        filter: composed.filter,
        sort: Vec::new(),
    })?;
    assert_eq!(materials(&items), vec!["100-2040"]);
    Ok(())
}

#[test]
fn sort_keys_drive_order_with_id_tiebreak() -> Result<()> {
    let store = seeded_store()?;
    let query = ItemQuery {
        filter: Default::default(),
        sort: vec![SortKey {
            path: FieldId::Material,
            direction: SortDirection::Desc,
        }],
    };
    assert_eq!(
        materials(&store.list_items(&query)?),
        vec!["150-4410", "100-2210", "100-2040"]
    );

    let by_contact = ItemQuery {
        filter: Default::default(),
        sort: vec![SortKey {
            path: FieldId::EnteredByName,
            direction: SortDirection::Asc,
        }],
    };
    assert_eq!(
        materials(&store.list_items(&by_contact)?),
        vec!["100-2040", "100-2210", "150-4410"]
    );
    Ok(())
}

#[test]
fn listing_stops_at_row_cap() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    for index in 0..=MAX_QUERY_ROWS {
        store.create_item(&fixture_draft(&format!("900-{index:04}"), "Shim"))?;
    }

    let items = store.list_items(&ItemQuery::default())?;
    assert_eq!(items.len(), MAX_QUERY_ROWS);
    assert_eq!(items[0].material, "900-0000");
    assert_eq!(
        items.last().map(|item| item.id),
        Some(ItemId::new(MAX_QUERY_ROWS as i64))
    );
    Ok(())
}

#[test]
fn like_wildcards_match_literally() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.create_item(&fixture_draft("100_200", "Underscore"))?;
    store.create_item(&fixture_draft("1000200", "Digits"))?;

    let fields = [SearchField {
        path: FieldId::Material,
        selected: true,
    }];
    let composed = compose(&fields, Some("0_2"), None, None);
    let items = store.list_items(&ItemQuery {
        filter: composed.filter,
        sort: Vec::new(),
    })?;
    assert_eq!(materials(&items), vec!["100_200"]);
    Ok(())
}

#[test]
fn data_source_replies_over_channel() -> Result<()> {
    let (sender, receiver) = mpsc::channel();
    let mut source = SqliteDataSource::new(seeded_store()?, sender);

    source.update(
        CallId::new(1),
        ItemId::new(1),
        &ItemPatch::new(FieldId::Comments, FieldValue::Text("rush".to_owned())),
    )?;
    let reply = receiver.recv()?;
    assert_eq!(reply.call, CallId::new(1));
    assert_eq!(reply.payload, ReplyPayload::Completed);
    assert_eq!(source.store().get_item(ItemId::new(1))?.comments, "rush");

    source.remove(CallId::new(2), ItemId::new(99))?;
    let reply = receiver.recv()?;
    let ReplyPayload::Failed(failure) = reply.payload else {
        panic!("missing item should fail");
    };
    assert_eq!(failure.status_code, Some(404));
    assert_eq!(
        urgentboard_app::parse_error(&failure, None),
        "Item 99 does not exist"
    );
    Ok(())
}

#[test]
fn update_with_wrong_value_kind_is_rejected() -> Result<()> {
    let (sender, receiver) = mpsc::channel();
    let mut source = SqliteDataSource::new(seeded_store()?, sender);

    source.update(
        CallId::new(5),
        ItemId::new(1),
        &ItemPatch::new(FieldId::Quantity, FieldValue::Text("lots".to_owned())),
    )?;
    let ReplyPayload::Failed(failure) = receiver.recv()?.payload else {
        panic!("kind mismatch should fail");
    };
    assert_eq!(failure.status_code, Some(400));
    Ok(())
}

#[test]
fn batch_delete_reports_missing_items_without_rollback() -> Result<()> {
    let (sender, receiver) = mpsc::channel();
    let mut source = SqliteDataSource::new(seeded_store()?, sender);

    let batch = MutationBatch::deletes(
        GroupId::new("removeSelectedItems-1"),
        &[ItemId::new(1), ItemId::new(42), ItemId::new(3)],
    );
    source.submit_changes(CallId::new(9), &batch)?;
    assert_eq!(
        source.submitted_group().map(GroupId::as_str),
        Some("removeSelectedItems-1")
    );

    let ReplyPayload::Batch(value) = receiver.recv()?.payload else {
        panic!("batch reply expected");
    };
    let outcome = parse_batch_response(&value);
    assert_eq!(
        outcome.aggregate_error_message.as_deref(),
        Some("Item 42 does not exist")
    );
    assert_eq!(outcome.success_count(), 2);
    assert_eq!(source.store().count_items()?, 1);

    source.reset_changes();
    assert!(source.submitted_group().is_none());
    Ok(())
}

#[test]
fn batch_create_and_update_operations() -> Result<()> {
    let (sender, receiver) = mpsc::channel();
    let mut source = SqliteDataSource::new(seeded_store()?, sender);

    let mut batch = MutationBatch::new(GroupId::new("mixed"));
    batch
        .operations
        .push(Operation::Create(fixture_draft("300-0001", "New part")));
    batch.operations.push(Operation::Update(
        ItemId::new(2),
        ItemPatch::new(FieldId::DueDate, FieldValue::Date(None)),
    ));
    source.submit_changes(CallId::new(1), &batch)?;

    let ReplyPayload::Batch(value) = receiver.recv()?.payload else {
        panic!("batch reply expected");
    };
    assert!(parse_batch_response(&value).succeeded());
    assert_eq!(source.store().count_items()?, 4);
    assert_eq!(source.store().get_item(ItemId::new(2))?.due_date, None);

    let catalog = FieldCatalog::standard();
    assert!(catalog.is_sortable(FieldId::DueDate));
    Ok(())
}

#[test]
fn settings_survive_reopen() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.put_setting(urgentboard_app::SettingKey::Sort, "MATERIAL(A);")?;
    }
    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert_eq!(
        store.get_setting(urgentboard_app::SettingKey::Sort)?.as_deref(),
        Some("MATERIAL(A);")
    );
    Ok(())
}
