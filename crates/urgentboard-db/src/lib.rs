// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod data_source;
pub mod validation;

pub use data_source::SqliteDataSource;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::warn;
use urgentboard_app::{
    Item, ItemDraft, ItemId, ItemPatch, ItemQuery, OrderType, SettingKey, SettingsStore,
    format_date,
};

pub const APP_NAME: &str = "urgentboard";
/// Listings return at most this many rows.
pub const MAX_QUERY_ROWS: usize = 500;

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "items",
        &[
            "id",
            "material",
            "description",
            "order_type",
            "object_key",
            "line",
            "quantity",
            "unlimited_quantity",
            "quantity_issued",
            "uom",
            "due_date",
            "deliver_to",
            "comments",
            "entered_by_name",
            "supplier_name",
            "created_at",
            "updated_at",
        ],
    ),
    ("settings", &["key", "value", "updated_at"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_items_material",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_items_material ON items (material);",
    },
    RequiredIndex {
        name: "idx_items_due_date",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_items_due_date ON items (due_date);",
    },
];

const ITEM_COLUMNS: &str = "
  id, material, description, order_type, object_key, line,
  quantity, unlimited_quantity, quantity_issued, uom, due_date,
  deliver_to, comments, entered_by_name, supplier_name,
  created_at, updated_at
";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)
    }

    pub fn create_item(&self, draft: &ItemDraft) -> Result<ItemId> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO items (
                  material, description, order_type, object_key, line,
                  quantity, unlimited_quantity, quantity_issued, uom, due_date,
                  deliver_to, comments, entered_by_name, supplier_name,
                  created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    draft.material,
                    draft.description,
                    draft.order_type.as_str(),
                    draft.object_key,
                    draft.line,
                    draft.quantity,
                    draft.unlimited_quantity,
                    draft.quantity_issued,
                    draft.uom,
                    draft.due_date.map(format_date),
                    draft.deliver_to,
                    draft.comments,
                    draft.entered_by_name,
                    draft.supplier_name,
                    now,
                    now,
                ],
            )
            .context("insert item")?;

        Ok(ItemId::new(self.conn.last_insert_rowid()))
    }

    pub fn find_item(&self, item_id: ItemId) -> Result<Option<Item>> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"),
                params![item_id.get()],
                item_from_row,
            )
            .optional()
            .with_context(|| format!("load item {item_id}"))
    }

    pub fn get_item(&self, item_id: ItemId) -> Result<Item> {
        self.find_item(item_id)?.ok_or_else(|| {
            anyhow!("item {item_id} not found -- list the board to pick an existing item")
        })
    }

    /// Applies one field edit. `None` when the item does not exist.
    pub fn update_item(&self, item_id: ItemId, patch: &ItemPatch) -> Result<Option<Item>> {
        let Some(item) = self.find_item(item_id)? else {
            return Ok(None);
        };
        let mut draft = item.draft();
        draft
            .set(patch.field, patch.value.clone())
            .with_context(|| format!("edit item {item_id}"))?;

        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                UPDATE items
                SET
                  material = ?,
                  description = ?,
                  order_type = ?,
                  object_key = ?,
                  line = ?,
                  quantity = ?,
                  unlimited_quantity = ?,
                  quantity_issued = ?,
                  uom = ?,
                  due_date = ?,
                  deliver_to = ?,
                  comments = ?,
                  entered_by_name = ?,
                  supplier_name = ?,
                  updated_at = ?
                WHERE id = ?
                ",
                params![
                    draft.material,
                    draft.description,
                    draft.order_type.as_str(),
                    draft.object_key,
                    draft.line,
                    draft.quantity,
                    draft.unlimited_quantity,
                    draft.quantity_issued,
                    draft.uom,
                    draft.due_date.map(format_date),
                    draft.deliver_to,
                    draft.comments,
                    draft.entered_by_name,
                    draft.supplier_name,
                    now,
                    item_id.get(),
                ],
            )
            .with_context(|| format!("update item {item_id}"))?;

        self.find_item(item_id)
    }

    /// `false` when there was nothing to delete.
    pub fn delete_item(&self, item_id: ItemId) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM items WHERE id = ?", params![item_id.get()])
            .with_context(|| format!("delete item {item_id}"))?;
        Ok(rows_affected > 0)
    }

    pub fn count_items(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .context("count items")?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Filtered, sorted listing. Ties fall back to the item id. At most
    /// [`MAX_QUERY_ROWS`] items come back; a cut listing is logged.
    pub fn list_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let mut sql = format!("SELECT {ITEM_COLUMNS} FROM items");
        let mut clauses = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if !query.filter.text_filters.is_empty() {
            let group = query
                .filter
                .text_filters
                .iter()
                .map(|filter| {
                    values.push(SqlValue::Text(format!("%{}%", escape_like(&filter.contains))));
                    format!("{} LIKE ? ESCAPE '\\'", filter.path.column())
                })
                .collect::<Vec<_>>();
            clauses.push(format!("({})", group.join(" OR ")));
        }

        if let Some(range) = query.filter.date_range {
            let column = range.path.column();
            clauses.push(format!("{column} IS NOT NULL"));
            if let Some(from) = range.from {
                clauses.push(format!("{column} >= ?"));
                values.push(SqlValue::Text(format_date(from.date())));
            }
            if let Some(to) = range.to {
                clauses.push(format!("{column} <= ?"));
                values.push(SqlValue::Text(format_date(to.date())));
            }
        }

        if !query.filter.presets.is_empty() {
            let group = query
                .filter
                .presets
                .iter()
                .map(|preset| {
                    values.push(SqlValue::Text(preset.equals.clone()));
                    format!("{} = ?", preset.path.column())
                })
                .collect::<Vec<_>>();
            clauses.push(format!("({})", group.join(" OR ")));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut order = query
            .sort
            .iter()
            .map(|key| {
                format!(
                    "{} {}",
                    key.path.column(),
                    key.direction.label().to_ascii_uppercase()
                )
            })
            .collect::<Vec<_>>();
        order.push("id ASC".to_owned());
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));
        sql.push_str(&format!(" LIMIT {}", MAX_QUERY_ROWS + 1));

        let mut stmt = self.conn.prepare(&sql).context("prepare items query")?;
        let rows = stmt
            .query_map(params_from_iter(values), item_from_row)
            .context("query items")?;
        let mut items = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect items")?;
        if items.len() > MAX_QUERY_ROWS {
            items.truncate(MAX_QUERY_ROWS);
            warn!(
                shown = MAX_QUERY_ROWS,
                "listing truncated; narrow the search or date range to see the rest"
            );
        }
        Ok(items)
    }

    pub fn get_setting(&self, key: SettingKey) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {}", key.as_str()))
    }

    pub fn put_setting(&self, key: SettingKey, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key.as_str(), value, now],
            )
            .with_context(|| format!("upsert setting {}", key.as_str()))?;
        Ok(())
    }
}

impl SettingsStore for Store {
    fn read_setting(&self, key: SettingKey) -> Result<Option<String>> {
        self.get_setting(key)
    }

    fn write_setting(&self, key: SettingKey, value: &str) -> Result<()> {
        self.put_setting(key, value)
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("URGENTBOARD_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!(
            "cannot resolve data directory; set URGENTBOARD_DB_PATH to a writable database path"
        )
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("urgentboard.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let order_type_raw: String = row.get(3)?;
    let order_type = OrderType::parse(&order_type_raw).ok_or_else(|| {
        to_sql_error(anyhow!("unknown order type {order_type_raw:?}"))
    })?;
    let due_date_raw: Option<String> = row.get(10)?;
    let created_at_raw: String = row.get(15)?;
    let updated_at_raw: String = row.get(16)?;

    Ok(Item {
        id: ItemId::new(row.get(0)?),
        material: row.get(1)?,
        description: row.get(2)?,
        order_type,
        object_key: row.get(4)?,
        line: row.get(5)?,
        quantity: row.get(6)?,
        unlimited_quantity: row.get(7)?,
        quantity_issued: row.get(8)?,
        uom: row.get(9)?,
        due_date: parse_opt_date(due_date_raw).map_err(to_sql_error)?,
        deliver_to: row.get(11)?,
        comments: row.get(12)?,
        entered_by_name: row.get(13)?,
        supplier_name: row.get(14)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
    })
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point URGENTBOARD_DB_PATH at an urgentboard database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; recreate the database or add the columns",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; recreate the database",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn parse_date(raw: &str) -> Result<Date> {
    if let Ok(value) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Ok(value);
    }

    // Imported rows may carry a full timestamp; keep the day.
    let date_time = parse_datetime(raw)?;
    Ok(date_time.date())
}

fn parse_opt_date(raw: Option<String>) -> Result<Option<Date>> {
    raw.as_deref().map(parse_date).transpose()
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}
