//! SQLite-backed record store.
//!
//! One `records(id, body)` table holding each task as a JSON document, so the
//! store stays a document store; SQLite only contributes durability. Runtime
//! defaults are intentionally conservative:
//! - `journal_mode = WAL` to allow concurrent readers while a writer appends
//! - `busy_timeout = 5s` to reduce transient lock failures under contention
//! - `foreign_keys = ON` for future relational tables

use crate::error::{Result, StoreError};
use crate::model::task::Task;
use crate::model::task_id::TaskId;
use crate::store::feed::{ChangeFeed, ChangeKind, RecordChange};
use crate::store::RecordStore;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Latest schema version; bump together with [`MIGRATIONS`].
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_document_schema_v1",
    sql: r"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    body TEXT NOT NULL
);
",
}];

/// Durable single-file record store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Open (or create) the store at `path`, apply runtime pragmas, and
    /// migrate the schema to the latest version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if opening, configuring, or migrating
    /// the database fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create store directory {}", parent.display()))?;
        }

        let mut conn = Connection::open(path)
            .with_context(|| format!("open store database {}", path.display()))?;
        configure_connection(&conn).context("configure sqlite pragmas")?;
        migrate(&mut conn).context("apply store migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
            feed: ChangeFeed::new(),
        })
    }

    /// An in-memory database with the same schema; for tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if schema setup fails.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn).context("configure sqlite pragmas")?;
        migrate(&mut conn).context("apply store migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
            feed: ChangeFeed::new(),
        })
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

fn migrate(conn: &mut Connection) -> anyhow::Result<()> {
    let from_version = schema_version(conn)?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > from_version) {
        let tx = conn
            .transaction()
            .with_context(|| format!("begin migration {}", migration.name))?;
        tx.execute_batch(migration.sql)
            .with_context(|| format!("run migration {}", migration.name))?;
        tx.execute(
            "INSERT INTO store_meta (key, value) VALUES ('schema_version', ?1) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![migration.version.to_string()],
        )
        .with_context(|| format!("record migration {}", migration.name))?;
        tx.commit()
            .with_context(|| format!("commit migration {}", migration.name))?;
        tracing::debug!(version = migration.version, name = migration.name, "migrated");
    }
    Ok(())
}

/// Current schema version, 0 when the meta table does not exist yet.
fn schema_version(conn: &Connection) -> anyhow::Result<i64> {
    let has_meta: bool = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'store_meta')",
            [],
            |row| row.get(0),
        )
        .context("probe for store_meta table")?;
    if !has_meta {
        return Ok(0);
    }

    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .context("read schema_version")?;

    raw.map_or(Ok(0), |value| {
        value
            .parse::<i64>()
            .with_context(|| format!("parse schema_version '{value}'"))
    })
}

fn decode(body: &str) -> Result<Task> {
    let task = serde_json::from_str(body).context("decode stored task document")?;
    Ok(task)
}

impl RecordStore for SqliteStore {
    fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("sqlite connection poisoned");
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM records WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("get '{id}'"))?;
        body.as_deref().map(decode).transpose()
    }

    fn put(&self, task: &Task) -> Result<u64> {
        let new_rev = {
            let mut conn = self.conn.lock().expect("sqlite connection poisoned");
            let tx = conn
                .transaction()
                .with_context(|| format!("begin put '{}'", task.id))?;

            let stored_body: Option<String> = tx
                .query_row(
                    "SELECT body FROM records WHERE id = ?1",
                    params![task.id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .with_context(|| format!("read current revision of '{}'", task.id))?;
            let stored_rev = stored_body.as_deref().map(decode).transpose()?.map_or(0, |t| t.rev);

            if stored_rev != task.rev {
                return Err(StoreError::Conflict(task.id.clone()));
            }

            let new_rev = stored_rev + 1;
            let mut stored = task.clone();
            stored.rev = new_rev;
            let body = serde_json::to_string(&stored)
                .with_context(|| format!("encode task document '{}'", task.id))?;
            tx.execute(
                "INSERT INTO records (id, body) VALUES (?1, ?2) \
                 ON CONFLICT(id) DO UPDATE SET body = excluded.body",
                params![task.id.as_str(), body],
            )
            .with_context(|| format!("write '{}'", task.id))?;
            tx.commit()
                .with_context(|| format!("commit put '{}'", task.id))?;
            new_rev
        };

        self.feed.publish(&RecordChange {
            id: task.id.clone(),
            kind: ChangeKind::Put,
        });
        Ok(new_rev)
    }

    fn remove(&self, id: &TaskId) -> Result<()> {
        let affected = {
            let conn = self.conn.lock().expect("sqlite connection poisoned");
            conn.execute("DELETE FROM records WHERE id = ?1", params![id.as_str()])
                .with_context(|| format!("remove '{id}'"))?
        };
        if affected == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }

        self.feed.publish(&RecordChange {
            id: id.clone(),
            kind: ChangeKind::Remove,
        });
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("sqlite connection poisoned");
        let mut statement = conn
            .prepare("SELECT body FROM records")
            .context("prepare list_all")?;
        let rows = statement
            .query_map([], |row| row.get::<_, String>(0))
            .context("scan records")?;

        let mut tasks = Vec::new();
        for body in rows {
            let body = body.context("read record row")?;
            tasks.push(decode(&body)?);
        }
        Ok(tasks)
    }

    fn feed(&self) -> &ChangeFeed {
        &self.feed
    }
}
