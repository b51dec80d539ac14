//! SQLite-backed transcript store.

use crate::store::TranscriptStore;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use syncpro_core::{Exchange, SyncproError, SyncproResult, DEFAULT_USER};
use tracing::{debug, info};

/// Schema for the transcript table. Every statement is idempotent.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chat_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user VARCHAR(64) NOT NULL DEFAULT 'default_user',
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    model VARCHAR(128) NOT NULL,
    lang VARCHAR(16) NOT NULL,
    timestamp TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%f000Z', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_chat_history_timestamp ON chat_history(timestamp, id);
"#;

/// Where the database lives, parsed from a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// A private in-memory database, gone when the store is dropped.
    Memory,
    /// A database file, created on first open.
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parses `sqlite://path`, `sqlite:path`, `sqlite::memory:`, `:memory:`
    /// or a bare filesystem path.
    pub fn parse(url: &str) -> SyncproResult<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SyncproError::Config("database URL is empty".into()));
        }

        let rest = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        if rest == ":memory:" {
            return Ok(Self::Memory);
        }
        if rest.contains("://") {
            return Err(SyncproError::Config(format!(
                "unsupported database URL '{url}': only SQLite is supported"
            )));
        }

        // Connection-string options (`?mode=rwc`) have no meaning here.
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() {
            return Err(SyncproError::Config(format!(
                "database URL '{url}' has no path"
            )));
        }
        Ok(Self::File(PathBuf::from(path)))
    }
}

/// Transcript store on a single SQLite connection.
///
/// The connection is opened eagerly; the schema is created lazily on the
/// first operation and only once per store instance. Blocking SQLite calls
/// run on the tokio blocking pool.
#[derive(Clone)]
pub struct SqliteTranscriptStore {
    conn: Arc<Mutex<Connection>>,
    schema_ready: Arc<AtomicBool>,
    user: String,
    location: DatabaseLocation,
}

impl SqliteTranscriptStore {
    /// Opens the store described by a database URL.
    pub fn open(database_url: &str) -> SyncproResult<Self> {
        match DatabaseLocation::parse(database_url)? {
            DatabaseLocation::Memory => Self::open_in_memory(),
            DatabaseLocation::File(path) => Self::open_path(&path),
        }
    }

    /// Opens (or creates) a database file. Parent directories are created.
    pub fn open_path(path: &Path) -> SyncproResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(|e| {
            SyncproError::Persistence(format!(
                "opening transcript database {}: {e}",
                path.display()
            ))
        })?;
        info!(path = %path.display(), "Transcript database opened");
        Ok(Self::from_connection(
            conn,
            DatabaseLocation::File(path.to_path_buf()),
        ))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> SyncproResult<Self> {
        let conn = Connection::open_in_memory().map_err(persistence)?;
        Ok(Self::from_connection(conn, DatabaseLocation::Memory))
    }

    fn from_connection(conn: Connection, location: DatabaseLocation) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            schema_ready: Arc::new(AtomicBool::new(false)),
            user: DEFAULT_USER.to_string(),
            location,
        }
    }

    /// Sets the value written to the `user` column.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// Runs `f` against the connection on the blocking pool, after making
    /// sure the schema exists.
    async fn run<T, F>(&self, f: F) -> SyncproResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let schema_ready = Arc::clone(&self.schema_ready);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            let conn: &Connection = &guard;
            ensure_schema(conn, &schema_ready)?;
            f(conn)
        })
        .await
        .map_err(|e| SyncproError::Persistence(format!("store task failed: {e}")))?
        .map_err(persistence)
    }
}

/// Creates the schema unless this store already did. Called with the
/// connection lock held, so the sentinel cannot race.
fn ensure_schema(conn: &Connection, schema_ready: &AtomicBool) -> rusqlite::Result<()> {
    if schema_ready.load(Ordering::Acquire) {
        return Ok(());
    }
    conn.execute_batch(SCHEMA)?;
    schema_ready.store(true, Ordering::Release);
    debug!("Transcript schema initialized");
    Ok(())
}

fn persistence(e: rusqlite::Error) -> SyncproError {
    SyncproError::Persistence(e.to_string())
}

/// Fixed-width RFC 3339 so that text ordering equals time ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn append(&self, exchange: &Exchange) -> SyncproResult<()> {
        let user = self.user.clone();
        let ts = format_timestamp(exchange.timestamp.unwrap_or_else(Utc::now));
        let exchange = exchange.clone();
        self.run(move |conn| {
            // MAX() keeps timestamps non-decreasing even if the clock steps back.
            conn.execute(
                "INSERT INTO chat_history (user, question, answer, model, lang, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5,
                         MAX(?6, COALESCE((SELECT MAX(timestamp) FROM chat_history), ?6)))",
                params![
                    user,
                    exchange.question,
                    exchange.answer,
                    exchange.model_label,
                    exchange.language,
                    ts
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_all(&self) -> SyncproResult<Vec<Exchange>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT question, answer, model, lang, timestamp
                 FROM chat_history
                 ORDER BY timestamp ASC, id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                let raw_ts: String = row.get(4)?;
                Ok(Exchange {
                    question: row.get(0)?,
                    answer: row.get(1)?,
                    model_label: row.get(2)?,
                    language: row.get(3)?,
                    timestamp: Some(parse_timestamp(4, &raw_ts)?),
                })
            })?;
            let exchanges = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(exchanges)
        })
        .await
    }

    async fn clear_all(&self) -> SyncproResult<()> {
        let removed = self
            .run(|conn| conn.execute("DELETE FROM chat_history", []))
            .await?;
        info!(removed, "Transcript cleared");
        Ok(())
    }
}
