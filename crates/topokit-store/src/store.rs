//! Project store backed by a single SQLite connection.

use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use topokit_core::{NewProject, Project, StoreError};
use tracing::{debug, info};

/// Schema applied on every open; safe to run repeatedly
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    settings JSON,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
";

/// `settings` has NUMERIC affinity, so scalar JSON comes back as INTEGER or
/// REAL unless read as text
const SELECT_PROJECT: &str =
    "SELECT id, name, description, CAST(settings AS TEXT), created_at, updated_at FROM projects";

/// SQLite's `CURRENT_TIMESTAMP` layout, always UTC
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type RawRow = (
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Project persistence
#[derive(Debug)]
pub struct ProjectStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl ProjectStore {
    /// Open (or create) the database file and apply the schema
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let open_err = |reason: String| StoreError::Open {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| open_err(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(|e| open_err(e.to_string()))?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        info!("Database initialized at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All projects, newest first
    ///
    /// Rows sharing a creation second are ordered by descending id.
    pub fn list(&self) -> Result<Vec<Project>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "{} ORDER BY created_at DESC, id DESC",
                SELECT_PROJECT
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], read_row)
            .map_err(db_err)?
            .collect::<Result<Vec<RawRow>, _>>()
            .map_err(db_err)?;

        let projects = rows
            .into_iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Listed {} projects", projects.len());
        Ok(projects)
    }

    /// Insert a project row and return it as stored
    pub fn insert(&self, project: &NewProject) -> Result<Project, StoreError> {
        let settings = match &project.settings {
            serde_json::Value::Null => None,
            value => Some(value.to_string()),
        };
        let created_at = project
            .created_at
            .map(|at| at.format(TIMESTAMP_FORMAT).to_string());

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO projects (name, description, settings, created_at, updated_at)
             VALUES (?1, ?2, ?3,
                     COALESCE(?4, CURRENT_TIMESTAMP),
                     COALESCE(?4, CURRENT_TIMESTAMP))",
            params![project.name, project.description, settings, created_at],
        )
        .map_err(db_err)?;
        let id = conn.last_insert_rowid();

        let raw = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_PROJECT),
                params![id],
                read_row,
            )
            .map_err(db_err)?;
        drop(conn);

        let stored = decode_row(raw)?;
        info!("Inserted project {} ({})", stored.id, stored.name);
        Ok(stored)
    }

    /// Number of stored projects
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count.max(0) as usize)
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database {
        reason: e.to_string(),
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode_row(raw: RawRow) -> Result<Project, StoreError> {
    let (id, name, description, settings, created_at, updated_at) = raw;

    let settings = match settings {
        Some(text) => serde_json::from_str(&text).map_err(|e| StoreError::CorruptRow {
            id,
            reason: format!("settings: {}", e),
        })?,
        None => serde_json::Value::Null,
    };

    let created_at = parse_timestamp(id, "created_at", created_at.as_deref())?;
    let updated_at = match updated_at.as_deref() {
        Some(text) => parse_timestamp(id, "updated_at", Some(text))?,
        None => created_at,
    };

    Ok(Project {
        id,
        name,
        description,
        settings,
        created_at,
        updated_at,
    })
}

fn parse_timestamp(id: i64, column: &str, text: Option<&str>) -> Result<DateTime<Utc>, StoreError> {
    let corrupt = |reason: String| StoreError::CorruptRow {
        id,
        reason: format!("{}: {}", column, reason),
    };

    let text = text.ok_or_else(|| corrupt("missing".to_string()))?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| corrupt(format!("'{}' ({})", text, e)))
}
