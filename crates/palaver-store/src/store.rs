//! DraftStore: a keyed durable map from `draft_id` to record, with an
//! index on `parent_draft_id`. Backed by SQLite (rusqlite); blocking calls
//! are pushed onto `spawn_blocking` so the main scheduler never stalls on
//! disk I/O.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use palaver_core::types::{Draft, DraftId};
use palaver_foundation::error::{PalaverError, StoreError};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::record::{DraftFamily, DraftRecord, Order};
use crate::side_files::write_side_files;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS drafts (
    draft_id TEXT PRIMARY KEY,
    parent_draft_id TEXT,
    timestamp REAL NOT NULL,
    audio_start_time REAL NOT NULL,
    audio_end_time REAL NOT NULL,
    start_text TEXT NOT NULL,
    end_text TEXT NOT NULL,
    full_text TEXT NOT NULL,
    directory_path TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_drafts_parent ON drafts(parent_draft_id);
CREATE INDEX IF NOT EXISTS idx_drafts_timestamp ON drafts(timestamp);
";

pub struct DraftStore {
    conn: Arc<Mutex<Connection>>,
    enable_file_storage: bool,
    side_file_dir: Option<PathBuf>,
}

impl DraftStore {
    /// Opens (creating if absent) the SQLite file at `db_path`. Side-file
    /// writing only ever happens when `enable_file_storage` is true; the
    /// pipeline must function identically with it false.
    pub fn open(
        db_path: impl AsRef<Path>,
        enable_file_storage: bool,
        side_file_dir: Option<PathBuf>,
    ) -> Result<Self, PalaverError> {
        let conn = Connection::open(db_path)
            .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            enable_file_storage,
            side_file_dir,
        })
    }

    /// In-memory store, for tests and for the rescanner's local bookkeeping.
    pub fn open_in_memory() -> Result<Self, PalaverError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            enable_file_storage: false,
            side_file_dir: None,
        })
    }

    /// Inserts `draft`. Fails with `DuplicateId` if `draft_id` already
    /// exists, or `ParentNotFound` if `parent_draft_id` is set but absent.
    pub async fn put(&self, draft: Draft) -> Result<(), PalaverError> {
        let conn = self.conn.clone();
        let directory_path = if self.enable_file_storage {
            let base = self
                .side_file_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            Some(write_side_files(&base, &draft)?)
        } else {
            None
        };

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM drafts WHERE draft_id = ?1",
                    params![draft.draft_id.to_string()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
            if exists.is_some() {
                return Err(PalaverError::Store(StoreError::DuplicateId(
                    draft.draft_id.to_string(),
                )));
            }

            if let Some(parent_id) = draft.parent_draft_id {
                let parent_exists: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM drafts WHERE draft_id = ?1",
                        params![parent_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
                if parent_exists.is_none() {
                    return Err(PalaverError::Store(StoreError::ParentNotFound(
                        parent_id.to_string(),
                    )));
                }
            }

            let record = DraftRecord::from_draft(&draft, directory_path);
            conn.execute(
                "INSERT INTO drafts (draft_id, parent_draft_id, timestamp, audio_start_time,
                    audio_end_time, start_text, end_text, full_text, directory_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.draft_id.to_string(),
                    record.parent_draft_id.map(|id| id.to_string()),
                    record.timestamp,
                    record.audio_start_time,
                    record.audio_end_time,
                    record.start_text,
                    record.end_text,
                    record.full_text,
                    record.directory_path,
                    record.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
            Ok(())
        })
        .await
        .map_err(PalaverError::from)?
    }

    pub async fn get(&self, draft_id: DraftId) -> Result<Option<DraftRecord>, PalaverError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || fetch_by_id(&conn.lock(), draft_id))
            .await
            .map_err(PalaverError::from)?
    }

    /// Paginated range query: drafts with `timestamp >= since_timestamp`,
    /// ordered ascending or descending, alongside the total matching count.
    pub async fn get_since(
        &self,
        since_timestamp: f64,
        limit: usize,
        offset: usize,
        order: Order,
    ) -> Result<(Vec<DraftRecord>, usize), PalaverError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let total: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM drafts WHERE timestamp >= ?1",
                    params![since_timestamp],
                    |row| row.get(0),
                )
                .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;

            let sql = format!(
                "SELECT draft_id, parent_draft_id, timestamp, audio_start_time, audio_end_time,
                        start_text, end_text, full_text, directory_path, created_at
                 FROM drafts WHERE timestamp >= ?1
                 ORDER BY timestamp {} LIMIT ?2 OFFSET ?3",
                order.sql_keyword()
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
            let rows = stmt
                .query_map(
                    params![since_timestamp, limit as i64, offset as i64],
                    row_to_record,
                )
                .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?);
            }
            Ok((out, total as usize))
        })
        .await
        .map_err(PalaverError::from)?
    }

    /// Resolves a draft alongside its parent (if any) and children in one
    /// round trip.
    pub async fn get_family(&self, draft_id: DraftId) -> Result<DraftFamily, PalaverError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let Some(draft) = fetch_by_id(&conn, draft_id)? else {
                return Ok(DraftFamily::default());
            };

            let parent = match draft.parent_draft_id {
                Some(parent_id) => fetch_by_id(&conn, parent_id)?,
                None => None,
            };

            let mut stmt = conn
                .prepare(
                    "SELECT draft_id, parent_draft_id, timestamp, audio_start_time, audio_end_time,
                            start_text, end_text, full_text, directory_path, created_at
                     FROM drafts WHERE parent_draft_id = ?1 ORDER BY timestamp ASC",
                )
                .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
            let rows = stmt
                .query_map(params![draft_id.to_string()], row_to_record)
                .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?;
            let mut children = Vec::new();
            for row in rows {
                children.push(row.map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))?);
            }

            Ok(DraftFamily {
                draft: Some(draft),
                parent,
                children,
            })
        })
        .await
        .map_err(PalaverError::from)?
    }
}

fn fetch_by_id(conn: &Connection, draft_id: DraftId) -> Result<Option<DraftRecord>, PalaverError> {
    conn.query_row(
        "SELECT draft_id, parent_draft_id, timestamp, audio_start_time, audio_end_time,
                start_text, end_text, full_text, directory_path, created_at
         FROM drafts WHERE draft_id = ?1",
        params![draft_id.to_string()],
        row_to_record,
    )
    .optional()
    .map_err(|e| PalaverError::Store(StoreError::Sqlite(e.to_string())))
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<DraftRecord> {
    let draft_id: String = row.get(0)?;
    let parent_draft_id: Option<String> = row.get(1)?;
    let created_at: String = row.get(9)?;
    Ok(DraftRecord {
        draft_id: draft_id.parse().unwrap_or_default(),
        parent_draft_id: parent_draft_id.and_then(|s| s.parse().ok()),
        timestamp: row.get(2)?,
        audio_start_time: row.get(3)?,
        audio_end_time: row.get(4)?,
        start_text: row.get(5)?,
        end_text: row.get(6)?,
        full_text: row.get(7)?,
        directory_path: row.get(8)?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
    })
}
