//! Persistent per-file scan cache.
//!
//! Each source file gets its own `frameScan_<id>` table keyed by frame
//! number. Writes are upserts inside one transaction, so samples may arrive
//! out of order and repeated. Reads on a file that was never scanned return
//! empty results rather than errors.

mod faces;
mod frames;
mod migrate;
mod schema;
mod state;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

pub use faces::{FaceRow, PayloadError, PayloadFault};
pub use migrate::{Migration, MIGRATIONS};
pub use schema::{DB_VERSION, FRAME_SCAN_PREFIX, LEGACY_FRAME_SCAN_TABLE, SCHEMA};
pub use state::StateSnapshot;

/// Table name for a file id: `frameScan_` followed by the id with every
/// character outside `[A-Za-z0-9_]` replaced by `_`.
pub fn frame_scan_table_name(file_id: &str) -> String {
    let sanitized: String = file_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{}{}", FRAME_SCAN_PREFIX, sanitized)
}

/// Single-writer handle on the scan cache. Share it behind a `Mutex`.
pub struct ScanStore {
    pub(crate) conn: Connection,
}

impl ScanStore {
    /// Open (or create) the cache at `path` and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open scan cache: {}", path.display()))?;

        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "Opened scan cache");

        let mut store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Extra reader next to the writer. Runs no migrations.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open scan cache read-only: {}", path.display()))?;
        Ok(Self { conn })
    }

    /// Run pending migrations, then create the fixed tables.
    ///
    /// A failed migration is logged and left for the next open.
    pub fn initialize(&mut self) -> Result<()> {
        let version = migrate::run_migrations(&mut self.conn);
        if version < DB_VERSION {
            tracing::warn!(version, latest = DB_VERSION, "Scan cache schema is behind");
        }
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        let version = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    // ========================================================================
    // Scan tables
    // ========================================================================

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Create the scan table for `file_id` if needed and return its name.
    pub fn ensure_table(&self, file_id: &str) -> Result<String> {
        let table = frame_scan_table_name(file_id);
        self.conn.execute_batch(&schema::frame_scan_table_sql(&table))?;
        Ok(table)
    }

    pub fn delete_table(&self, file_id: &str) -> Result<()> {
        let table = frame_scan_table_name(file_id);
        self.conn
            .execute_batch(&format!(r#"DROP TABLE IF EXISTS "{}""#, table))?;
        tracing::debug!(file_id, table = %table, "Deleted scan table");
        Ok(())
    }

    /// Drop every scan table. Other tables are left alone.
    pub fn delete_all_tables(&mut self) -> Result<usize> {
        let tables = self.scan_tables()?;
        let tx = self.conn.transaction()?;
        for table in &tables {
            tx.execute_batch(&format!(r#"DROP TABLE IF EXISTS "{}""#, table))?;
        }
        tx.commit()?;
        tracing::info!(count = tables.len(), "Deleted all scan tables");
        Ok(tables.len())
    }

    /// Names of all scan tables, sorted.
    pub fn scan_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND substr(name, 1, ?1) = ?2 ORDER BY name",
        )?;
        let tables = stmt
            .query_map(
                rusqlite::params![FRAME_SCAN_PREFIX.len() as i64, FRAME_SCAN_PREFIX],
                |row| row.get::<_, String>(0),
            )?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tables)
    }

    /// Number of frames with a difference value. Zero if the file was never scanned.
    pub fn get_scanned_count(&self, file_id: &str) -> Result<u64> {
        let table = frame_scan_table_name(file_id);
        if !self.table_exists(&table)? {
            return Ok(0);
        }
        let count: i64 = self.conn.query_row(
            &format!(
                r#"SELECT COUNT(frameNumber) FROM "{}" WHERE differenceValue IS NOT NULL"#,
                table
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
