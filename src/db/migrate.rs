//! Schema migrations for the scan cache.
//!
//! Steps run in order from the stored `user_version`. Each step checks the
//! current state first and only mutates when needed, then bumps the version
//! inside the same transaction. The first failing step stops the run; the
//! version stays at the last step that committed.

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction};

use super::frame_scan_table_name;
use super::schema::{frame_scan_table_sql, LEGACY_FRAME_SCAN_TABLE};

/// One schema step. `apply` returns whether it changed anything.
pub struct Migration {
    /// Version stored once the step committed
    pub target: i64,
    pub name: &'static str,
    pub apply: fn(&Transaction) -> Result<bool>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        target: 1,
        name: "rename meanValue to differenceValue",
        apply: rename_mean_value,
    },
    Migration {
        target: 2,
        name: "split frameScanList into per-file tables",
        apply: split_frame_scan_list,
    },
];

/// Bring `conn` up to date and return the resulting version.
///
/// Never fails: errors are logged and the remaining steps are skipped.
pub(crate) fn run_migrations(conn: &mut Connection) -> i64 {
    run_steps(conn, MIGRATIONS)
}

pub(crate) fn run_steps(conn: &mut Connection, steps: &[Migration]) -> i64 {
    let mut version = match user_version(conn) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read schema version");
            return 0;
        }
    };

    let start = version;
    for step in steps.iter().filter(|m| m.target > start) {
        tracing::info!(from = version, to = step.target, step = step.name, "Migrating scan cache");
        match apply_step(conn, step) {
            Ok(changed) => {
                if !changed {
                    tracing::info!(version = step.target, "Already migrated, only the version was updated");
                }
                version = step.target;
            }
            Err(e) => {
                tracing::error!(step = step.name, error = %format!("{:#}", e), "Migration failed");
                break;
            }
        }
    }

    version
}

fn apply_step(conn: &mut Connection, step: &Migration) -> Result<bool> {
    let tx = conn.transaction()?;
    let changed = (step.apply)(&tx).with_context(|| format!("Migration '{}' failed", step.name))?;
    tx.pragma_update(None, "user_version", step.target)?;
    tx.commit()?;
    Ok(changed)
}

fn user_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(names)
}

// ========================================================================
// Steps
// ========================================================================

fn rename_mean_value(tx: &Transaction) -> Result<bool> {
    if !table_exists(tx, LEGACY_FRAME_SCAN_TABLE)? {
        return Ok(false);
    }
    let columns = column_names(tx, LEGACY_FRAME_SCAN_TABLE)?;
    if !columns.iter().any(|c| c == "meanValue") || columns.iter().any(|c| c == "differenceValue") {
        return Ok(false);
    }

    tx.execute_batch(&format!(
        r#"ALTER TABLE "{}" RENAME COLUMN "meanValue" TO "differenceValue""#,
        LEGACY_FRAME_SCAN_TABLE
    ))?;
    Ok(true)
}

fn split_frame_scan_list(tx: &Transaction) -> Result<bool> {
    if !table_exists(tx, LEGACY_FRAME_SCAN_TABLE)? {
        return Ok(false);
    }

    let file_ids: Vec<String> = {
        let mut stmt = tx.prepare(&format!(
            r#"SELECT DISTINCT fileId FROM "{}" WHERE fileId IS NOT NULL"#,
            LEGACY_FRAME_SCAN_TABLE
        ))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids
    };

    for file_id in &file_ids {
        let table = frame_scan_table_name(file_id);
        tx.execute_batch(&frame_scan_table_sql(&table))?;
        // WHERE is required before ON CONFLICT in an INSERT ... SELECT upsert.
        let copied = tx.execute(
            &format!(
                r#"
                INSERT INTO "{}" (frameNumber, differenceValue, meanColor)
                SELECT frameNumber, differenceValue, meanColor FROM "{}" WHERE fileId = ?1
                ON CONFLICT(frameNumber) DO UPDATE SET
                    differenceValue = excluded.differenceValue,
                    meanColor = excluded.meanColor
                "#,
                table, LEGACY_FRAME_SCAN_TABLE
            ),
            [file_id],
        )?;
        tracing::info!(file_id = %file_id, table = %table, rows = copied, "Split legacy scan rows");
    }

    tx.execute_batch(&format!(r#"DROP TABLE IF EXISTS "{}""#, LEGACY_FRAME_SCAN_TABLE))?;
    Ok(true)
}
