/// Schema version written to `PRAGMA user_version` once all migrations ran.
pub const DB_VERSION: i64 = 2;

/// Prefix shared by every per-file scan table.
pub const FRAME_SCAN_PREFIX: &str = "frameScan_";

/// Single scan table used before per-file tables existed.
pub const LEGACY_FRAME_SCAN_TABLE: &str = "frameScanList";

pub const SCHEMA: &str = r#"
-- Opaque application state, stored without interpretation
CREATE TABLE IF NOT EXISTS reduxstate (
    stateId TEXT PRIMARY KEY,
    timeStamp TEXT,
    state TEXT
);
"#;

/// DDL for one per-file scan table. `table` must already be sanitized.
pub fn frame_scan_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{}" (
            frameNumber INTEGER PRIMARY KEY,
            differenceValue REAL,
            meanColor TEXT,   -- JSON [r, g, b]
            faceObject TEXT   -- JSON detection record
        )
        "#,
        table
    )
}
