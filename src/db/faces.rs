use anyhow::Result;
use rusqlite::params;
use thiserror::Error;

use super::{frame_scan_table_name, schema, ScanStore};
use crate::faces::DetectionRecord;

/// Frame numbers bound per query when filtering by frame.
const FILTER_CHUNK: usize = 500;

/// A face payload that could not be read or decoded.
#[derive(Debug, Error)]
#[error("malformed face payload for frame {frame_number}")]
pub struct PayloadError {
    /// Raw `frameNumber` of the row, which may lie outside `u32`
    pub frame_number: i64,
    #[source]
    pub source: PayloadFault,
}

#[derive(Debug, Error)]
pub enum PayloadFault {
    #[error("row could not be read")]
    Row(#[from] rusqlite::Error),
    #[error("payload is not valid JSON")]
    Json(#[from] serde_json::Error),
}

/// `(frameNumber, faceObject)` with the payload read kept per row.
type RawFaceRow = (i64, rusqlite::Result<String>);

/// One stored face payload; a bad row does not spoil the others.
pub type FaceRow = std::result::Result<DetectionRecord, PayloadError>;

impl ScanStore {
    // ========================================================================
    // Face payloads
    // ========================================================================

    /// Upsert face payloads. Difference values and colors are left untouched.
    pub fn upsert_faces(&mut self, file_id: &str, records: &[DetectionRecord]) -> Result<usize> {
        let table = frame_scan_table_name(file_id);
        let tx = self.conn.transaction()?;
        tx.execute_batch(&schema::frame_scan_table_sql(&table))?;
        {
            let mut stmt = tx.prepare(&format!(
                r#"
                INSERT INTO "{}" (frameNumber, faceObject)
                VALUES (?1, ?2)
                ON CONFLICT(frameNumber) DO UPDATE SET faceObject = excluded.faceObject
                "#,
                table
            ))?;
            for record in records {
                let payload = serde_json::to_string(record)?;
                stmt.execute(params![record.frame_number, payload])?;
            }
        }
        tx.commit()?;

        tracing::debug!(file_id, rows = records.len(), "Upserted face payloads");
        Ok(records.len())
    }

    /// Stored face payloads ordered by frame number, optionally limited to `frame_numbers`.
    pub fn get_faces(&self, file_id: &str, frame_numbers: Option<&[u32]>) -> Result<Vec<FaceRow>> {
        let table = frame_scan_table_name(file_id);
        if !self.table_exists(&table)? {
            return Ok(Vec::new());
        }

        let rows = match frame_numbers {
            None => self.query_faces(&table, &[])?,
            Some(filter) => {
                let mut wanted = filter.to_vec();
                wanted.sort_unstable();
                wanted.dedup();

                let mut rows = Vec::new();
                for chunk in wanted.chunks(FILTER_CHUNK) {
                    rows.extend(self.query_faces(&table, chunk)?);
                }
                rows
            }
        };

        Ok(rows
            .into_iter()
            .map(|(frame_number, payload)| decode_row(file_id, frame_number, payload))
            .collect())
    }

    /// Raw rows. An empty `frame_numbers` means all frames.
    fn query_faces(&self, table: &str, frame_numbers: &[u32]) -> Result<Vec<RawFaceRow>> {
        let filter = if frame_numbers.is_empty() {
            String::new()
        } else {
            let placeholders: Vec<&str> = frame_numbers.iter().map(|_| "?").collect();
            format!("AND frameNumber IN ({})", placeholders.join(", "))
        };
        let sql = format!(
            r#"
            SELECT frameNumber, faceObject FROM "{}"
            WHERE faceObject IS NOT NULL {}
            ORDER BY frameNumber ASC
            "#,
            table, filter
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            frame_numbers.iter().map(|n| n as &dyn rusqlite::ToSql).collect();
        // frameNumber is the INTEGER PRIMARY KEY, so only the payload read can fail per row.
        let rows = stmt
            .query_map(params.as_slice(), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn decode_row(file_id: &str, frame_number: i64, payload: rusqlite::Result<String>) -> FaceRow {
    let decoded = u32::try_from(frame_number)
        .map_err(|_| PayloadFault::Row(rusqlite::Error::IntegralValueOutOfRange(0, frame_number)))
        .and_then(|_| payload.map_err(PayloadFault::from))
        .and_then(|payload| serde_json::from_str(&payload).map_err(PayloadFault::from));

    decoded.map_err(|source| {
        tracing::warn!(file_id, frame_number, error = %source, "Malformed face payload");
        PayloadError {
            frame_number,
            source,
        }
    })
}
