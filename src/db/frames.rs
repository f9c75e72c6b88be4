use anyhow::{Context, Result};
use rusqlite::params;

use super::{frame_scan_table_name, schema, ScanStore};
use crate::frames::{FrameSample, MeanColor};

impl ScanStore {
    // ========================================================================
    // Frame samples
    // ========================================================================

    /// Upsert difference values and mean colors. Face payloads are left untouched.
    ///
    /// All rows commit together or not at all.
    pub fn upsert_frames(&mut self, file_id: &str, samples: &[FrameSample]) -> Result<usize> {
        let table = frame_scan_table_name(file_id);
        let tx = self.conn.transaction()?;
        tx.execute_batch(&schema::frame_scan_table_sql(&table))?;
        {
            let mut stmt = tx.prepare(&format!(
                r#"
                INSERT INTO "{}" (frameNumber, differenceValue, meanColor)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(frameNumber) DO UPDATE SET
                    differenceValue = excluded.differenceValue,
                    meanColor = excluded.meanColor
                "#,
                table
            ))?;
            for sample in samples {
                let mean_color = sample
                    .mean_color
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![sample.frame_number, sample.difference_value, mean_color])?;
            }
        }
        tx.commit()?;

        tracing::debug!(file_id, rows = samples.len(), "Upserted frame samples");
        Ok(samples.len())
    }

    /// Frames with a difference value, ordered by frame number.
    ///
    /// A row that cannot be read, such as a negative frame number, fails the whole call.
    pub fn get_frames(&self, file_id: &str) -> Result<Vec<FrameSample>> {
        let table = frame_scan_table_name(file_id);
        if !self.table_exists(&table)? {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT frameNumber, differenceValue, meanColor FROM "{}"
            WHERE differenceValue IS NOT NULL
            ORDER BY frameNumber ASC
            "#,
            table
        ))?;
        let frames = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .map(|row| -> rusqlite::Result<FrameSample> {
                let (frame_number, difference_value, mean_color) = row?;
                Ok(FrameSample {
                    frame_number,
                    difference_value,
                    mean_color: mean_color.and_then(|json| parse_mean_color(file_id, frame_number, &json)),
                })
            })
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read frame scan rows for {}", file_id))?;
        Ok(frames)
    }
}

fn parse_mean_color(file_id: &str, frame_number: u32, json: &str) -> Option<MeanColor> {
    match serde_json::from_str::<MeanColor>(json) {
        Ok(color) => Some(color),
        Err(e) => {
            tracing::warn!(file_id, frame_number, error = %e, "Ignoring malformed mean color");
            None
        }
    }
}
