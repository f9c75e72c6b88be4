use anyhow::Result;
use rusqlite::params;

use super::ScanStore;

/// Application state blob as stored, uninterpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub state_id: String,
    /// RFC 3339 time of the last save
    pub time_stamp: String,
    pub state: String,
}

impl ScanStore {
    // ========================================================================
    // Application state
    // ========================================================================

    /// Replace the state stored under `state_id`.
    pub fn save_state(&mut self, state_id: &str, state: &str) -> Result<()> {
        let time_stamp = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute(
            "REPLACE INTO reduxstate (stateId, timeStamp, state) VALUES (?, ?, ?)",
            params![state_id, time_stamp, state],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_state(&self, state_id: &str) -> Result<Option<StateSnapshot>> {
        let result = self.conn.query_row(
            "SELECT stateId, timeStamp, state FROM reduxstate WHERE stateId = ?",
            [state_id],
            |row| {
                Ok(StateSnapshot {
                    state_id: row.get(0)?,
                    time_stamp: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    state: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            },
        );
        match result {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Forget every stored state. Returns how many were removed.
    pub fn delete_all_states(&self) -> Result<usize> {
        let deleted = self.conn.execute("DELETE FROM reduxstate", [])?;
        Ok(deleted)
    }
}
