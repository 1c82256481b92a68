use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, params};
use tracing::debug;

use crate::models::Snapshot;
use crate::store::{Slot, SnapshotStore, decode_slot, encode_slot};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS slots (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Slots ---

    pub fn set_slot(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO slots (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_slot(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM slots WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }
}

impl SnapshotStore for Database {
    fn load(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::default();
        for slot in Slot::ALL {
            let key = slot.key();
            if let Some(raw) = self.get_slot(key)? {
                decode_slot(&mut snapshot, slot, &raw)
                    .with_context(|| format!("Stored '{key}' data is corrupt"))?;
            }
        }
        debug!(
            pantry = snapshot.pantry.len(),
            meal_plan = snapshot.meal_plan.len(),
            shopping = snapshot.shopping_list.len(),
            reviews = snapshot.reviews.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for slot in Slot::ALL {
            let value = encode_slot(snapshot, slot)?;
            self.set_slot(slot.key(), &value)
                .with_context(|| format!("Failed to write '{}'", slot.key()))?;
        }
        tx.commit()?;
        Ok(())
    }
}
