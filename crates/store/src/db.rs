use std::sync::{Arc, Mutex};

use duckdb::Connection;
use otelview_core::error::{Result, ViewError};

use crate::schema::MIGRATIONS;

/// Shared handle over one in-memory DuckDB connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ViewError::Store(format!("failed to open in-memory db: {e}")))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Creates sequences, tables and indexes that do not exist yet.
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn();
        for (step, sql) in MIGRATIONS.iter().enumerate() {
            conn.execute_batch(sql)
                .map_err(|e| ViewError::Store(format!("migration step {step} failed: {e}")))?;
        }
        tracing::debug!(steps = MIGRATIONS.len(), "schema migrated");
        Ok(())
    }

    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }
}
