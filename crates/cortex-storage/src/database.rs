// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use cortex_core::CortexError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into `CortexError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> CortexError {
    CortexError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the single SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs and run migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, CortexError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CortexError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| CortexError::Storage { source: Box::new(e) })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, CortexError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| CortexError::Storage { source: Box::new(e) })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), CortexError> {
        self.conn
            .call(move |conn| -> Result<Result<(), CortexError>, rusqlite::Error> {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 5000;")?;
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
    }

    /// The underlying connection; all queries go through `call()`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), CortexError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
