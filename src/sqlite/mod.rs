//! `SQLite` adapter built on `rusqlite`.
//!
//! Every connection owns a worker thread that holds the `rusqlite::Connection`. File databases
//! are opened in WAL mode with foreign keys enforced. Each `:memory:` connection is a separate database, so an
//! in-memory pool should be capped at one connection.

mod connection;
mod errors;
mod params;
mod query;
mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::classify::ErrorMapping;
use crate::config::BackendConfig;
use crate::dialect::{Dialect, SqliteDialect};
use crate::driver::{Driver, DriverConnection};
use crate::error::NativeError;
use crate::types::EngineKind;

use connection::SqliteConnection;
use errors::{ERROR_MAP, native, worker_closed};
use worker::SqliteWorker;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static DIALECT: SqliteDialect = SqliteDialect;
static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Adapter for `EngineKind::Sqlite`; `BackendConfig::database` is the file path or URI.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

#[async_trait]
impl Driver for SqliteDriver {
    fn engine(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }

    fn error_map(&self) -> &'static [ErrorMapping] {
        ERROR_MAP
    }

    async fn connect(&self, config: &BackendConfig) -> Result<Box<dyn DriverConnection>, NativeError> {
        let path = config.database.clone();
        let conn = tokio::task::spawn_blocking(move || open(&path))
            .await
            .map_err(|err| worker_closed(&format!("SQLite open task failed: {err}")))??;
        let interrupt = conn.get_interrupt_handle();
        let worker_id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let worker = SqliteWorker::spawn(conn, worker_id)?;
        debug!(database = %config.database, worker_id, "sqlite connection opened");
        Ok(Box::new(SqliteConnection::new(worker, interrupt)))
    }
}

fn open(path: &str) -> Result<Connection, NativeError> {
    let conn = Connection::open_with_flags(path, OpenFlags::default()).map_err(native)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(native)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(native)?;
    if !is_memory(path) {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(native)?;
    }
    Ok(conn)
}

fn is_memory(path: &str) -> bool {
    path == ":memory:" || path.contains("mode=memory")
}
