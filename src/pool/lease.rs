use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::OwnedSemaphorePermit;

use crate::driver::{Driver, DriverConnection};
use crate::error::ConnectorError;

use super::PoolInner;

/// A connection leased from a [`super::ConnectionPool`].
///
/// Exclusively owned; dropping it returns the connection to the pool, or discards it when it
/// was marked broken.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Box<dyn DriverConnection>>,
    id: u64,
    created_at: Instant,
    broken: bool,
    // Dropped after `Drop::drop` has put the connection back.
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    pub(super) fn new(
        pool: Arc<PoolInner>,
        conn: Box<dyn DriverConnection>,
        id: u64,
        created_at: Instant,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            pool,
            conn: Some(conn),
            id,
            created_at,
            broken: false,
            _permit: permit,
        }
    }

    /// Pool-unique connection id, for logs.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver> {
        self.pool.driver()
    }

    /// Per-statement deadline from the backend config.
    #[must_use]
    pub fn statement_timeout(&self) -> Option<Duration> {
        self.pool.config.statement_timeout
    }

    /// The connection will be disconnected instead of returned to the idle set.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub(crate) fn clear_broken(&mut self) {
        self.broken = false;
    }

    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// # Errors
    /// Returns `InvalidState` if the connection was already handed back.
    pub fn conn_mut(&mut self) -> Result<&mut (dyn DriverConnection + 'static), ConnectorError> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| ConnectorError::invalid_state("connection already released"))
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool
                .give_back(conn, self.id, self.created_at, self.broken);
        }
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("engine", &self.pool.driver().engine())
            .field("broken", &self.broken)
            .finish()
    }
}
