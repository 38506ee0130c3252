//! Bounded set of live connections for one backend.
//!
//! A semaphore sized to `max_size` forms the wait queue; the idle set and the lease count sit
//! under one mutex. Leases return themselves on drop.

mod lease;

pub use lease::PooledConnection;

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, info, warn};

use crate::config::BackendConfig;
use crate::driver::{Driver, DriverConnection};
use crate::error::{ConnectorError, ErrorKind};

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub idle: usize,
    pub leased: usize,
    pub max_size: usize,
    pub closed: bool,
}

/// Cheaply cloneable handle to a connection pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

pub(crate) struct PoolInner {
    config: Arc<BackendConfig>,
    driver: Arc<dyn Driver>,
    state: Mutex<PoolState>,
    slots: Arc<Semaphore>,
    released: Notify,
    next_id: AtomicU64,
}

struct PoolState {
    idle: VecDeque<IdleConn>,
    leased: usize,
    closed: bool,
}

struct IdleConn {
    conn: Box<dyn DriverConnection>,
    id: u64,
    created_at: Instant,
    idle_since: Instant,
}

impl IdleConn {
    fn is_stale(&self, now: Instant, config: &BackendConfig) -> bool {
        now.duration_since(self.created_at) >= config.max_lifetime
            || now.duration_since(self.idle_since) >= config.idle_timeout
    }
}

impl ConnectionPool {
    /// Create a pool and open `min_size` connections up front.
    ///
    /// # Errors
    /// Returns `InvalidSpec` for an invalid config, or the classified connect error if a
    /// pre-opened connection fails.
    pub async fn new(
        config: Arc<BackendConfig>,
        driver: Arc<dyn Driver>,
    ) -> Result<Self, ConnectorError> {
        config.validate()?;
        let inner = Arc::new(PoolInner {
            slots: Arc::new(Semaphore::new(config.max_size)),
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(config.max_size),
                leased: 0,
                closed: false,
            }),
            released: Notify::new(),
            next_id: AtomicU64::new(1),
            config,
            driver,
        });

        for _ in 0..inner.config.min_size {
            let (conn, id) = inner.open().await?;
            let now = Instant::now();
            inner.lock_state().idle.push_back(IdleConn {
                conn,
                id,
                created_at: now,
                idle_since: now,
            });
        }

        debug!(
            engine = %inner.driver.engine(),
            min_size = inner.config.min_size,
            max_size = inner.config.max_size,
            "connection pool ready"
        );
        Ok(Self { inner })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.inner.driver
    }

    /// Lease a connection, waiting up to the configured acquire timeout.
    ///
    /// # Errors
    /// `PoolExhausted` on timeout, `InvalidState` after shutdown, or the classified connect
    /// error when a new connection has to be opened and that fails.
    pub async fn acquire(&self) -> Result<PooledConnection, ConnectorError> {
        self.acquire_with_timeout(self.inner.config.acquire_timeout)
            .await
    }

    /// Like [`ConnectionPool::acquire`] with a caller-supplied timeout.
    ///
    /// The timeout covers the whole acquire: waiting for a slot, validating an idle connection
    /// and opening a new one.
    ///
    /// # Errors
    /// Same as [`ConnectionPool::acquire`].
    pub async fn acquire_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<PooledConnection, ConnectorError> {
        let inner = &self.inner;
        let deadline = tokio::time::Instant::now() + timeout;
        let permit =
            match tokio::time::timeout_at(deadline, Arc::clone(&inner.slots).acquire_owned()).await
            {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(shut_down()),
                Err(_) => return Err(inner.exhausted(timeout)),
            };

        let (reservation, stale) = {
            let mut state = inner.lock_state();
            if state.closed {
                return Err(shut_down());
            }
            let now = Instant::now();
            let (fresh, stale): (Vec<IdleConn>, Vec<IdleConn>) = state
                .idle
                .drain(..)
                .partition(|entry| !entry.is_stale(now, &inner.config));
            state.idle = fresh.into();
            state.leased += 1;
            (SlotReservation::new(inner), stale)
        };

        for entry in stale {
            debug!(engine = %inner.driver.engine(), conn_id = entry.id, "retiring stale connection");
            spawn_close(entry.conn, entry.id);
        }

        let (conn, id, created_at) =
            match tokio::time::timeout_at(deadline, inner.checkout()).await {
                Ok(result) => result?,
                Err(_) => return Err(inner.exhausted(timeout)),
            };
        reservation.disarm();

        debug!(engine = %inner.driver.engine(), conn_id = id, "connection leased");
        Ok(PooledConnection::new(
            Arc::clone(inner),
            conn,
            id,
            created_at,
            permit,
        ))
    }

    /// Hand a lease back. Equivalent to dropping it.
    pub fn release(&self, lease: PooledConnection) {
        drop(lease);
    }

    /// Refuse new acquires, wait for outstanding leases, then close every idle connection.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        inner.lock_state().closed = true;
        inner.slots.close();

        loop {
            let released = inner.released.notified();
            let leased = inner.lock_state().leased;
            if leased == 0 {
                break;
            }
            released.await;
        }

        let idle: Vec<IdleConn> = inner.lock_state().idle.drain(..).collect();
        let closed = idle.len();
        for entry in idle {
            close_connection(entry.conn, entry.id).await;
        }
        info!(engine = %inner.driver.engine(), closed, "connection pool shut down");
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.lock_state();
        PoolStatus {
            idle: state.idle.len(),
            leased: state.leased,
            max_size: self.inner.config.max_size,
            closed: state.closed,
        }
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("engine", &self.inner.driver.engine())
            .field("status", &self.status())
            .finish()
    }
}

impl PoolInner {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    fn exhausted(&self, timeout: Duration) -> ConnectorError {
        debug!(engine = %self.driver.engine(), ?timeout, "acquire timed out");
        ConnectorError::pool_exhausted(format!("no connection available within {timeout:?}"))
    }

    /// Most recently used idle connection that still answers, or a new one.
    async fn checkout(&self) -> Result<(Box<dyn DriverConnection>, u64, Instant), ConnectorError> {
        loop {
            let next = self.lock_state().idle.pop_back();
            let Some(mut entry) = next else {
                break;
            };
            let unchecked = self
                .config
                .validate_after
                .is_some_and(|after| entry.idle_since.elapsed() >= after);
            if !unchecked {
                return Ok((entry.conn, entry.id, entry.created_at));
            }
            match entry.conn.ping().await {
                Ok(()) => return Ok((entry.conn, entry.id, entry.created_at)),
                Err(err) => {
                    warn!(
                        engine = %self.driver.engine(),
                        conn_id = entry.id,
                        error = %err,
                        "idle connection failed validation"
                    );
                    spawn_close(entry.conn, entry.id);
                }
            }
        }
        let (conn, id) = self.open().await?;
        Ok((conn, id, Instant::now()))
    }

    async fn open(&self) -> Result<(Box<dyn DriverConnection>, u64), ConnectorError> {
        let timeout = self.config.connect_timeout;
        let conn = match tokio::time::timeout(timeout, self.driver.connect(&self.config)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(native)) => return Err(self.driver.classify(native)),
            Err(_) => {
                return Err(ConnectorError::new(
                    ErrorKind::Connectivity,
                    None,
                    format!("connect did not finish within {timeout:?}"),
                    None,
                ));
            }
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(engine = %self.driver.engine(), conn_id = id, "connection opened");
        Ok((conn, id))
    }

    /// Called from the lease's `Drop`; the lease's permit is released right after.
    pub(crate) fn give_back(
        &self,
        conn: Box<dyn DriverConnection>,
        id: u64,
        created_at: Instant,
        broken: bool,
    ) {
        let discard = {
            let mut state = self.lock_state();
            state.leased = state.leased.saturating_sub(1);
            let expired = created_at.elapsed() >= self.config.max_lifetime;
            if broken || expired || state.closed {
                Some(conn)
            } else {
                state.idle.push_back(IdleConn {
                    conn,
                    id,
                    created_at,
                    idle_since: Instant::now(),
                });
                None
            }
        };
        self.released.notify_waiters();

        if let Some(conn) = discard {
            if broken {
                warn!(engine = %self.driver.engine(), conn_id = id, "discarding broken connection");
            } else {
                debug!(engine = %self.driver.engine(), conn_id = id, "retiring connection");
            }
            spawn_close(conn, id);
        } else {
            debug!(engine = %self.driver.engine(), conn_id = id, "connection released");
        }
    }
}

/// A slot counted in `leased` before its connection is in hand. Dropping it unarmed, for
/// example when the acquiring future is cancelled, hands the slot back.
struct SlotReservation<'a> {
    pool: &'a PoolInner,
    armed: bool,
}

impl<'a> SlotReservation<'a> {
    fn new(pool: &'a PoolInner) -> Self {
        Self { pool, armed: true }
    }

    /// The slot now belongs to a [`PooledConnection`].
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SlotReservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.pool.lock_state();
            state.leased = state.leased.saturating_sub(1);
            drop(state);
            self.pool.released.notify_waiters();
        }
    }
}

fn spawn_close(conn: Box<dyn DriverConnection>, id: u64) {
    if let Ok(handle) = Handle::try_current() {
        handle.spawn(close_connection(conn, id));
    }
}

async fn close_connection(conn: Box<dyn DriverConnection>, id: u64) {
    if let Err(err) = conn.disconnect().await {
        warn!(conn_id = id, error = %err, "disconnect failed");
    }
}

fn shut_down() -> ConnectorError {
    ConnectorError::invalid_state("connection pool is shut down")
}
