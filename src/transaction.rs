//! All-or-nothing execution of several statements on one leased connection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::{ConnectorError, ErrorKind};
use crate::executor;
use crate::pool::{ConnectionPool, PooledConnection};
use crate::query_builder;
use crate::results::RowsOrCount;
use crate::statement::{CompiledStatement, StatementSpec};

/// Where a [`Transaction`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Active,
    Committed,
    RolledBack,
}

/// A transaction bound to one leased connection.
///
/// `commit` and `rollback` consume the transaction and always hand the connection back.
/// Dropping an active transaction rolls it back on a spawned task first. Once a statement
/// deadline or a connectivity failure has broken the connection, rolling back just discards it.
pub struct Transaction {
    lease: Option<PooledConnection>,
    state: TxState,
    seq: u64,
    deadline: Option<Duration>,
}

impl Transaction {
    /// Wrap a lease without touching the backend. Call [`Transaction::begin`] next.
    #[must_use]
    pub fn new(lease: PooledConnection) -> Self {
        let deadline = lease.statement_timeout();
        Self {
            lease: Some(lease),
            state: TxState::Idle,
            seq: 0,
            deadline,
        }
    }

    /// Lease a connection from `pool` and begin a transaction on it.
    ///
    /// # Errors
    /// Any acquire error, or the classified BEGIN failure.
    pub async fn start(pool: &ConnectionPool) -> Result<Self, ConnectorError> {
        let lease = pool.acquire().await?;
        let mut tx = Self::new(lease);
        tx.begin().await?;
        Ok(tx)
    }

    /// Override the per-statement deadline taken from the backend config.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Statements executed so far.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Issue BEGIN.
    ///
    /// # Errors
    /// `InvalidState` unless the transaction is `Idle` (nesting is not supported), otherwise the
    /// classified backend error.
    pub async fn begin(&mut self) -> Result<(), ConnectorError> {
        if self.state != TxState::Idle {
            return Err(ConnectorError::invalid_state(format!(
                "cannot begin a transaction that is {}",
                state_name(self.state)
            )));
        }
        let lease = self.lease_mut()?;
        let driver = Arc::clone(lease.driver());
        let conn = lease.conn_mut()?;
        if let Err(native) = conn.begin().await {
            let err = driver.classify(native);
            if err.kind() == ErrorKind::Connectivity {
                lease.mark_broken();
            }
            return Err(err);
        }
        debug!(engine = %driver.engine(), conn_id = lease.id(), "transaction started");
        self.state = TxState::Active;
        Ok(())
    }

    /// Build and execute one statement inside the transaction.
    ///
    /// # Errors
    /// `InvalidSpec` if the statement cannot be built, `InvalidState` if the transaction is
    /// not active, or the classified backend error.
    pub async fn execute(&mut self, spec: &StatementSpec) -> Result<RowsOrCount, ConnectorError> {
        self.ensure_active("execute in")?;
        let dialect = self.lease_mut()?.driver().dialect();
        let stmt = query_builder::build(spec, dialect)?;
        self.execute_compiled(&stmt).await
    }

    /// Execute an already compiled statement inside the transaction.
    ///
    /// # Errors
    /// Same as [`Transaction::execute`] minus the build step.
    pub async fn execute_compiled(
        &mut self,
        stmt: &CompiledStatement,
    ) -> Result<RowsOrCount, ConnectorError> {
        self.ensure_active("execute in")?;
        let deadline = self.deadline;
        let lease = self.lease_mut()?;
        if lease.is_broken() {
            return Err(ConnectorError::invalid_state(
                "the transaction's connection was lost; roll it back",
            ));
        }
        self.seq += 1;
        let seq = self.seq;
        let lease = self.lease_mut()?;
        debug!(conn_id = lease.id(), seq, "transaction statement");
        executor::execute_compiled(lease, stmt, deadline).await
    }

    /// Commit and release the connection.
    ///
    /// # Errors
    /// `InvalidState` if the transaction is not active or its connection was broken by an
    /// earlier failure, or the classified COMMIT failure. The connection is released either
    /// way; after a failed COMMIT it is discarded.
    pub async fn commit(mut self) -> Result<(), ConnectorError> {
        self.ensure_active("commit")?;
        self.finish(TxState::Committed).await
    }

    /// Roll back and release the connection.
    ///
    /// # Errors
    /// `InvalidState` if the transaction is not active, or the classified ROLLBACK failure.
    pub async fn rollback(mut self) -> Result<(), ConnectorError> {
        self.ensure_active("roll back")?;
        self.finish(TxState::RolledBack).await
    }

    async fn finish(&mut self, outcome: TxState) -> Result<(), ConnectorError> {
        // Terminal before the backend call, so `Drop` never issues a second rollback.
        self.state = outcome;
        let seq = self.seq;
        let mut lease = self
            .lease
            .take()
            .ok_or_else(|| ConnectorError::invalid_state("transaction already completed"))?;

        if lease.is_broken() {
            // A statement may still be running; discarding the connection aborts the
            // transaction without queueing behind it.
            debug!(conn_id = lease.id(), seq, "abandoning transaction on a broken connection");
            return if outcome == TxState::Committed {
                Err(ConnectorError::invalid_state(
                    "cannot commit: the transaction's connection was lost",
                ))
            } else {
                Ok(())
            };
        }

        // Stays broken if this future is dropped before the backend answers.
        lease.mark_broken();
        let driver = Arc::clone(lease.driver());
        let conn = lease.conn_mut()?;
        let result = if outcome == TxState::Committed {
            conn.commit().await
        } else {
            conn.rollback().await
        };
        match result {
            Ok(()) => {
                lease.clear_broken();
                debug!(conn_id = lease.id(), seq, state = state_name(outcome), "transaction finished");
                Ok(())
            }
            Err(native) => {
                let err = driver.classify(native);
                warn!(conn_id = lease.id(), seq, error = %err, "transaction end failed");
                Err(err)
            }
        }
    }

    fn ensure_active(&self, action: &str) -> Result<(), ConnectorError> {
        if self.state == TxState::Active {
            Ok(())
        } else {
            Err(ConnectorError::invalid_state(format!(
                "cannot {action} a transaction that is {}",
                state_name(self.state)
            )))
        }
    }

    fn lease_mut(&mut self) -> Result<&mut PooledConnection, ConnectorError> {
        self.lease
            .as_mut()
            .ok_or_else(|| ConnectorError::invalid_state("transaction already completed"))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state != TxState::Active {
            return;
        }
        let Some(mut lease) = self.lease.take() else {
            return;
        };
        if lease.is_broken() {
            return;
        }
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move {
                let outcome = match lease.conn_mut() {
                    Ok(conn) => conn.rollback().await.map_err(|e| e.to_string()),
                    Err(err) => Err(err.to_string()),
                };
                if let Err(error) = outcome {
                    warn!(conn_id = lease.id(), %error, "rollback of dropped transaction failed");
                    lease.mark_broken();
                }
            });
        } else {
            lease.mark_broken();
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state)
            .field("seq", &self.seq)
            .field("conn_id", &self.lease.as_ref().map(PooledConnection::id))
            .finish()
    }
}

fn state_name(state: TxState) -> &'static str {
    match state {
        TxState::Idle => "idle",
        TxState::Active => "active",
        TxState::Committed => "committed",
        TxState::RolledBack => "rolled back",
    }
}
