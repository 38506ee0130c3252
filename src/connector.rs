//! Engine-agnostic entry point: build, lease, execute, release.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::driver::{Driver, registry};
use crate::error::ConnectorError;
use crate::executor;
use crate::pool::{ConnectionPool, PoolStatus};
use crate::query_builder;
use crate::results::{RowStream, RowsOrCount};
use crate::statement::{CompiledStatement, StatementSpec};
use crate::transaction::Transaction;

/// Per-call overrides of the backend config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// How long to wait for a pooled connection.
    pub acquire_timeout: Option<Duration>,
    /// Statement deadline; replaces the config's `statement_timeout`.
    pub deadline: Option<Duration>,
}

impl CallOptions {
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// One backend behind a pool.
///
/// ```rust,no_run
/// use sql_connector::prelude::*;
///
/// # async fn demo() -> Result<(), ConnectorError> {
/// let connector = Connector::new(BackendConfig::sqlite("app.db").finish()?).await?;
/// connector
///     .execute_ddl(
///         &CreateTable::new("users")
///             .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
///             .column(ColumnDef::new("name", ColumnType::Text).not_null())
///             .into(),
///     )
///     .await?;
/// connector
///     .execute_dml(&Insert::new("users").value("id", 1).value("name", "a").into())
///     .await?;
/// let users = connector.execute_dml(&Select::new("users").into()).await?;
/// assert_eq!(users.rows().map(ResultSet::len), Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Connector {
    config: Arc<BackendConfig>,
    pool: ConnectionPool,
}

impl Connector {
    /// Connect using the adapter registered for `config.engine`.
    ///
    /// # Errors
    /// `InvalidSpec` for an invalid config or an engine without a built-in adapter, or the
    /// classified error of a pre-opened connection.
    pub async fn new(config: BackendConfig) -> Result<Self, ConnectorError> {
        let driver = registry::lookup(config.engine)?;
        Self::with_driver(config, driver).await
    }

    /// Connect through an explicitly supplied adapter.
    ///
    /// # Errors
    /// Same as [`Connector::new`].
    pub async fn with_driver(
        config: BackendConfig,
        driver: Arc<dyn Driver>,
    ) -> Result<Self, ConnectorError> {
        if driver.engine() != config.engine {
            return Err(ConnectorError::invalid_spec(format!(
                "config is for {} but the adapter serves {}",
                config.engine,
                driver.engine()
            )));
        }
        let config = Arc::new(config);
        let pool = ConnectionPool::new(Arc::clone(&config), driver).await?;
        Ok(Self { config, pool })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    #[must_use]
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Compile a statement for this backend without running it.
    ///
    /// # Errors
    /// `InvalidSpec` if the statement cannot be expressed.
    pub fn compile(&self, spec: &StatementSpec) -> Result<CompiledStatement, ConnectorError> {
        query_builder::build(spec, self.pool.driver().dialect())
    }

    /// Run a CREATE, DROP or ALTER TABLE.
    ///
    /// # Errors
    /// `InvalidSpec` for DML statements or unbuildable specs, `PoolExhausted`, or the classified
    /// backend error.
    pub async fn execute_ddl(&self, spec: &StatementSpec) -> Result<(), ConnectorError> {
        self.execute_ddl_with(spec, CallOptions::default()).await
    }

    /// [`Connector::execute_ddl`] with per-call overrides.
    ///
    /// # Errors
    /// Same as [`Connector::execute_ddl`].
    pub async fn execute_ddl_with(
        &self,
        spec: &StatementSpec,
        options: CallOptions,
    ) -> Result<(), ConnectorError> {
        if !spec.is_ddl() {
            return Err(wrong_class(spec, "execute_ddl"));
        }
        self.run_single(spec, options).await.map(|_| ())
    }

    /// Run an INSERT, UPDATE, DELETE or SELECT.
    ///
    /// # Errors
    /// `InvalidSpec` for DDL statements or unbuildable specs, `PoolExhausted`, or the classified
    /// backend error.
    pub async fn execute_dml(&self, spec: &StatementSpec) -> Result<RowsOrCount, ConnectorError> {
        self.execute_dml_with(spec, CallOptions::default()).await
    }

    /// [`Connector::execute_dml`] with per-call overrides.
    ///
    /// # Errors
    /// Same as [`Connector::execute_dml`].
    pub async fn execute_dml_with(
        &self,
        spec: &StatementSpec,
        options: CallOptions,
    ) -> Result<RowsOrCount, ConnectorError> {
        if spec.is_ddl() {
            return Err(wrong_class(spec, "execute_dml"));
        }
        self.run_single(spec, options).await
    }

    /// Run every statement on one connection inside a transaction. Either all take effect or
    /// none do.
    ///
    /// All statements are compiled before the connection is leased.
    ///
    /// # Errors
    /// `InvalidSpec` before any I/O if a statement cannot be built; otherwise the first failure,
    /// after the transaction was rolled back.
    pub async fn run_transaction(
        &self,
        specs: &[StatementSpec],
    ) -> Result<Vec<RowsOrCount>, ConnectorError> {
        self.run_transaction_with(specs, CallOptions::default())
            .await
    }

    /// [`Connector::run_transaction`] with per-call overrides.
    ///
    /// # Errors
    /// Same as [`Connector::run_transaction`].
    pub async fn run_transaction_with(
        &self,
        specs: &[StatementSpec],
        options: CallOptions,
    ) -> Result<Vec<RowsOrCount>, ConnectorError> {
        let compiled = specs
            .iter()
            .map(|spec| self.compile(spec))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.transaction_with(options).await?;
        let mut outcomes = Vec::with_capacity(compiled.len());
        for stmt in &compiled {
            match tx.execute_compiled(stmt).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    debug!(seq = tx.seq(), error = %err, "rolling back after failed statement");
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(error = %rollback_err, "rollback after failed statement also failed");
                    }
                    return Err(err);
                }
            }
        }
        tx.commit().await?;
        Ok(outcomes)
    }

    /// Start a SELECT and stream its rows. The stream holds a pooled connection until it is
    /// exhausted or dropped.
    ///
    /// # Errors
    /// `InvalidSpec` unless `spec` is a SELECT, `PoolExhausted`, or the classified backend error.
    pub async fn stream_select(&self, spec: &StatementSpec) -> Result<RowStream, ConnectorError> {
        self.stream_select_with(spec, CallOptions::default()).await
    }

    /// [`Connector::stream_select`] with per-call overrides.
    ///
    /// # Errors
    /// Same as [`Connector::stream_select`].
    pub async fn stream_select_with(
        &self,
        spec: &StatementSpec,
        options: CallOptions,
    ) -> Result<RowStream, ConnectorError> {
        if !matches!(spec, StatementSpec::Select(_)) {
            return Err(wrong_class(spec, "stream_select"));
        }
        let stmt = self.compile(spec)?;
        let lease = self.acquire(options).await?;
        executor::execute_streaming(lease, &stmt, self.deadline(options)).await
    }

    /// Lease a connection and begin an explicit transaction on it.
    ///
    /// # Errors
    /// `PoolExhausted`, or the classified BEGIN failure.
    pub async fn transaction(&self) -> Result<Transaction, ConnectorError> {
        self.transaction_with(CallOptions::default()).await
    }

    /// [`Connector::transaction`] with per-call overrides.
    ///
    /// # Errors
    /// Same as [`Connector::transaction`].
    pub async fn transaction_with(
        &self,
        options: CallOptions,
    ) -> Result<Transaction, ConnectorError> {
        let lease = self.acquire(options).await?;
        let mut tx = Transaction::new(lease).with_deadline(self.deadline(options));
        tx.begin().await?;
        Ok(tx)
    }

    /// Wait for outstanding leases and close every connection.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    async fn run_single(
        &self,
        spec: &StatementSpec,
        options: CallOptions,
    ) -> Result<RowsOrCount, ConnectorError> {
        let stmt = self.compile(spec)?;
        let mut lease = self.acquire(options).await?;
        executor::execute_compiled(&mut lease, &stmt, self.deadline(options)).await
    }

    async fn acquire(
        &self,
        options: CallOptions,
    ) -> Result<crate::pool::PooledConnection, ConnectorError> {
        match options.acquire_timeout {
            Some(timeout) => self.pool.acquire_with_timeout(timeout).await,
            None => self.pool.acquire().await,
        }
    }

    fn deadline(&self, options: CallOptions) -> Option<Duration> {
        options.deadline.or(self.config.statement_timeout)
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("engine", &self.config.engine)
            .field("database", &self.config.database)
            .field("pool", &self.pool)
            .finish()
    }
}

fn wrong_class(spec: &StatementSpec, operation: &str) -> ConnectorError {
    ConnectorError::invalid_spec(format!(
        "{operation} does not accept a {} statement",
        spec.kind_name()
    ))
}
