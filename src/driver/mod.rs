//! Contract every backend adapter implements.
//!
//! Adapters translate between [`CompiledStatement`]s and their native client and report
//! failures as [`NativeError`]s. They never pick an [`crate::error::ErrorKind`]; that is the job
//! of the mapping table returned by [`Driver::error_map`].

pub mod registry;

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;

use crate::classify::{self, ErrorMapping};
use crate::config::BackendConfig;
use crate::dialect::Dialect;
use crate::error::{ConnectorError, NativeError};
use crate::statement::CompiledStatement;
use crate::types::{EngineKind, RowValues};

/// Lazy stream of raw rows in column order.
pub type RowValuesStream = Pin<Box<dyn Stream<Item = Result<Vec<RowValues>, NativeError>> + Send>>;

/// Rows produced by a statement, before they are wrapped for the caller.
pub struct RawRows {
    pub columns: Arc<Vec<String>>,
    pub rows: RowValuesStream,
}

impl fmt::Debug for RawRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRows")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`DriverConnection::execute`]; matches the statement's
/// [`crate::statement::StatementOutput`].
#[derive(Debug)]
pub enum Execution {
    Ack,
    Affected(u64),
    Rows(RawRows),
}

/// Factory for connections to one engine.
#[async_trait]
pub trait Driver: Send + Sync {
    fn engine(&self) -> EngineKind;

    fn dialect(&self) -> &'static dyn Dialect;

    /// Native code/category to normalized kind table used by [`Driver::classify`].
    fn error_map(&self) -> &'static [ErrorMapping];

    /// Open one new connection.
    async fn connect(&self, config: &BackendConfig) -> Result<Box<dyn DriverConnection>, NativeError>;

    fn classify(&self, err: NativeError) -> ConnectorError {
        classify::classify(err, self.error_map())
    }
}

/// One live backend connection.
///
/// A row stream returned from `execute` borrows the connection's worker or socket; it must be
/// drained or dropped before the next call on the same connection.
#[async_trait]
pub trait DriverConnection: Send {
    async fn execute(&mut self, stmt: &CompiledStatement) -> Result<Execution, NativeError>;

    async fn begin(&mut self) -> Result<(), NativeError>;

    async fn commit(&mut self) -> Result<(), NativeError>;

    async fn rollback(&mut self) -> Result<(), NativeError>;

    /// Cheap liveness check; the pool runs it on long-idle connections before reuse.
    async fn ping(&mut self) -> Result<(), NativeError>;

    /// Close the connection, interrupting anything still running on it.
    async fn disconnect(self: Box<Self>) -> Result<(), NativeError>;
}
