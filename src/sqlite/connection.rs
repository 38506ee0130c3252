use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use rusqlite::InterruptHandle;

use crate::driver::{DriverConnection, Execution, RawRows};
use crate::error::NativeError;
use crate::statement::{CompiledStatement, StatementOutput};

use super::params::convert;
use super::worker::SqliteWorker;

/// `SQLite` connection served by a dedicated worker thread.
pub(super) struct SqliteConnection {
    worker: SqliteWorker,
    interrupt: InterruptHandle,
}

impl SqliteConnection {
    pub(super) fn new(worker: SqliteWorker, interrupt: InterruptHandle) -> Self {
        Self { worker, interrupt }
    }
}

#[async_trait]
impl DriverConnection for SqliteConnection {
    async fn execute(&mut self, stmt: &CompiledStatement) -> Result<Execution, NativeError> {
        match stmt.output {
            StatementOutput::Ack if stmt.params.is_empty() => {
                self.worker.batch(stmt.sql.clone()).await?;
                Ok(Execution::Ack)
            }
            StatementOutput::Ack => {
                self.worker
                    .execute(stmt.sql.clone(), convert(&stmt.params))
                    .await?;
                Ok(Execution::Ack)
            }
            StatementOutput::Affected => {
                let changed = self
                    .worker
                    .execute(stmt.sql.clone(), convert(&stmt.params))
                    .await?;
                Ok(Execution::Affected(
                    u64::try_from(changed).unwrap_or(u64::MAX),
                ))
            }
            StatementOutput::Rows => {
                let (columns, receiver) = self
                    .worker
                    .query(stmt.sql.clone(), convert(&stmt.params))
                    .await?;
                let rows = stream::unfold(receiver, |mut receiver| async move {
                    receiver.recv().await.map(|item| (item, receiver))
                });
                Ok(Execution::Rows(RawRows {
                    columns: Arc::new(columns),
                    rows: Box::pin(rows),
                }))
            }
        }
    }

    async fn begin(&mut self) -> Result<(), NativeError> {
        self.worker.batch("BEGIN".into()).await
    }

    async fn commit(&mut self) -> Result<(), NativeError> {
        self.worker.batch("COMMIT".into()).await
    }

    async fn rollback(&mut self) -> Result<(), NativeError> {
        self.worker.batch("ROLLBACK".into()).await
    }

    async fn ping(&mut self) -> Result<(), NativeError> {
        self.worker.ping().await
    }

    async fn disconnect(self: Box<Self>) -> Result<(), NativeError> {
        self.interrupt.interrupt();
        self.worker.shutdown().await
    }
}
