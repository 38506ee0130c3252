use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_postgres::Client;

use crate::driver::{DriverConnection, Execution, RawRows};
use crate::error::NativeError;
use crate::statement::{CompiledStatement, StatementOutput};

use super::errors::native;
use super::params::as_refs;
use super::query::extract_row;

/// A `tokio-postgres` client plus the task driving its socket.
pub(super) struct PostgresConnection {
    client: Client,
    task: JoinHandle<()>,
}

impl PostgresConnection {
    pub(super) fn new(client: Client, task: JoinHandle<()>) -> Self {
        Self { client, task }
    }
}

#[async_trait]
impl DriverConnection for PostgresConnection {
    async fn execute(&mut self, stmt: &CompiledStatement) -> Result<Execution, NativeError> {
        if stmt.output == StatementOutput::Ack && stmt.params.is_empty() {
            self.client.batch_execute(&stmt.sql).await.map_err(native)?;
            return Ok(Execution::Ack);
        }

        let prepared = self.client.prepare(&stmt.sql).await.map_err(native)?;
        let params = as_refs(&stmt.params);
        match stmt.output {
            StatementOutput::Ack => {
                self.client
                    .execute(&prepared, &params)
                    .await
                    .map_err(native)?;
                Ok(Execution::Ack)
            }
            StatementOutput::Affected => {
                let changed = self
                    .client
                    .execute(&prepared, &params)
                    .await
                    .map_err(native)?;
                Ok(Execution::Affected(changed))
            }
            StatementOutput::Rows => {
                let columns: Vec<String> = prepared
                    .columns()
                    .iter()
                    .map(|col| col.name().to_owned())
                    .collect();
                let rows = self
                    .client
                    .query_raw(&prepared, params.iter().copied())
                    .await
                    .map_err(native)?
                    .map(|row| row.and_then(|row| extract_row(&row)).map_err(native));
                Ok(Execution::Rows(RawRows {
                    columns: Arc::new(columns),
                    rows: Box::pin(rows),
                }))
            }
        }
    }

    async fn begin(&mut self) -> Result<(), NativeError> {
        self.client.batch_execute("BEGIN").await.map_err(native)
    }

    async fn commit(&mut self) -> Result<(), NativeError> {
        self.client.batch_execute("COMMIT").await.map_err(native)
    }

    async fn rollback(&mut self) -> Result<(), NativeError> {
        self.client.batch_execute("ROLLBACK").await.map_err(native)
    }

    async fn ping(&mut self) -> Result<(), NativeError> {
        self.client.simple_query("SELECT 1").await.map_err(native)?;
        Ok(())
    }

    async fn disconnect(self: Box<Self>) -> Result<(), NativeError> {
        let Self { client, task } = *self;
        // Dropping the last client handle makes the connection task send Terminate and exit.
        drop(client);
        task.await
            .map_err(|err| NativeError::new(format!("postgres connection task failed: {err}")))
    }
}
