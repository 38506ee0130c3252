//! Shared statement execution path for the facade and for transactions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::driver::Execution;
use crate::error::{ConnectorError, ErrorKind};
use crate::pool::PooledConnection;
use crate::results::{RowStream, RowsOrCount};
use crate::statement::CompiledStatement;

/// Run one statement on a leased connection and materialize its outcome.
///
/// A deadline expiry marks the connection broken, since the statement may still be running on
/// it; so does any connectivity failure.
pub(crate) async fn execute_compiled(
    lease: &mut PooledConnection,
    stmt: &CompiledStatement,
    deadline: Option<Duration>,
) -> Result<RowsOrCount, ConnectorError> {
    debug!(
        engine = %lease.driver().engine(),
        conn_id = lease.id(),
        sql = %stmt.sql,
        params = stmt.params.len(),
        "executing statement"
    );
    let driver = Arc::clone(lease.driver());
    let work = async {
        let conn = lease.conn_mut()?;
        match conn.execute(stmt).await.map_err(|e| driver.classify(e))? {
            Execution::Ack => Ok(RowsOrCount::Ack),
            Execution::Affected(n) => Ok(RowsOrCount::Count(n)),
            Execution::Rows(raw) => RowStream::new(raw, Arc::clone(&driver), None)
                .collect()
                .await
                .map(RowsOrCount::Rows),
        }
    };
    let outcome = with_deadline(work, deadline).await;
    settle(lease, outcome)
}

/// Start a SELECT and hand back a stream that owns the lease.
///
/// The deadline covers the statement start only; rows are pulled at the caller's pace.
pub(crate) async fn execute_streaming(
    mut lease: PooledConnection,
    stmt: &CompiledStatement,
    deadline: Option<Duration>,
) -> Result<RowStream, ConnectorError> {
    debug!(
        engine = %lease.driver().engine(),
        conn_id = lease.id(),
        sql = %stmt.sql,
        "streaming select"
    );
    let driver = Arc::clone(lease.driver());
    let work = async {
        let conn = lease.conn_mut()?;
        conn.execute(stmt).await.map_err(|e| driver.classify(e))
    };
    let outcome = with_deadline(work, deadline).await;
    match settle(&mut lease, outcome)? {
        Execution::Rows(raw) => Ok(RowStream::new(raw, driver, Some(lease))),
        Execution::Ack | Execution::Affected(_) => Err(ConnectorError::invalid_spec(
            "statement did not produce rows",
        )),
    }
}

/// Outer `Err` carries the limit that expired.
async fn with_deadline<T, F>(work: F, deadline: Option<Duration>) -> Result<T, Duration>
where
    F: Future<Output = T>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| limit),
        None => Ok(work.await),
    }
}

fn settle<T>(
    lease: &mut PooledConnection,
    outcome: Result<Result<T, ConnectorError>, Duration>,
) -> Result<T, ConnectorError> {
    match outcome {
        Err(limit) => {
            lease.mark_broken();
            Err(ConnectorError::deadline_elapsed(format!(
                "statement exceeded its {limit:?} deadline"
            )))
        }
        Ok(Err(err)) if err.kind() == ErrorKind::Connectivity => {
            lease.mark_broken();
            Err(err)
        }
        Ok(result) => result,
    }
}
