use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::{FusedStream, Stream, StreamExt};

use crate::driver::{Driver, RawRows, RowValuesStream};
use crate::error::{ConnectorError, ErrorKind};
use crate::pool::PooledConnection;

use super::ResultSet;
use super::row::{ColumnIndex, DbRow, column_index};

/// Lazy, single-pass stream of rows.
///
/// When returned by [`crate::Connector::stream_select`] the stream owns the connection it reads
/// from; the connection goes back to the pool once the stream is exhausted, fails or is dropped.
pub struct RowStream {
    columns: Arc<Vec<String>>,
    index: ColumnIndex,
    driver: Arc<dyn Driver>,
    // Declared before `lease` so the rows are dropped before the connection is released.
    rows: Option<RowValuesStream>,
    lease: Option<PooledConnection>,
}

impl RowStream {
    pub(crate) fn new(raw: RawRows, driver: Arc<dyn Driver>, lease: Option<PooledConnection>) -> Self {
        let index = column_index(&raw.columns);
        Self {
            columns: raw.columns,
            index,
            driver,
            rows: Some(raw.rows),
            lease,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Next row, or `Ok(None)` once the stream is exhausted.
    ///
    /// # Errors
    /// Returns the classified backend error that ended the stream.
    pub async fn next_row(&mut self) -> Result<Option<DbRow>, ConnectorError> {
        self.next().await.transpose()
    }

    /// Drain the remaining rows into a [`ResultSet`].
    ///
    /// # Errors
    /// Returns the first backend error; rows read before it are discarded.
    pub async fn collect(mut self) -> Result<ResultSet, ConnectorError> {
        let mut result = ResultSet::new(Arc::clone(&self.columns));
        while let Some(row) = self.next_row().await? {
            result.push(row);
        }
        Ok(result)
    }

    fn finish(&mut self) {
        self.rows = None;
        self.lease = None;
    }
}

impl Stream for RowStream {
    type Item = Result<DbRow, ConnectorError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(rows) = this.rows.as_mut() else {
            return Poll::Ready(None);
        };
        match rows.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(values))) => Poll::Ready(Some(Ok(DbRow::with_index(
                Arc::clone(&this.columns),
                values,
                Arc::clone(&this.index),
            )))),
            Poll::Ready(Some(Err(native))) => {
                let err = this.driver.classify(native);
                if err.kind() == ErrorKind::Connectivity
                    && let Some(lease) = this.lease.as_mut()
                {
                    lease.mark_broken();
                }
                this.finish();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
        }
    }
}

impl FusedStream for RowStream {
    fn is_terminated(&self) -> bool {
        self.rows.is_none()
    }
}

impl fmt::Debug for RowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream")
            .field("columns", &self.columns)
            .field("finished", &self.rows.is_none())
            .field("conn_id", &self.lease.as_ref().map(PooledConnection::id))
            .finish()
    }
}
