use rusqlite::types::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::NativeError;
use crate::types::RowValues;

pub(super) type Reply<T> = oneshot::Sender<Result<T, NativeError>>;
pub(super) type RowSender = mpsc::Sender<Result<Vec<RowValues>, NativeError>>;
pub(super) type RowReceiver = mpsc::Receiver<Result<Vec<RowValues>, NativeError>>;

pub(super) enum Command {
    /// Parameterless statements (DDL, transaction control); may hold several statements.
    Batch {
        sql: String,
        respond_to: Reply<()>,
    },
    /// One statement; replies with the number of changed rows.
    Execute {
        sql: String,
        params: Vec<Value>,
        respond_to: Reply<usize>,
    },
    /// One query. Column names go to `columns_to`, then rows are pushed into `rows_to` until
    /// the result is exhausted or the receiver goes away.
    Query {
        sql: String,
        params: Vec<Value>,
        columns_to: Reply<Vec<String>>,
        rows_to: RowSender,
    },
    Ping {
        respond_to: Reply<()>,
    },
    /// Close the connection and stop the thread.
    Shutdown {
        respond_to: Option<Reply<()>>,
    },
}
