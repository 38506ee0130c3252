mod channel;
mod dispatcher;

use std::sync::mpsc::{self, Sender};
use std::thread;

use rusqlite::types::Value;
use tokio::sync::{mpsc as async_mpsc, oneshot};

use crate::error::NativeError;

use super::errors::worker_closed;
use channel::{Command, Reply, RowReceiver, RowSender};
use dispatcher::run_sqlite_worker;

/// Rows buffered between the worker and the reader.
pub(super) const ROW_BUFFER: usize = 64;

/// Handle to the thread that owns one `rusqlite::Connection`.
///
/// `rusqlite::Connection` is not `Sync`, so every call is shipped to that thread and answered
/// over a oneshot channel.
pub(super) struct SqliteWorker {
    sender: Sender<Command>,
}

impl SqliteWorker {
    pub(super) fn spawn(conn: rusqlite::Connection, id: u64) -> Result<Self, NativeError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        thread::Builder::new()
            .name(format!("sqlite-worker-{id}"))
            .spawn(move || run_sqlite_worker(conn, &receiver))
            .map_err(|err| {
                worker_closed(&format!("failed to spawn SQLite worker thread: {err}"))
            })?;
        Ok(Self { sender })
    }

    fn send_command(&self, command: Command) -> Result<(), NativeError> {
        self.sender
            .send(command)
            .map_err(|_| worker_closed("SQLite worker closed"))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
        drop_message: &'static str,
    ) -> Result<T, NativeError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(build(tx))?;
        rx.await.map_err(|_| worker_closed(drop_message))?
    }

    pub(super) async fn batch(&self, sql: String) -> Result<(), NativeError> {
        self.request(
            |respond_to| Command::Batch { sql, respond_to },
            "SQLite worker dropped while executing batch",
        )
        .await
    }

    pub(super) async fn execute(&self, sql: String, params: Vec<Value>) -> Result<usize, NativeError> {
        self.request(
            |respond_to| Command::Execute {
                sql,
                params,
                respond_to,
            },
            "SQLite worker dropped while executing statement",
        )
        .await
    }

    /// Start a query; returns the column names and the receiving end of the row channel.
    pub(super) async fn query(
        &self,
        sql: String,
        params: Vec<Value>,
    ) -> Result<(Vec<String>, RowReceiver), NativeError> {
        let (rows_to, rows_from): (RowSender, _) = async_mpsc::channel(ROW_BUFFER);
        let columns = self
            .request(
                |columns_to| Command::Query {
                    sql,
                    params,
                    columns_to,
                    rows_to,
                },
                "SQLite worker dropped while starting query",
            )
            .await?;
        Ok((columns, rows_from))
    }

    pub(super) async fn ping(&self) -> Result<(), NativeError> {
        self.request(
            |respond_to| Command::Ping { respond_to },
            "SQLite worker dropped while answering ping",
        )
        .await
    }

    /// Ask the worker to close the connection and wait until it has.
    pub(super) async fn shutdown(&self) -> Result<(), NativeError> {
        self.request(
            |respond_to| Command::Shutdown {
                respond_to: Some(respond_to),
            },
            "SQLite worker exited before closing",
        )
        .await
    }
}

impl Drop for SqliteWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown { respond_to: None });
    }
}
