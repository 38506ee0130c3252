use std::sync::mpsc::Receiver;

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::error::NativeError;

use super::super::errors::native;
use super::super::query::extract_row;
use super::channel::{Command, Reply, RowSender};

pub(super) fn run_sqlite_worker(conn: Connection, receiver: &Receiver<Command>) {
    while let Ok(command) = receiver.recv() {
        match command {
            Command::Batch { sql, respond_to } => {
                let _ = respond_to.send(conn.execute_batch(&sql).map_err(native));
            }
            Command::Execute {
                sql,
                params,
                respond_to,
            } => {
                let _ = respond_to.send(execute(&conn, &sql, &params));
            }
            Command::Query {
                sql,
                params,
                columns_to,
                rows_to,
            } => stream_query(&conn, &sql, &params, columns_to, &rows_to),
            Command::Ping { respond_to } => {
                let _ = respond_to.send(
                    conn.query_row("SELECT 1", [], |_| Ok(()))
                        .map_err(native),
                );
            }
            Command::Shutdown { respond_to } => {
                let closed = conn.close().map_err(|(_, err)| native(err));
                if let Some(respond_to) = respond_to {
                    let _ = respond_to.send(closed);
                }
                return;
            }
        }
    }
}

fn execute(conn: &Connection, sql: &str, params: &[Value]) -> Result<usize, NativeError> {
    let mut stmt = conn.prepare_cached(sql).map_err(native)?;
    stmt.execute(params_from_iter(params.iter())).map_err(native)
}

fn stream_query(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    columns_to: Reply<Vec<String>>,
    rows_to: &RowSender,
) {
    let mut stmt = match conn.prepare_cached(sql) {
        Ok(stmt) => stmt,
        Err(err) => {
            let _ = columns_to.send(Err(native(err)));
            return;
        }
    };
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let width = columns.len();
    let mut rows = match stmt.query(params_from_iter(params.iter())) {
        Ok(rows) => rows,
        Err(err) => {
            let _ = columns_to.send(Err(native(err)));
            return;
        }
    };
    if columns_to.send(Ok(columns)).is_err() {
        return;
    }

    // `blocking_send` applies backpressure; an error means the reader dropped the stream.
    loop {
        let item = match rows.next() {
            Ok(Some(row)) => extract_row(row, width).map_err(native),
            Ok(None) => return,
            Err(err) => Err(native(err)),
        };
        let failed = item.is_err();
        if rows_to.blocking_send(item).is_err() || failed {
            return;
        }
    }
}
