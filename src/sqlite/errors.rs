use crate::classify::ErrorMapping;
use crate::error::{ErrorKind, NativeError};

/// `SQLite` primary result codes and worker failures.
pub(super) static ERROR_MAP: &[ErrorMapping] = &[
    // SQLITE_CONSTRAINT
    ErrorMapping::code("19", ErrorKind::ConstraintViolation),
    // SQLITE_MISMATCH, raised by STRICT tables
    ErrorMapping::code("20", ErrorKind::ConstraintViolation),
    // SQLITE_ERROR: syntax errors and missing tables or columns
    ErrorMapping::code("1", ErrorKind::Syntax),
    // SQLITE_BUSY, SQLITE_LOCKED, SQLITE_INTERRUPT
    ErrorMapping::code("5", ErrorKind::Timeout),
    ErrorMapping::code("6", ErrorKind::Timeout),
    ErrorMapping::code("9", ErrorKind::Timeout),
    // SQLITE_IOERR, SQLITE_CANTOPEN, SQLITE_NOTADB
    ErrorMapping::code("10", ErrorKind::Connectivity),
    ErrorMapping::code("14", ErrorKind::Connectivity),
    ErrorMapping::code("26", ErrorKind::Connectivity),
    ErrorMapping::category(WORKER_CLOSED, ErrorKind::Connectivity),
    // Tokenizer and parser errors that carry an offset into the SQL
    ErrorMapping::category(SQL_INPUT, ErrorKind::Syntax),
];

pub(super) const WORKER_CLOSED: &str = "worker_closed";
const SQL_INPUT: &str = "sql_input";

/// Native code is the primary result code; category is the `rusqlite` error variant.
pub(super) fn native(err: rusqlite::Error) -> NativeError {
    let code = match &err {
        rusqlite::Error::SqlInputError { error, .. } => Some(error),
        other => other.sqlite_error(),
    }
    .map(|e| (e.extended_code & 0xff).to_string());
    let category = match &err {
        rusqlite::Error::SqliteFailure(..) => "sqlite_failure",
        rusqlite::Error::SqlInputError { .. } => SQL_INPUT,
        rusqlite::Error::InvalidColumnType(..) | rusqlite::Error::FromSqlConversionFailure(..) => {
            "conversion"
        }
        rusqlite::Error::InvalidParameterCount(..) => "parameter_count",
        rusqlite::Error::InvalidQuery | rusqlite::Error::MultipleStatement => "invalid_query",
        rusqlite::Error::ExecuteReturnedResults => "execute_returned_results",
        _ => "driver",
    };
    let mut out = NativeError::new(err.to_string()).with_category(category);
    if let Some(code) = code {
        out = out.with_code(code);
    }
    out.with_source(err)
}

pub(super) fn worker_closed(message: &str) -> NativeError {
    NativeError::new(message).with_category(WORKER_CLOSED)
}
