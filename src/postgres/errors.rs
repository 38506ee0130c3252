use std::error::Error as _;

use crate::classify::ErrorMapping;
use crate::error::{ErrorKind, NativeError};

/// SQLSTATE classes and codes, plus client-side failure categories.
pub(super) static ERROR_MAP: &[ErrorMapping] = &[
    ErrorMapping::code_prefix("08", ErrorKind::Connectivity),
    ErrorMapping::code_prefix("23", ErrorKind::ConstraintViolation),
    ErrorMapping::code_prefix("42", ErrorKind::Syntax),
    // query_canceled, lock_not_available, serialization_failure, deadlock_detected
    ErrorMapping::code("57014", ErrorKind::Timeout),
    ErrorMapping::code("55P03", ErrorKind::Timeout),
    ErrorMapping::code("40001", ErrorKind::Timeout),
    ErrorMapping::code("40P01", ErrorKind::Timeout),
    // admin_shutdown, crash_shutdown, cannot_connect_now
    ErrorMapping::code("57P01", ErrorKind::Connectivity),
    ErrorMapping::code("57P02", ErrorKind::Connectivity),
    ErrorMapping::code("57P03", ErrorKind::Connectivity),
    ErrorMapping::category("closed", ErrorKind::Connectivity),
    ErrorMapping::category("io", ErrorKind::Connectivity),
];

/// Native code is the SQLSTATE; category says where the failure came from.
pub(super) fn native(err: tokio_postgres::Error) -> NativeError {
    let code = err.code().map(|state| state.code().to_owned());
    let category = if err.is_closed() {
        "closed"
    } else if err
        .source()
        .is_some_and(|source| source.is::<std::io::Error>())
    {
        "io"
    } else if code.is_some() {
        "db"
    } else {
        "client"
    };
    let message = err
        .as_db_error()
        .map_or_else(|| err.to_string(), |db| db.message().to_owned());
    let mut out = NativeError::new(message).with_category(category);
    if let Some(code) = code {
        out = out.with_code(code);
    }
    out.with_source(err)
}
