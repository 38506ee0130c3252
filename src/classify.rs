//! Translation of adapter errors into the shared [`ErrorKind`] taxonomy.
//!
//! Each adapter ships a static mapping table. Lookups prefer an exact code match, then the
//! longest matching code prefix (for class-structured codes such as SQLSTATE), then the native
//! category. Anything else is [`ErrorKind::Unknown`].

use crate::error::{ConnectorError, ErrorKind, NativeError};

/// What a mapping entry matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeMatch {
    Code(&'static str),
    CodePrefix(&'static str),
    Category(&'static str),
}

/// One row of an adapter's mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorMapping {
    pub matches: NativeMatch,
    pub kind: ErrorKind,
}

impl ErrorMapping {
    #[must_use]
    pub const fn code(code: &'static str, kind: ErrorKind) -> Self {
        Self {
            matches: NativeMatch::Code(code),
            kind,
        }
    }

    #[must_use]
    pub const fn code_prefix(prefix: &'static str, kind: ErrorKind) -> Self {
        Self {
            matches: NativeMatch::CodePrefix(prefix),
            kind,
        }
    }

    #[must_use]
    pub const fn category(category: &'static str, kind: ErrorKind) -> Self {
        Self {
            matches: NativeMatch::Category(category),
            kind,
        }
    }
}

/// Resolve the normalized kind for a native error without consuming it.
#[must_use]
pub fn resolve_kind(err: &NativeError, table: &[ErrorMapping]) -> ErrorKind {
    if let Some(code) = err.code.as_deref() {
        let exact = table.iter().find_map(|entry| match entry.matches {
            NativeMatch::Code(c) if c == code => Some(entry.kind),
            _ => None,
        });
        if let Some(kind) = exact {
            return kind;
        }

        let by_prefix = table
            .iter()
            .filter_map(|entry| match entry.matches {
                NativeMatch::CodePrefix(p) if code.starts_with(p) => Some((p.len(), entry.kind)),
                _ => None,
            })
            .max_by_key(|(len, _)| *len);
        if let Some((_, kind)) = by_prefix {
            return kind;
        }
    }

    if let Some(category) = err.category.as_deref() {
        let by_category = table.iter().find_map(|entry| match entry.matches {
            NativeMatch::Category(c) if c == category => Some(entry.kind),
            _ => None,
        });
        if let Some(kind) = by_category {
            return kind;
        }
    }

    ErrorKind::Unknown
}

/// Classify an adapter failure against its mapping table.
#[must_use]
pub fn classify(err: NativeError, table: &[ErrorMapping]) -> ConnectorError {
    let kind = resolve_kind(&err, table);
    let NativeError {
        code,
        message,
        source,
        ..
    } = err;
    ConnectorError::new(kind, code, message, source)
}
