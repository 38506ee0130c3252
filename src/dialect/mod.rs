//! Per-engine SQL spelling: identifier quoting, placeholders, type names and literals.

mod postgres;
mod sqlite;

use std::fmt;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::types::ColumnType;

/// Target placeholder style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
}

impl PlaceholderStyle {
    #[must_use]
    pub fn render(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Postgres => format!("${index}"),
            PlaceholderStyle::Sqlite => format!("?{index}"),
        }
    }

    /// The character that introduces a placeholder.
    #[must_use]
    pub fn sigil(self) -> char {
        match self {
            PlaceholderStyle::Postgres => '$',
            PlaceholderStyle::Sqlite => '?',
        }
    }
}

/// SQL spelling rules for one engine.
///
/// Identifiers reach `quote_identifier` only after validation, so implementations do not need
/// to escape embedded quotes.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Longest identifier the engine keeps without truncation.
    fn max_identifier_len(&self) -> usize;

    fn column_type(&self, ty: ColumnType) -> String;

    fn bool_literal(&self, value: bool) -> &'static str;

    fn blob_literal(&self, bytes: &[u8]) -> String;

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    fn placeholder(&self, index: usize) -> String {
        self.placeholder_style().render(index)
    }

    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    /// Engines that reject a bare OFFSET get `LIMIT <this>` in front of it.
    fn unbounded_limit(&self) -> Option<&'static str> {
        None
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
