//! Values handed back to callers: materialized result sets and lazy row streams.

mod result_set;
mod row;
mod stream;

pub use result_set::ResultSet;
pub use row::DbRow;
pub use stream::RowStream;

/// Outcome of one statement.
#[derive(Debug, Clone)]
pub enum RowsOrCount {
    /// SELECT rows.
    Rows(ResultSet),
    /// Affected row count of an INSERT, UPDATE or DELETE.
    Count(u64),
    /// Schema change acknowledged.
    Ack,
}

impl RowsOrCount {
    #[must_use]
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            RowsOrCount::Rows(rs) => Some(rs),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_rows(self) -> Option<ResultSet> {
        match self {
            RowsOrCount::Rows(rs) => Some(rs),
            _ => None,
        }
    }

    #[must_use]
    pub fn count(&self) -> Option<u64> {
        match self {
            RowsOrCount::Count(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_ack(&self) -> bool {
        matches!(self, RowsOrCount::Ack)
    }
}
