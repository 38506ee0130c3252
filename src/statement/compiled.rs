use crate::types::RowValues;

/// What the adapter should hand back after running a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOutput {
    /// Schema change; nothing but success.
    Ack,
    /// Write; number of affected rows.
    Affected,
    /// Read; a row stream.
    Rows,
}

/// Backend-specific statement text plus its bound values.
///
/// The `n`-th placeholder in `sql` binds `params[n - 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<RowValues>,
    pub output: StatementOutput,
}

impl CompiledStatement {
    #[must_use]
    pub fn new(sql: impl Into<String>, params: Vec<RowValues>, output: StatementOutput) -> Self {
        Self {
            sql: sql.into(),
            params,
            output,
        }
    }
}
