//! Compiles [`StatementSpec`]s into dialect-specific [`CompiledStatement`]s.
//!
//! Every DML value is bound through a placeholder; only DDL defaults are rendered as literals,
//! since neither engine accepts parameters in schema statements.

mod ddl;
mod dml;
mod ident;
mod select;

pub use ident::validate_identifier;

use crate::dialect::Dialect;
use crate::error::ConnectorError;
use crate::statement::{CompiledStatement, StatementOutput, StatementSpec, TableRef};
use crate::types::RowValues;

/// Compile a statement for the given dialect. Pure; performs no I/O.
///
/// # Errors
/// Returns `InvalidSpec` if the statement cannot be expressed (empty column lists, bad
/// identifiers, unsupported values).
pub fn build(spec: &StatementSpec, dialect: &dyn Dialect) -> Result<CompiledStatement, ConnectorError> {
    let mut w = SqlWriter::new(dialect);
    let output = match spec {
        StatementSpec::CreateTable(create) => {
            ddl::create_table(&mut w, create)?;
            StatementOutput::Ack
        }
        StatementSpec::DropTable(drop) => {
            ddl::drop_table(&mut w, drop)?;
            StatementOutput::Ack
        }
        StatementSpec::AlterTable(alter) => {
            ddl::alter_table(&mut w, alter)?;
            StatementOutput::Ack
        }
        StatementSpec::Insert(insert) => {
            dml::insert(&mut w, insert)?;
            StatementOutput::Affected
        }
        StatementSpec::Update(update) => {
            dml::update(&mut w, update)?;
            StatementOutput::Affected
        }
        StatementSpec::Delete(delete) => {
            dml::delete(&mut w, delete)?;
            StatementOutput::Affected
        }
        StatementSpec::Select(select) => {
            select::select(&mut w, select)?;
            StatementOutput::Rows
        }
    };
    Ok(w.finish(output))
}

/// Accumulates statement text and bound values; `bind` keeps the two in lockstep.
pub(crate) struct SqlWriter<'d> {
    dialect: &'d dyn Dialect,
    sql: String,
    params: Vec<RowValues>,
}

impl<'d> SqlWriter<'d> {
    fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            sql: String::with_capacity(128),
            params: Vec::new(),
        }
    }

    pub(crate) fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    pub(crate) fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    pub(crate) fn ident(&mut self, name: &str) -> Result<(), ConnectorError> {
        validate_identifier(name, self.dialect)?;
        let quoted = self.dialect.quote_identifier(name);
        self.sql.push_str(&quoted);
        Ok(())
    }

    pub(crate) fn ident_list<'a, I>(&mut self, names: I) -> Result<(), ConnectorError>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(name)?;
        }
        Ok(())
    }

    pub(crate) fn table(&mut self, table: &TableRef) -> Result<(), ConnectorError> {
        if let Some(schema) = &table.schema {
            self.ident(schema)?;
            self.push(".");
        }
        self.ident(&table.name)
    }

    pub(crate) fn bind(&mut self, value: RowValues) {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    fn finish(self, output: StatementOutput) -> CompiledStatement {
        CompiledStatement::new(self.sql, self.params, output)
    }
}
