use std::collections::HashSet;

use crate::error::ConnectorError;
use crate::statement::{AlterAction, AlterTable, ColumnDef, CreateTable, DefaultValue, DropTable};
use crate::types::RowValues;

use super::SqlWriter;

pub(super) fn create_table(w: &mut SqlWriter<'_>, create: &CreateTable) -> Result<(), ConnectorError> {
    if create.columns.is_empty() {
        return Err(ConnectorError::invalid_spec(format!(
            "CREATE TABLE {} needs at least one column",
            create.table.name
        )));
    }

    let mut seen = HashSet::with_capacity(create.columns.len());
    for column in &create.columns {
        if !seen.insert(column.name.to_ascii_lowercase()) {
            return Err(ConnectorError::invalid_spec(format!(
                "column '{}' is defined twice",
                column.name
            )));
        }
    }

    let pk_columns: Vec<&String> = create
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| &c.name)
        .collect();
    let inline_pk = pk_columns.len() == 1;

    w.push("CREATE TABLE ");
    if create.if_not_exists {
        w.push("IF NOT EXISTS ");
    }
    w.table(&create.table)?;
    w.push(" (");
    for (i, column) in create.columns.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        column_def(w, column, inline_pk)?;
    }
    if pk_columns.len() > 1 {
        w.push(", PRIMARY KEY (");
        w.ident_list(pk_columns)?;
        w.push(")");
    }
    w.push(")");
    Ok(())
}

pub(super) fn drop_table(w: &mut SqlWriter<'_>, drop: &DropTable) -> Result<(), ConnectorError> {
    w.push("DROP TABLE ");
    if drop.if_exists {
        w.push("IF EXISTS ");
    }
    w.table(&drop.table)
}

pub(super) fn alter_table(w: &mut SqlWriter<'_>, alter: &AlterTable) -> Result<(), ConnectorError> {
    w.push("ALTER TABLE ");
    w.table(&alter.table)?;
    match &alter.action {
        AlterAction::AddColumn(column) => {
            if column.primary_key {
                return Err(ConnectorError::invalid_spec(format!(
                    "cannot add primary key column '{}' to an existing table",
                    column.name
                )));
            }
            w.push(" ADD COLUMN ");
            column_def(w, column, false)?;
        }
        AlterAction::DropColumn(name) => {
            w.push(" DROP COLUMN ");
            w.ident(name)?;
        }
        AlterAction::RenameColumn { from, to } => {
            w.push(" RENAME COLUMN ");
            w.ident(from)?;
            w.push(" TO ");
            w.ident(to)?;
        }
        AlterAction::RenameTable(to) => {
            w.push(" RENAME TO ");
            w.ident(to)?;
        }
    }
    Ok(())
}

fn column_def(w: &mut SqlWriter<'_>, column: &ColumnDef, inline_pk: bool) -> Result<(), ConnectorError> {
    w.ident(&column.name)?;
    w.push(" ");
    let ty = w.dialect().column_type(column.column_type);
    w.push(&ty);
    if !column.nullable {
        w.push(" NOT NULL");
    }
    if let Some(default) = &column.default {
        w.push(" DEFAULT ");
        let rendered = match default {
            DefaultValue::CurrentTimestamp => w.dialect().current_timestamp().to_owned(),
            DefaultValue::Literal(value) => literal(w, value)?,
        };
        w.push(&rendered);
    }
    if column.primary_key && inline_pk {
        w.push(" PRIMARY KEY");
    }
    if column.unique {
        w.push(" UNIQUE");
    }
    Ok(())
}

/// Render a DDL default. Engines take no bind parameters in schema statements, so values are
/// spelled out here and string content is quote-escaped.
fn literal(w: &SqlWriter<'_>, value: &RowValues) -> Result<String, ConnectorError> {
    let dialect = w.dialect();
    let rendered = match value {
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) if f.is_finite() => {
            let text = f.to_string();
            if text.contains(['.', 'e', 'E']) {
                text
            } else {
                format!("{text}.0")
            }
        }
        RowValues::Float(f) => {
            return Err(ConnectorError::invalid_spec(format!(
                "default value {f} is not a finite number"
            )));
        }
        RowValues::Text(s) => quote_literal(s),
        RowValues::Bool(b) => dialect.bool_literal(*b).to_owned(),
        RowValues::Timestamp(ts) => quote_literal(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        RowValues::Null => "NULL".to_owned(),
        RowValues::JSON(json) => quote_literal(&json.to_string()),
        RowValues::Blob(bytes) => dialect.blob_literal(bytes),
    };
    Ok(rendered)
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
