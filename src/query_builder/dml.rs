use crate::error::ConnectorError;
use crate::statement::{CompareOp, Delete, Insert, Predicate, Update};
use crate::types::RowValues;

use super::SqlWriter;

pub(super) fn insert(w: &mut SqlWriter<'_>, insert: &Insert) -> Result<(), ConnectorError> {
    if insert.columns.is_empty() {
        return Err(ConnectorError::invalid_spec(format!(
            "INSERT INTO {} names no columns",
            insert.table.name
        )));
    }
    if insert.rows.is_empty() {
        return Err(ConnectorError::invalid_spec(format!(
            "INSERT INTO {} has no rows",
            insert.table.name
        )));
    }
    if let Some((i, row)) = insert
        .rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != insert.columns.len())
    {
        return Err(ConnectorError::invalid_spec(format!(
            "row {i} has {} values for {} columns",
            row.len(),
            insert.columns.len()
        )));
    }

    w.push("INSERT INTO ");
    w.table(&insert.table)?;
    w.push(" (");
    w.ident_list(&insert.columns)?;
    w.push(") VALUES ");
    for (r, row) in insert.rows.iter().enumerate() {
        if r > 0 {
            w.push(", ");
        }
        w.push("(");
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.bind(value.clone());
        }
        w.push(")");
    }
    Ok(())
}

pub(super) fn update(w: &mut SqlWriter<'_>, update: &Update) -> Result<(), ConnectorError> {
    if update.assignments.is_empty() {
        return Err(ConnectorError::invalid_spec(format!(
            "UPDATE {} has no assignments",
            update.table.name
        )));
    }

    w.push("UPDATE ");
    w.table(&update.table)?;
    w.push(" SET ");
    for (i, (column, value)) in update.assignments.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        w.ident(column)?;
        w.push(" = ");
        w.bind(value.clone());
    }
    where_clause(w, update.filter.as_ref())
}

pub(super) fn delete(w: &mut SqlWriter<'_>, delete: &Delete) -> Result<(), ConnectorError> {
    w.push("DELETE FROM ");
    w.table(&delete.table)?;
    where_clause(w, delete.filter.as_ref())
}

pub(super) fn where_clause(
    w: &mut SqlWriter<'_>,
    filter: Option<&Predicate>,
) -> Result<(), ConnectorError> {
    if let Some(predicate) = filter {
        w.push(" WHERE ");
        predicate_sql(w, predicate)?;
    }
    Ok(())
}

fn predicate_sql(w: &mut SqlWriter<'_>, predicate: &Predicate) -> Result<(), ConnectorError> {
    match predicate {
        Predicate::Compare { column, op, value } => compare(w, column, *op, value),
        Predicate::InList {
            column,
            values,
            negated,
        } => {
            if values.is_empty() {
                return Err(ConnectorError::invalid_spec(format!(
                    "IN list for '{column}' is empty"
                )));
            }
            w.ident(column)?;
            w.push(if *negated { " NOT IN (" } else { " IN (" });
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.bind(value.clone());
            }
            w.push(")");
            Ok(())
        }
        Predicate::IsNull { column, negated } => {
            w.ident(column)?;
            w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            Ok(())
        }
        Predicate::And(items) => junction(w, items, " AND "),
        Predicate::Or(items) => junction(w, items, " OR "),
        Predicate::Not(inner) => {
            w.push("NOT (");
            predicate_sql(w, inner)?;
            w.push(")");
            Ok(())
        }
    }
}

fn compare(
    w: &mut SqlWriter<'_>,
    column: &str,
    op: CompareOp,
    value: &RowValues,
) -> Result<(), ConnectorError> {
    if value.is_null() {
        return Err(ConnectorError::invalid_spec(format!(
            "comparison with NULL on '{column}'; use is_null or is_not_null"
        )));
    }
    w.ident(column)?;
    w.push(" ");
    w.push(op.as_sql());
    w.push(" ");
    if op.is_pattern() {
        let RowValues::Text(text) = value else {
            return Err(ConnectorError::invalid_spec(format!(
                "pattern match on '{column}' needs a text value, got {}",
                value.type_name()
            )));
        };
        w.bind(RowValues::Text(op.wrap_pattern(&escape_like(text))));
        w.push(" ESCAPE '\\'");
    } else {
        w.bind(value.clone());
    }
    Ok(())
}

fn junction(w: &mut SqlWriter<'_>, items: &[Predicate], joiner: &str) -> Result<(), ConnectorError> {
    if items.is_empty() {
        return Err(ConnectorError::invalid_spec(format!(
            "{} with no operands",
            joiner.trim()
        )));
    }
    w.push("(");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            w.push(joiner);
        }
        predicate_sql(w, item)?;
    }
    w.push(")");
    Ok(())
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
