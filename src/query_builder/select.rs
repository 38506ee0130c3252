use crate::error::ConnectorError;
use crate::statement::{Aggregate, Order, Projection, Select};
use crate::types::RowValues;

use super::SqlWriter;
use super::dml::where_clause;

pub(super) fn select(w: &mut SqlWriter<'_>, select: &Select) -> Result<(), ConnectorError> {
    w.push("SELECT ");
    if select.distinct {
        w.push("DISTINCT ");
    }
    if select.projection.is_empty() {
        w.push("*");
    }
    for (i, item) in select.projection.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        projection(w, item)?;
    }

    w.push(" FROM ");
    w.table(&select.table)?;
    where_clause(w, select.filter.as_ref())?;

    if !select.group_by.is_empty() {
        w.push(" GROUP BY ");
        w.ident_list(&select.group_by)?;
    }

    if !select.order_by.is_empty() {
        w.push(" ORDER BY ");
        for (i, key) in select.order_by.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.ident(&key.column)?;
            w.push(match key.order {
                Order::Asc => " ASC",
                Order::Desc => " DESC",
            });
        }
    }

    match (select.limit, select.offset) {
        (Some(limit), offset) => {
            w.push(" LIMIT ");
            w.bind(count_value("limit", limit)?);
            if let Some(offset) = offset {
                w.push(" OFFSET ");
                w.bind(count_value("offset", offset)?);
            }
        }
        (None, Some(offset)) => {
            if let Some(unbounded) = w.dialect().unbounded_limit() {
                w.push(" LIMIT ");
                w.push(unbounded);
            }
            w.push(" OFFSET ");
            w.bind(count_value("offset", offset)?);
        }
        (None, None) => {}
    }
    Ok(())
}

fn projection(w: &mut SqlWriter<'_>, item: &Projection) -> Result<(), ConnectorError> {
    match item {
        Projection::Column(name) => w.ident(name),
        Projection::Aggregate {
            func,
            column,
            alias,
        } => {
            w.push(func.as_sql());
            w.push("(");
            match column {
                Some(column) => w.ident(column)?,
                None if *func == Aggregate::Count => w.push("*"),
                None => {
                    return Err(ConnectorError::invalid_spec(format!(
                        "{} needs a column",
                        func.as_sql()
                    )));
                }
            }
            w.push(")");
            if let Some(alias) = alias {
                w.push(" AS ");
                w.ident(alias)?;
            }
            Ok(())
        }
    }
}

fn count_value(what: &str, value: u64) -> Result<RowValues, ConnectorError> {
    i64::try_from(value)
        .map(RowValues::Int)
        .map_err(|_| ConnectorError::invalid_spec(format!("{what} {value} is out of range")))
}
