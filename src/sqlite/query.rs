use rusqlite::types::Value;

use crate::types::RowValues;

/// Read column `idx` of a `SQLite` row. Storage classes map one-to-one; booleans and
/// timestamps come back as the integers and text they were stored as.
pub(super) fn extract_value(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<RowValues> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

pub(super) fn extract_row(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<RowValues>> {
    (0..width).map(|idx| extract_value(row, idx)).collect()
}
