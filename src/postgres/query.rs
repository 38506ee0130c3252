use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;

use crate::types::RowValues;

use super::numeric::PgNumeric;

/// Extract column `idx` of a row, choosing the Rust type from the column's type name.
pub(super) fn extract_value(row: &Row, idx: usize) -> Result<RowValues, tokio_postgres::Error> {
    let type_name = row.columns()[idx].type_().name();
    let value = match type_name {
        "int2" => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        "int8" => row.try_get::<_, Option<i64>>(idx)?.map(RowValues::Int),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| RowValues::Float(f64::from(v))),
        "float8" => row.try_get::<_, Option<f64>>(idx)?.map(RowValues::Float),
        "numeric" => row
            .try_get::<_, Option<PgNumeric>>(idx)?
            .map(|v| RowValues::Float(v.to_f64())),
        "bool" => row.try_get::<_, Option<bool>>(idx)?.map(RowValues::Bool),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(RowValues::Timestamp),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        "json" | "jsonb" => row.try_get::<_, Option<Value>>(idx)?.map(RowValues::JSON),
        "bytea" => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(RowValues::Blob),
        _ => row.try_get::<_, Option<String>>(idx)?.map(RowValues::Text),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

pub(super) fn extract_row(row: &Row) -> Result<Vec<RowValues>, tokio_postgres::Error> {
    (0..row.len()).map(|idx| extract_value(row, idx)).collect()
}
