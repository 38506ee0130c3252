use rusqlite::types::Value;

use crate::types::RowValues;

/// Convert a bound value to an owned `rusqlite` value so it can cross to the worker thread.
#[must_use]
pub(super) fn to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(json) => Value::Text(json.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

pub(super) fn convert(params: &[RowValues]) -> Vec<Value> {
    params.iter().map(to_sqlite_value).collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn booleans_and_timestamps_use_sqlite_storage_classes() {
        assert_eq!(to_sqlite_value(&RowValues::Bool(true)), Value::Integer(1));
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap();
        assert_eq!(
            to_sqlite_value(&RowValues::Timestamp(ts)),
            Value::Text("2024-01-02 03:04:05".into())
        );
    }
}
