use std::sync::Arc;

use crate::types::RowValues;

use super::row::{ColumnIndex, DbRow, column_index};

/// Fully materialized rows of a query; column names are stored once and shared by every row.
#[derive(Debug, Clone)]
pub struct ResultSet {
    column_names: Arc<Vec<String>>,
    index: ColumnIndex,
    rows: Vec<DbRow>,
}

impl ResultSet {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>) -> Self {
        Self::with_capacity(column_names, 0)
    }

    #[must_use]
    pub fn with_capacity(column_names: Arc<Vec<String>>, capacity: usize) -> Self {
        let index = column_index(&column_names);
        Self {
            column_names,
            index,
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn add_row_values(&mut self, values: Vec<RowValues>) {
        self.rows.push(DbRow::with_index(
            Arc::clone(&self.column_names),
            values,
            Arc::clone(&self.index),
        ));
    }

    pub(crate) fn push(&mut self, row: DbRow) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn rows(&self) -> &[DbRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DbRow> {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = DbRow;
    type IntoIter = std::vec::IntoIter<DbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a DbRow;
    type IntoIter = std::slice::Iter<'a, DbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
