use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// Column name to position, built once per result and shared by its rows.
pub(crate) type ColumnIndex = Arc<HashMap<String, usize>>;

pub(crate) fn column_index(columns: &[String]) -> ColumnIndex {
    Arc::new(
        columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect(),
    )
}

/// A row from a query result, with access to both the column names and the values.
#[derive(Debug, Clone)]
pub struct DbRow {
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
    index: ColumnIndex,
}

impl DbRow {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let index = column_index(&column_names);
        Self::with_index(column_names, values, index)
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        values: Vec<RowValues>,
        index: ColumnIndex,
    ) -> Self {
        Self {
            column_names,
            values,
            index,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }

    /// Position of a column, or `None` if the row has no such column.
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.index.get(column_name) {
            return Some(idx);
        }
        // Engines may fold unquoted aliases to a different case.
        self.column_names
            .iter()
            .position(|col| col.eq_ignore_ascii_case(column_name))
    }

    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }
}
