use std::collections::BTreeSet;

use crate::domain::{Column, RecipeRecord};
use crate::errors::DatasetError;

/// Read-only recipe collection shared by every request once loaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetStore {
    records: Vec<RecipeRecord>,
    columns: BTreeSet<Column>,
}

impl DatasetStore {
    pub fn new(records: Vec<RecipeRecord>, columns: impl IntoIterator<Item = Column>) -> Self {
        Self { records, columns: columns.into_iter().collect() }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, DatasetError> {
        crate::dataset::loader::parse_dataset(raw)
    }

    pub fn records(&self) -> &[RecipeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the column exists in the dataset schema at all, regardless of
    /// whether any particular record carries a value for it.
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }

    pub fn missing_columns(&self) -> Vec<Column> {
        Column::ALL.into_iter().filter(|column| !self.has_column(*column)).collect()
    }
}
