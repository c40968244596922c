use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Deserializer, Map, Value};

use crate::dataset::store::DatasetStore;
use crate::domain::{Column, RecipeRecord};
use crate::errors::DatasetError;

/// Parses a recipe dataset from JSON text.
///
/// Accepted layouts:
/// - an array of row objects
/// - JSON Lines, one row object per line
/// - a columnar object, either `{"Name": [..], ..}` or the pandas
///   `orient="columns"` shape `{"Name": {"0": .., "1": ..}, ..}`
pub fn parse_dataset(raw: &str) -> Result<DatasetStore, DatasetError> {
    let mut documents = Deserializer::from_str(raw)
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = BTreeSet::new();
    let rows = match documents.len() {
        0 => return Err(DatasetError::Layout("dataset file is empty".to_string())),
        1 => match documents.remove(0) {
            Value::Array(rows) => rows_from_array(rows)?,
            Value::Object(object) if is_columnar(&object) => {
                columns.extend(object.keys().filter_map(|key| Column::from_source_name(key)));
                rows_from_columns(object)?
            }
            Value::Object(row) => vec![row],
            other => {
                return Err(DatasetError::Layout(format!(
                    "expected an array or object at the top level, found {}",
                    kind_of(&other)
                )))
            }
        },
        _ => rows_from_array(documents)?,
    };

    let records = rows
        .iter()
        .map(|row| {
            columns.extend(row.keys().filter_map(|key| Column::from_source_name(key)));
            RecipeRecord::from_row(row)
        })
        .collect::<Vec<_>>();

    Ok(DatasetStore::new(records, columns))
}

fn rows_from_array(values: Vec<Value>) -> Result<Vec<Map<String, Value>>, DatasetError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(row) => Ok(row),
            other => Err(DatasetError::Layout(format!(
                "row {index} is {} instead of an object",
                kind_of(&other)
            ))),
        })
        .collect()
}

/// A row can legitimately hold list cells, so only a scalar column stored as
/// an array or index map marks the object as columnar.
fn is_columnar(object: &Map<String, Value>) -> bool {
    let uniform = object.values().all(Value::is_array) || object.values().all(is_index_map);
    let scalar_column_spread = object.iter().any(|(key, value)| {
        Column::from_source_name(key).is_some_and(|column| !column.holds_lists())
            && (value.is_array() || is_index_map(value))
    });
    uniform && scalar_column_spread
}

fn is_index_map(value: &Value) -> bool {
    value.as_object().is_some_and(|cells| cells.keys().all(|key| key.parse::<usize>().is_ok()))
}

fn rows_from_columns(
    object: Map<String, Value>,
) -> Result<Vec<Map<String, Value>>, DatasetError> {
    let mut expected_len = None;
    let mut cells_by_row: BTreeMap<usize, Map<String, Value>> = BTreeMap::new();

    for (column, values) in object {
        let indexed = match values {
            Value::Array(values) => {
                let len = values.len();
                match expected_len {
                    None => expected_len = Some(len),
                    Some(expected) if expected != len => {
                        return Err(DatasetError::Layout(format!(
                            "column `{column}` has {len} values, expected {expected}"
                        )))
                    }
                    Some(_) => {}
                }
                values.into_iter().enumerate().collect::<Vec<_>>()
            }
            Value::Object(cells) => cells
                .into_iter()
                .filter_map(|(key, value)| key.parse::<usize>().ok().map(|index| (index, value)))
                .collect::<Vec<_>>(),
            _ => continue,
        };

        for (index, value) in indexed {
            cells_by_row.entry(index).or_default().insert(column.clone(), value);
        }
    }

    Ok(cells_by_row.into_values().collect())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
