//! Hierarchical-record parser: JSON arrays/objects flattened into columns.

use super::{ParseOutput, ParseStrategy};
use crate::dataset::{Column, ColumnValues, DType, TabularDataset};
use crate::{Result, StoreScoutError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Separator joining a parent column name with a nested key.
const NESTED_SEPARATOR: &str = "_";

/// One flattened cell: either a scalar leaf or a serialized structured value
/// (list of scalars, list of objects).
enum Cell {
    Scalar(Value),
    Structured(String),
}

pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path) -> Result<ParseOutput> {
        let text = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| StoreScoutError::parse("json", e.to_string()))?;

        let objects: Vec<&serde_json::Map<String, Value>> = match &value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object().ok_or_else(|| {
                        StoreScoutError::parse(
                            "json",
                            "top-level array must contain objects",
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Value::Object(map) => vec![map],
            _ => {
                return Err(StoreScoutError::parse(
                    "json",
                    "unsupported JSON structure: expected object or array of objects",
                ))
            }
        };

        if objects.is_empty() {
            return Err(StoreScoutError::parse("json", "no records extracted"));
        }

        let records: Vec<HashMap<String, Cell>> = objects
            .iter()
            .map(|obj| {
                let mut record = HashMap::new();
                for (key, val) in obj.iter() {
                    flatten(key.clone(), val, &mut record);
                }
                record
            })
            .collect();

        let dataset = build_dataset(&records)?;
        Ok(ParseOutput {
            dataset,
            strategy: ParseStrategy::Full,
            structure: None,
        })
    }
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively flatten a value under `key`. Nested objects expand into
/// additional columns; arrays are serialized rather than expanded.
fn flatten(key: String, value: &Value, record: &mut HashMap<String, Cell>) {
    match value {
        Value::Object(map) => {
            for (sub_key, sub_value) in map.iter() {
                flatten(
                    format!("{key}{NESTED_SEPARATOR}{sub_key}"),
                    sub_value,
                    record,
                );
            }
        }
        Value::Array(_) => {
            record.insert(key, Cell::Structured(value.to_string()));
        }
        other => {
            record.insert(key, Cell::Scalar(other.clone()));
        }
    }
}

fn build_dataset(records: &[HashMap<String, Cell>]) -> Result<TabularDataset> {
    // Column order: first appearance, keys sorted within each record.
    let mut order: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for record in records {
        let mut keys: Vec<&String> = record.keys().collect();
        keys.sort();
        for key in keys {
            if seen.insert(key.as_str()) {
                order.push(key.clone());
            }
        }
    }

    let columns = order
        .into_iter()
        .map(|name| build_column(name, records))
        .collect();
    TabularDataset::new(columns)
}

fn build_column(name: String, records: &[HashMap<String, Cell>]) -> Column {
    let cells: Vec<Option<&Cell>> = records.iter().map(|r| r.get(&name)).collect();

    let structured = cells
        .iter()
        .flatten()
        .any(|c| matches!(c, Cell::Structured(_)));
    if structured {
        let values = cells
            .iter()
            .map(|c| {
                c.and_then(|cell| match cell {
                    Cell::Structured(s) => Some(s.clone()),
                    Cell::Scalar(v) => render_scalar(v),
                })
            })
            .collect();
        return Column::new(name, DType::Json, ColumnValues::Text(values));
    }

    let scalars: Vec<Option<&Value>> = cells
        .iter()
        .map(|c| match c {
            Some(Cell::Scalar(v)) if !v.is_null() => Some(v),
            _ => None,
        })
        .collect();
    let non_null: Vec<&Value> = scalars.iter().flatten().copied().collect();

    if !non_null.is_empty() {
        if non_null.iter().all(|v| v.is_boolean()) {
            let values = scalars.iter().map(|v| v.and_then(Value::as_bool)).collect();
            return Column::new(name, DType::Bool, ColumnValues::Bool(values));
        }
        if non_null.iter().all(|v| v.is_i64()) {
            let values = scalars.iter().map(|v| v.and_then(Value::as_i64)).collect();
            return Column::new(name, DType::Int64, ColumnValues::Int(values));
        }
        if non_null.iter().all(|v| v.is_number()) {
            let values = scalars.iter().map(|v| v.and_then(Value::as_f64)).collect();
            return Column::new(name, DType::Float64, ColumnValues::Float(values));
        }
        if non_null.iter().all(|v| v.is_string()) {
            let values = scalars
                .iter()
                .map(|v| v.and_then(Value::as_str).map(|s| s.to_string()))
                .collect();
            return Column::from_strings(name, values);
        }
    }

    // Mixed scalar types degrade to text.
    let values = scalars
        .iter()
        .map(|v| v.and_then(render_scalar))
        .collect();
    Column::new(name, DType::Text, ColumnValues::Text(values))
}

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_array_of_objects() {
        let file = write_file(r#"[{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]"#);
        let output = JsonParser::new().parse(file.path()).unwrap();
        assert_eq!(output.dataset.row_count(), 2);
        assert_eq!(output.dataset.field_count(), 2);
        assert_eq!(output.dataset.column("id").unwrap().dtype, DType::Int64);
    }

    #[test]
    fn test_single_object_is_one_record() {
        let file = write_file(r#"{"id": 1, "active": true}"#);
        let output = JsonParser::new().parse(file.path()).unwrap();
        assert_eq!(output.dataset.row_count(), 1);
        assert_eq!(output.dataset.column("active").unwrap().dtype, DType::Bool);
    }

    #[test]
    fn test_nested_objects_flattened() {
        let file = write_file(
            r#"[{"id": 1, "address": {"city": "Kazan", "geo": {"lat": 55.8}}}]"#,
        );
        let output = JsonParser::new().parse(file.path()).unwrap();
        let names: Vec<&str> = output
            .dataset
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert!(names.contains(&"address_city"));
        assert!(names.contains(&"address_geo_lat"));
    }

    #[test]
    fn test_scalar_lists_serialized() {
        let file = write_file(r#"[{"id": 1, "tags": ["a", "b"]}]"#);
        let output = JsonParser::new().parse(file.path()).unwrap();
        let tags = output.dataset.column("tags").unwrap();
        assert_eq!(tags.dtype, DType::Json);
        assert_eq!(tags.value_as_string(0).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn test_missing_keys_become_null() {
        let file = write_file(r#"[{"id": 1, "extra": "x"}, {"id": 2}]"#);
        let output = JsonParser::new().parse(file.path()).unwrap();
        assert_eq!(output.dataset.column("extra").unwrap().null_count(), 1);
    }

    #[test]
    fn test_empty_array_rejected() {
        let file = write_file("[]");
        assert!(JsonParser::new().parse(file.path()).is_err());
    }

    #[test]
    fn test_scalar_root_rejected() {
        let file = write_file("42");
        assert!(JsonParser::new().parse(file.path()).is_err());
    }
}
