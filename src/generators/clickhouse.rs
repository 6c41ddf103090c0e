//! Columnar DDL: MergeTree layout with time partitioning and an optional
//! daily aggregation view.

use super::{
    clean_identifier, is_nullable, pick_primary_key, temporal_column, unique_ratio,
    DdlGenerator,
};
use crate::profile::{FeatureSet, StorageType};

/// Below this distinct-value ratio a string column is dictionary-encoded.
const LOW_CARDINALITY_RATIO: f64 = 0.1;
/// At most this many identifier columns join the sorting key.
const MAX_ORDER_KEY_IDS: usize = 3;
/// At most this many numeric columns are summed in the daily view.
const MAX_SUMMED_COLUMNS: usize = 3;

pub struct ClickHouseGenerator;

impl ClickHouseGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClickHouseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DdlGenerator for ClickHouseGenerator {
    fn storage_type(&self) -> StorageType {
        StorageType::ClickHouse
    }

    fn generate(&self, features: &FeatureSet, table_name: &str) -> String {
        let table = clean_identifier(table_name);
        let temporal = temporal_column(features);

        let mut script = format!("CREATE TABLE {table} (\n");
        let column_lines: Vec<String> = features
            .columns
            .iter()
            .map(|column| {
                format!(
                    "    {} {}",
                    clean_identifier(column),
                    column_type(features, column)
                )
            })
            .collect();
        script.push_str(&column_lines.join(",\n"));
        script.push_str("\n)\nENGINE = MergeTree\n");

        match temporal {
            Some(temporal) => {
                let temporal_ident = clean_identifier(temporal);
                script.push_str(&format!("PARTITION BY toYYYYMM({temporal_ident})\n"));
                script.push_str(&format!(
                    "ORDER BY ({})\n",
                    order_key(features, &temporal_ident).join(", ")
                ));
            }
            // No time axis: an unsorted table, no partitioning.
            None => script.push_str("ORDER BY tuple()\n"),
        }
        script.push_str(";\n");

        if let Some(temporal) = temporal {
            if let Some(view) = daily_view(features, &table, temporal) {
                script.push('\n');
                script.push_str(&view);
            }
        }

        script
    }
}

fn column_type(features: &FeatureSet, column: &str) -> String {
    let base = match features.dtypes.get(column).map(String::as_str) {
        Some("int8") => "Int8".to_string(),
        Some("int16") => "Int16".to_string(),
        Some("int32") => "Int32".to_string(),
        Some("int64") => "Int64".to_string(),
        Some("uint8") => "UInt8".to_string(),
        Some("uint16") => "UInt16".to_string(),
        Some("uint32") => "UInt32".to_string(),
        Some("float32") => "Float32".to_string(),
        Some("float64") => "Float64".to_string(),
        Some("bool") => "UInt8".to_string(),
        Some("datetime64") => "DateTime".to_string(),
        Some("category") => "LowCardinality(String)".to_string(),
        Some("text") if unique_ratio(features, column) < LOW_CARDINALITY_RATIO => {
            "LowCardinality(String)".to_string()
        }
        _ => "String".to_string(),
    };
    // LowCardinality already absorbs missing values via its dictionary.
    if is_nullable(features, column) && !base.starts_with("LowCardinality") {
        format!("Nullable({base})")
    } else {
        base
    }
}

/// Sorting key: the temporal column first, then up to three identifier
/// columns.
fn order_key(features: &FeatureSet, temporal_ident: &str) -> Vec<String> {
    let mut key = vec![temporal_ident.to_string()];
    for id in features.unique_ids.iter().take(MAX_ORDER_KEY_IDS) {
        let ident = clean_identifier(id);
        if ident != temporal_ident {
            key.push(ident);
        }
    }
    if key.len() == 1 {
        if let Some(pk) = pick_primary_key(features) {
            let ident = clean_identifier(pk);
            if ident != temporal_ident {
                key.push(ident);
            }
        }
    }
    key
}

/// Daily pre-aggregation over the numeric columns, when there are any.
fn daily_view(features: &FeatureSet, table: &str, temporal: &str) -> Option<String> {
    let numeric: Vec<String> = features
        .columns
        .iter()
        .filter(|c| {
            matches!(
                features.dtypes.get(*c).map(String::as_str),
                Some(
                    "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16"
                        | "uint32" | "float32" | "float64"
                )
            ) && !features.unique_ids.contains(c)
        })
        .take(MAX_SUMMED_COLUMNS)
        .map(|c| clean_identifier(c))
        .collect();
    if numeric.is_empty() {
        return None;
    }

    let temporal_ident = clean_identifier(temporal);
    let sums: Vec<String> = numeric
        .iter()
        .map(|c| format!("    sum({c}) AS {c}_total"))
        .collect();
    Some(format!(
        "CREATE MATERIALIZED VIEW {table}_daily\n\
         ENGINE = SummingMergeTree\n\
         ORDER BY (day)\n\
         AS SELECT\n    toDate({temporal_ident}) AS day,\n{}\n\
         FROM {table}\nGROUP BY day;\n",
        sums.join(",\n")
    ))
}
