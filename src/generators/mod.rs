//! Schema-definition generators for the recommended storage back-ends.

mod clickhouse;
mod hdfs;
mod postgres;

pub use clickhouse::ClickHouseGenerator;
pub use hdfs::HdfsGenerator;
pub use postgres::PostgresGenerator;

use crate::profile::{FeatureSet, StorageType};

/// Produces an executable schema script for one storage back-end.
pub trait DdlGenerator: Send + Sync {
    fn storage_type(&self) -> StorageType;

    /// Generate the full DDL script for `table_name` from the extracted
    /// features. Deterministic: column order follows the dataset.
    fn generate(&self, features: &FeatureSet, table_name: &str) -> String;
}

pub fn generator_for(target: StorageType) -> Box<dyn DdlGenerator> {
    match target {
        StorageType::PostgreSql => Box::new(PostgresGenerator::new()),
        StorageType::ClickHouse => Box::new(ClickHouseGenerator::new()),
        StorageType::Hdfs => Box::new(HdfsGenerator::new()),
    }
}

/// Normalize a raw column or table name into a safe SQL identifier:
/// lowercase, non-alphanumerics collapsed to single underscores.
pub(crate) fn clean_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_underscore = false;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return "column".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("col_{trimmed}");
    }
    trimmed.to_string()
}

/// Pick the primary-key column: the first identifier-like column, falling
/// back to any column whose values are all distinct.
pub(crate) fn pick_primary_key<'a>(features: &'a FeatureSet) -> Option<&'a str> {
    if let Some(id) = features
        .columns
        .iter()
        .find(|c| features.unique_ids.contains(c))
    {
        return Some(id.as_str());
    }
    if features.record_count == 0 {
        return None;
    }
    features
        .columns
        .iter()
        .find(|c| {
            features.unique_counts.get(*c).copied().unwrap_or(0) as u64
                == features.record_count
        })
        .map(|c| c.as_str())
}

/// First temporal column in dataset order, by dtype or naming convention.
pub(crate) fn temporal_column<'a>(features: &'a FeatureSet) -> Option<&'a str> {
    features
        .columns
        .iter()
        .find(|c| column_is_temporal(features, c))
        .map(|c| c.as_str())
}

const TEMPORAL_NAME_KEYWORDS: [&str; 5] = ["date", "time", "created", "updated", "timestamp"];

pub(crate) fn column_is_temporal(features: &FeatureSet, column: &str) -> bool {
    if features.dtypes.get(column).map(String::as_str) == Some("datetime64") {
        return true;
    }
    let name = column.to_lowercase();
    TEMPORAL_NAME_KEYWORDS.iter().any(|k| name.contains(k))
}

const SPATIAL_NAME_KEYWORDS: [&str; 7] = [
    "lat",
    "lon",
    "coord",
    "geometry",
    "point",
    "polygon",
    "location",
];

pub(crate) fn column_is_spatial(column: &str) -> bool {
    let name = column.to_lowercase();
    SPATIAL_NAME_KEYWORDS.iter().any(|k| name.contains(k))
}

/// Fraction of distinct values, in [0, 1]. Zero rows yields zero.
pub(crate) fn unique_ratio(features: &FeatureSet, column: &str) -> f64 {
    if features.record_count == 0 {
        return 0.0;
    }
    let unique = features.unique_counts.get(column).copied().unwrap_or(0);
    unique as f64 / features.record_count as f64
}

pub(crate) fn is_nullable(features: &FeatureSet, column: &str) -> bool {
    features.null_counts.get(column).copied().unwrap_or(0) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_identifier() {
        assert_eq!(clean_identifier("Order ID"), "order_id");
        assert_eq!(clean_identifier("price--USD"), "price_usd");
        assert_eq!(clean_identifier("a.b.c"), "a_b_c");
        assert_eq!(clean_identifier("2024_report"), "col_2024_report");
        assert_eq!(clean_identifier("___"), "column");
    }

    #[test]
    fn test_temporal_column_by_name_keyword() {
        let mut dtypes = std::collections::BTreeMap::new();
        dtypes.insert("created_at".to_string(), "text".to_string());
        let features = FeatureSet {
            record_count: 1,
            field_count: 1,
            columns: vec!["created_at".to_string()],
            dtypes,
            memory_usage_bytes: 0,
            null_counts: std::collections::BTreeMap::new(),
            unique_counts: std::collections::BTreeMap::new(),
            sample_size: None,
            has_temporal: true,
            has_numeric: false,
            has_text: true,
            has_categorical: false,
            has_spatial: false,
            has_nested: false,
            unique_ids: Vec::new(),
            temporal_range: None,
            estimated_size_mb: 0.0,
            data_quality_score: 1.0,
            compression_ratio: 0.3,
        };
        // Text-typed but name-matched columns still count for partitioning.
        assert_eq!(temporal_column(&features), Some("created_at"));
    }

    #[test]
    fn test_generator_dispatch() {
        for target in [
            StorageType::PostgreSql,
            StorageType::ClickHouse,
            StorageType::Hdfs,
        ] {
            assert_eq!(generator_for(target).storage_type(), target);
        }
    }
}
