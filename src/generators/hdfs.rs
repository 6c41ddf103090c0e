//! Distributed-filesystem layout recommendations plus an external Hive table
//! over the dataset location.

use super::{clean_identifier, temporal_column, DdlGenerator};
use crate::profile::{FeatureSet, StorageType};

pub struct HdfsGenerator;

impl HdfsGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HdfsGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DdlGenerator for HdfsGenerator {
    fn storage_type(&self) -> StorageType {
        StorageType::Hdfs
    }

    fn generate(&self, features: &FeatureSet, table_name: &str) -> String {
        let table = clean_identifier(table_name);
        let format = file_format(features);
        let codec = codec(features);
        let partition_note = if features.has_temporal {
            match temporal_column(features) {
                Some(col) => format!(
                    "daily folders derived from `{}`, dt=YYYY-MM-DD",
                    clean_identifier(col)
                ),
                None => "daily folders by ingestion date, dt=YYYY-MM-DD".to_string(),
            }
        } else {
            "key-hash buckets (no time axis to partition on)".to_string()
        };

        let mut script = String::new();
        script.push_str(&format!(
            "-- Storage layout for /data/{table}/\n\
             -- File format: {format}\n\
             -- Compression: {codec}\n\
             -- Partitioning: {partition_note}\n\
             -- Target file size: 128-512 MB per file\n\n"
        ));

        script.push_str(&format!("CREATE EXTERNAL TABLE {table} (\n"));
        let column_lines: Vec<String> = features
            .columns
            .iter()
            .map(|column| {
                format!(
                    "    {} {}",
                    clean_identifier(column),
                    hive_type(features, column)
                )
            })
            .collect();
        script.push_str(&column_lines.join(",\n"));
        script.push_str("\n)\n");
        if features.has_temporal {
            script.push_str("PARTITIONED BY (dt STRING)\n");
        }
        script.push_str(&format!(
            "STORED AS {format}\n\
             LOCATION '/data/{table}/'\n\
             TBLPROPERTIES ('{}'='{codec}');\n",
            compression_property(format)
        ));

        script
    }
}

/// Parquet for nested and generic data, ORC for flat time-series.
fn file_format(features: &FeatureSet) -> &'static str {
    if features.has_nested {
        "PARQUET"
    } else if features.has_temporal {
        "ORC"
    } else {
        "PARQUET"
    }
}

/// Purely numeric data compresses fast with Snappy; text-bearing data is
/// worth GZIP; mixed remainders take ZSTD.
fn codec(features: &FeatureSet) -> &'static str {
    if features.has_numeric && !features.has_text {
        "SNAPPY"
    } else if features.has_text {
        "GZIP"
    } else {
        "ZSTD"
    }
}

fn compression_property(format: &str) -> &'static str {
    match format {
        "ORC" => "orc.compress",
        _ => "parquet.compression",
    }
}

fn hive_type(features: &FeatureSet, column: &str) -> &'static str {
    match features.dtypes.get(column).map(String::as_str) {
        Some("int8") | Some("int16") => "SMALLINT",
        Some("int32") | Some("uint8") | Some("uint16") => "INT",
        Some("int64") | Some("uint32") => "BIGINT",
        Some("float32") => "FLOAT",
        Some("float64") => "DOUBLE",
        Some("bool") => "BOOLEAN",
        Some("datetime64") => "TIMESTAMP",
        _ => "STRING",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn features(columns: &[(&str, &str)]) -> FeatureSet {
        let mut dtypes = BTreeMap::new();
        let mut null_counts = BTreeMap::new();
        let mut unique_counts = BTreeMap::new();
        for (name, dtype) in columns {
            dtypes.insert(name.to_string(), dtype.to_string());
            null_counts.insert(name.to_string(), 0);
            unique_counts.insert(name.to_string(), 1);
        }
        FeatureSet {
            record_count: 1,
            field_count: columns.len(),
            columns: columns.iter().map(|(n, _)| n.to_string()).collect(),
            dtypes,
            memory_usage_bytes: 0,
            null_counts,
            unique_counts,
            sample_size: None,
            has_temporal: false,
            has_numeric: false,
            has_text: false,
            has_categorical: false,
            has_spatial: false,
            has_nested: false,
            unique_ids: Vec::new(),
            temporal_range: None,
            estimated_size_mb: 100.0,
            data_quality_score: 1.0,
            compression_ratio: 0.6,
        }
    }

    #[test]
    fn test_temporal_data_gets_orc_and_date_partition() {
        let mut f = features(&[
            ("id", "int64"),
            ("created_at", "datetime64"),
            ("note", "text"),
        ]);
        f.has_temporal = true;
        f.has_numeric = true;
        f.has_text = true;
        let ddl = HdfsGenerator::new().generate(&f, "archive");
        assert!(ddl.contains("CREATE EXTERNAL TABLE archive ("));
        assert!(ddl.contains("id BIGINT"));
        assert!(ddl.contains("created_at TIMESTAMP"));
        assert!(ddl.contains("note STRING"));
        assert!(ddl.contains("PARTITIONED BY (dt STRING)"));
        assert!(ddl.contains("STORED AS ORC"));
        assert!(ddl.contains("'orc.compress'='GZIP'"));
        assert!(ddl.contains("LOCATION '/data/archive/'"));
    }

    #[test]
    fn test_nested_data_gets_parquet_even_with_temporal() {
        let mut f = features(&[("ts", "datetime64"), ("payload", "json")]);
        f.has_temporal = true;
        f.has_nested = true;
        let ddl = HdfsGenerator::new().generate(&f, "t");
        assert!(ddl.contains("STORED AS PARQUET"));
        assert!(ddl.contains("'parquet.compression'"));
    }

    #[test]
    fn test_no_temporal_means_key_hash_layout_and_no_partition() {
        let mut f = features(&[("id", "int64"), ("amount", "float64")]);
        f.has_numeric = true;
        let ddl = HdfsGenerator::new().generate(&f, "t");
        assert!(!ddl.contains("PARTITIONED BY"));
        assert!(ddl.contains("key-hash buckets"));
        assert!(ddl.contains("STORED AS PARQUET"));
    }

    #[test]
    fn test_codec_selection_by_content_mix() {
        let mut numeric_only = features(&[("a", "int64")]);
        numeric_only.has_numeric = true;
        assert!(HdfsGenerator::new()
            .generate(&numeric_only, "t")
            .contains("SNAPPY"));

        let mut text_bearing = features(&[("a", "int64"), ("b", "text")]);
        text_bearing.has_numeric = true;
        text_bearing.has_text = true;
        assert!(HdfsGenerator::new()
            .generate(&text_bearing, "t")
            .contains("GZIP"));

        let neither = features(&[("a", "bool")]);
        assert!(HdfsGenerator::new().generate(&neither, "t").contains("ZSTD"));
    }
}
