//! Relational DDL with extension preamble, constraints and index selection.

use super::{
    clean_identifier, column_is_spatial, column_is_temporal, is_nullable,
    pick_primary_key, unique_ratio, DdlGenerator,
};
use crate::profile::{FeatureSet, StorageType};

/// Columns whose selectivity falls in this band get a B-tree index; below it
/// an index rarely helps, above it the column is nearly unique anyway.
const INDEX_RATIO_MIN: f64 = 0.1;
const INDEX_RATIO_MAX: f64 = 0.9;

pub struct PostgresGenerator;

impl PostgresGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DdlGenerator for PostgresGenerator {
    fn storage_type(&self) -> StorageType {
        StorageType::PostgreSql
    }

    fn generate(&self, features: &FeatureSet, table_name: &str) -> String {
        let table = clean_identifier(table_name);
        let primary_key = pick_primary_key(features);

        let mut script = String::new();
        for extension in extensions(features) {
            script.push_str(&format!("CREATE EXTENSION IF NOT EXISTS {extension};\n"));
        }
        if !script.is_empty() {
            script.push('\n');
        }

        script.push_str(&format!("CREATE TABLE {table} (\n"));
        let column_lines: Vec<String> = features
            .columns
            .iter()
            .map(|column| {
                let name = clean_identifier(column);
                let sql_type = sql_type(features, column);
                let mut line = format!("    {name} {sql_type}");
                if primary_key == Some(column.as_str()) {
                    line.push_str(" PRIMARY KEY");
                } else if !is_nullable(features, column) {
                    line.push_str(" NOT NULL");
                }
                line
            })
            .collect();
        script.push_str(&column_lines.join(",\n"));
        script.push_str("\n);\n");

        for statement in index_statements(features, &table, primary_key) {
            script.push_str(&statement);
            script.push('\n');
        }

        script
    }
}

fn extensions(features: &FeatureSet) -> Vec<&'static str> {
    let mut out = Vec::new();
    if features.has_spatial {
        out.push("postgis");
    }
    if features.has_nested {
        out.push("pg_trgm");
    }
    out
}

fn sql_type(features: &FeatureSet, column: &str) -> &'static str {
    if column_is_spatial(column) {
        return "GEOMETRY(POINT, 4326)";
    }
    match features.dtypes.get(column).map(String::as_str) {
        Some("int8") | Some("int16") => "SMALLINT",
        Some("int32") | Some("uint8") | Some("uint16") => "INTEGER",
        Some("int64") | Some("uint32") => "BIGINT",
        Some("float32") => "REAL",
        Some("float64") => "DOUBLE PRECISION",
        Some("bool") => "BOOLEAN",
        Some("datetime64") => "TIMESTAMP",
        Some("category") => "VARCHAR(255)",
        Some("json") => "JSONB",
        _ => "TEXT",
    }
}

fn index_statements(
    features: &FeatureSet,
    table: &str,
    primary_key: Option<&str>,
) -> Vec<String> {
    let mut out = Vec::new();
    for column in &features.columns {
        if primary_key == Some(column.as_str()) {
            continue;
        }
        let name = clean_identifier(column);
        let dtype = features.dtypes.get(column).map(String::as_str);

        if column_is_spatial(column) {
            out.push(format!(
                "CREATE INDEX idx_{table}_{name} ON {table} USING GIST ({name});"
            ));
        } else if dtype == Some("json") {
            out.push(format!(
                "CREATE INDEX idx_{table}_{name} ON {table} USING GIN ({name});"
            ));
        } else if column_is_temporal(features, column) {
            out.push(format!(
                "CREATE INDEX idx_{table}_{name} ON {table} ({name});"
            ));
        } else {
            let ratio = unique_ratio(features, column);
            if (INDEX_RATIO_MIN..=INDEX_RATIO_MAX).contains(&ratio) {
                out.push(format!(
                    "CREATE INDEX idx_{table}_{name} ON {table} ({name});"
                ));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn features(
        columns: &[(&str, &str, usize, usize)],
        record_count: u64,
        unique_ids: &[&str],
    ) -> FeatureSet {
        let mut dtypes = BTreeMap::new();
        let mut null_counts = BTreeMap::new();
        let mut unique_counts = BTreeMap::new();
        for (name, dtype, nulls, uniques) in columns {
            dtypes.insert(name.to_string(), dtype.to_string());
            null_counts.insert(name.to_string(), *nulls);
            unique_counts.insert(name.to_string(), *uniques);
        }
        FeatureSet {
            record_count,
            field_count: columns.len(),
            columns: columns.iter().map(|(n, ..)| n.to_string()).collect(),
            dtypes,
            memory_usage_bytes: 0,
            null_counts,
            unique_counts,
            sample_size: None,
            has_temporal: false,
            has_numeric: true,
            has_text: false,
            has_categorical: false,
            has_spatial: false,
            has_nested: false,
            unique_ids: unique_ids.iter().map(|s| s.to_string()).collect(),
            temporal_range: None,
            estimated_size_mb: 1.0,
            data_quality_score: 1.0,
            compression_ratio: 0.6,
        }
    }

    #[test]
    fn test_primary_key_and_temporal_index() {
        let f = features(
            &[
                ("id", "int64", 0, 100),
                ("created_at", "datetime64", 0, 90),
                ("price", "float64", 0, 80),
            ],
            100,
            &["id"],
        );
        let ddl = PostgresGenerator::new().generate(&f, "orders");
        assert!(ddl.contains("id BIGINT PRIMARY KEY"));
        assert!(ddl.contains("created_at TIMESTAMP NOT NULL"));
        assert!(ddl.contains("CREATE INDEX idx_orders_created_at ON orders (created_at);"));
    }

    #[test]
    fn test_selectivity_band_controls_indexes() {
        let f = features(
            &[
                ("id", "int64", 0, 100),
                ("status", "category", 0, 50),
                ("flag", "bool", 0, 2),
            ],
            100,
            &["id"],
        );
        let ddl = PostgresGenerator::new().generate(&f, "t");
        // 50% distinct is inside the band, 2% is below it.
        assert!(ddl.contains("idx_t_status"));
        assert!(!ddl.contains("idx_t_flag"));
    }

    #[test]
    fn test_spatial_and_json_columns() {
        let mut f = features(
            &[
                ("id", "int64", 0, 10),
                ("coordinates", "text", 0, 10),
                ("attributes", "json", 2, 8),
            ],
            10,
            &["id"],
        );
        f.has_spatial = true;
        f.has_nested = true;
        let ddl = PostgresGenerator::new().generate(&f, "parcels");
        assert!(ddl.contains("CREATE EXTENSION IF NOT EXISTS postgis;"));
        assert!(ddl.contains("CREATE EXTENSION IF NOT EXISTS pg_trgm;"));
        assert!(ddl.contains("coordinates GEOMETRY(POINT, 4326)"));
        assert!(ddl.contains("USING GIST (coordinates)"));
        assert!(ddl.contains("attributes JSONB"));
        assert!(ddl.contains("USING GIN (attributes)"));
        // Nullable column carries no NOT NULL.
        assert!(!ddl.contains("attributes JSONB NOT NULL"));
    }

    #[test]
    fn test_latitude_longitude_columns_become_geometry() {
        let mut f = features(
            &[
                ("cad_number", "text", 0, 100),
                ("latitude", "float64", 0, 90),
                ("longitude", "float64", 0, 90),
                ("status", "category", 0, 30),
            ],
            100,
            &["cad_number"],
        );
        f.has_spatial = true;
        let ddl = PostgresGenerator::new().generate(&f, "parcels");
        assert!(ddl.contains("CREATE EXTENSION IF NOT EXISTS postgis;"));
        assert!(ddl.contains("latitude GEOMETRY(POINT, 4326)"));
        assert!(ddl.contains("longitude GEOMETRY(POINT, 4326)"));
        assert!(ddl.contains("USING GIST (latitude)"));
        assert!(ddl.contains("USING GIST (longitude)"));
    }

    #[test]
    fn test_no_extensions_without_flags() {
        let f = features(&[("id", "int64", 0, 10), ("name", "text", 0, 10)], 10, &["id"]);
        let ddl = PostgresGenerator::new().generate(&f, "t");
        assert!(!ddl.contains("CREATE EXTENSION"));
    }

    #[test]
    fn test_table_name_sanitized() {
        let f = features(&[("id", "int64", 0, 1)], 1, &["id"]);
        let ddl = PostgresGenerator::new().generate(&f, "My Table!");
        assert!(ddl.contains("CREATE TABLE my_table ("));
    }
}
