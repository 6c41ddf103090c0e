//! Profiles, feature sets and recommendation types.
//!
//! Everything here is plain structured data, serializable for the external
//! content-hash cache.

use crate::parsers::{DataFormat, ParseStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Storage back-ends the decision engine can recommend. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    ClickHouse,
    PostgreSql,
    Hdfs,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::ClickHouse => write!(f, "clickhouse"),
            StorageType::PostgreSql => write!(f, "postgresql"),
            StorageType::Hdfs => write!(f, "hdfs"),
        }
    }
}

/// Recommended refresh cadence for the ingested dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleHint {
    Realtime,
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

/// Structural/semantic summary of one dataset, consumed by the decision
/// engine and schema generators.
///
/// The boolean flags are existential: true when ANY column exhibits the
/// trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProfile {
    pub format: DataFormat,
    pub record_count: u64,
    pub field_count: usize,
    pub has_temporal: bool,
    pub has_numeric: bool,
    pub has_text: bool,
    pub has_categorical: bool,
    pub has_spatial: bool,
    pub has_nested: bool,
    /// Columns that look like unique identifiers.
    pub unique_ids: Vec<String>,
    /// `[min, max]` of the first fully temporal column, ISO formatted.
    pub temporal_range: Option<[String; 2]>,
    pub estimated_size_mb: f64,
}

/// Superset of [`DataProfile`] with per-column statistics, consumed by the
/// schema generators and the augmenter prompt builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub record_count: u64,
    pub field_count: usize,
    /// Column names in dataset order.
    pub columns: Vec<String>,
    /// Column name to dtype label.
    pub dtypes: BTreeMap<String, String>,
    /// Deep in-memory footprint in bytes.
    pub memory_usage_bytes: u64,
    pub null_counts: BTreeMap<String, usize>,
    pub unique_counts: BTreeMap<String, usize>,
    /// Rows actually used for the classification heuristics, when sampled.
    pub sample_size: Option<usize>,
    pub has_temporal: bool,
    pub has_numeric: bool,
    pub has_text: bool,
    pub has_categorical: bool,
    pub has_spatial: bool,
    pub has_nested: bool,
    pub unique_ids: Vec<String>,
    pub temporal_range: Option<[String; 2]>,
    pub estimated_size_mb: f64,
    /// `1 - (null ratio + duplicate-row ratio)`, clamped to [0, 1].
    pub data_quality_score: f64,
    /// Estimated compressed size over actual size, in [0, 1].
    pub compression_ratio: f64,
}

impl FeatureSet {
    /// Project the profile subset for a given input format.
    pub fn to_profile(&self, format: DataFormat) -> DataProfile {
        DataProfile {
            format,
            record_count: self.record_count,
            field_count: self.field_count,
            has_temporal: self.has_temporal,
            has_numeric: self.has_numeric,
            has_text: self.has_text,
            has_categorical: self.has_categorical,
            has_spatial: self.has_spatial,
            has_nested: self.has_nested,
            unique_ids: self.unique_ids.clone(),
            temporal_range: self.temporal_range.clone(),
            estimated_size_mb: self.estimated_size_mb,
        }
    }
}

/// Input file metadata attached to responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_size_mb: f64,
    pub parsing_strategy: ParseStrategy,
    /// Extraction path tag for tree-markup inputs.
    pub structure: Option<String>,
}

/// Output of [`crate::StoreScout::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub data_profile: DataProfile,
    pub features: FeatureSet,
    pub file_info: Option<FileInfo>,
    pub validation_warnings: Vec<String>,
}

/// Final storage recommendation for one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub target: StorageType,
    /// In [0, 1].
    pub confidence: f64,
    pub rationale: String,
    pub schedule_hint: ScheduleHint,
    pub ddl_hints: Vec<String>,
    /// Executable schema-definition script for the target store.
    pub ddl_script: String,
    pub data_profile: DataProfile,
    pub file_info: Option<FileInfo>,
    pub validation_warnings: Vec<String>,
    /// True when the rationale was replaced by the augmenter.
    pub augmented: bool,
}
