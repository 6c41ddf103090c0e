//! Feature extraction: semantic flags, cardinality statistics, quality and
//! compression estimates over a tabular dataset.

use crate::dataset::{parse_timestamp, Column, ColumnValues, DType, TabularDataset};
use crate::profile::FeatureSet;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Seed for the classification sample, fixed for reproducibility.
const SAMPLE_SEED: u64 = 42;
/// Above this row count, per-column distinct counts come from the sample and
/// are capped.
const UNIQUE_COUNT_FULL_LIMIT: usize = 100_000;
const UNIQUE_COUNT_CAP: usize = 100_000;

/// Strict numeric-string pattern.
static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d*\.?\d+$").expect("static regex"));

const SPATIAL_KEYWORDS: [&str; 9] = [
    "lat",
    "lon",
    "latitude",
    "longitude",
    "coordinate",
    "coords",
    "geometry",
    "point",
    "polygon",
];
const NESTED_KEYWORDS: [&str; 5] = ["json", "dict", "list", "array", "nested"];
const ID_KEYWORDS: [&str; 6] = ["id", "uuid", "guid", "key", "code", "number"];

pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Compute a [`FeatureSet`] for `dataset`.
    ///
    /// Runs the lossless memory-optimization pass first, then evaluates the
    /// classification heuristics over a fixed-seed sample of at most
    /// `sample_size` rows. Record/field counts, memory and quality metrics
    /// always use the full dataset.
    pub fn extract(&self, dataset: &mut TabularDataset, sample_size: Option<usize>) -> FeatureSet {
        dataset.optimize();

        let row_count = dataset.row_count();
        let sample = sample_indices(row_count, sample_size);
        let sampled = sample.len();
        debug!(row_count, sampled, "extracting dataset features");

        let columns: Vec<String> = dataset.columns().iter().map(|c| c.name.clone()).collect();
        let dtypes: BTreeMap<String, String> = dataset
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.dtype.label().to_string()))
            .collect();
        let null_counts: BTreeMap<String, usize> = dataset
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.null_count()))
            .collect();
        let unique_counts = unique_counts(dataset, &sample);

        let memory_usage_bytes = dataset.byte_size();
        let estimated_size_mb = memory_usage_bytes as f64 / (1024.0 * 1024.0);

        FeatureSet {
            record_count: row_count as u64,
            field_count: dataset.field_count(),
            columns,
            dtypes,
            memory_usage_bytes,
            null_counts,
            unique_counts,
            sample_size: sample_size.filter(|n| row_count > *n).map(|_| sampled),
            has_temporal: has_temporal(dataset, &sample),
            has_numeric: has_numeric(dataset, &sample),
            has_text: has_text(dataset),
            has_categorical: has_categorical(dataset, &sample),
            has_spatial: has_spatial(dataset),
            has_nested: has_nested(dataset),
            unique_ids: find_unique_ids(dataset, &sample),
            temporal_range: temporal_range(dataset, &sample),
            estimated_size_mb,
            data_quality_score: data_quality_score(dataset),
            compression_ratio: compression_ratio(dataset),
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Row indices used for classification, ascending. The full range when no
/// sampling is needed.
fn sample_indices(row_count: usize, sample_size: Option<usize>) -> Vec<usize> {
    match sample_size {
        Some(n) if row_count > n => {
            let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
            let mut indices = rand::seq::index::sample(&mut rng, row_count, n).into_vec();
            indices.sort_unstable();
            indices
        }
        _ => (0..row_count).collect(),
    }
}

/// Non-null sampled cells of a text-like column.
fn sampled_text<'a>(column: &'a Column, sample: &[usize]) -> Vec<&'a str> {
    match &column.values {
        ColumnValues::Text(v) => sample
            .iter()
            .filter_map(|&i| v.get(i).and_then(|c| c.as_deref()))
            .collect(),
        _ => Vec::new(),
    }
}

fn sampled_distinct(column: &Column, sample: &[usize]) -> usize {
    let mut seen = HashSet::new();
    for &i in sample {
        if let Some(value) = column.value_as_string(i) {
            seen.insert(value);
        }
    }
    seen.len()
}

fn unique_counts(dataset: &TabularDataset, sample: &[usize]) -> BTreeMap<String, usize> {
    let large = dataset.row_count() > UNIQUE_COUNT_FULL_LIMIT;
    dataset
        .columns()
        .iter()
        .map(|c| {
            let count = if large {
                sampled_distinct(c, sample).min(UNIQUE_COUNT_CAP)
            } else {
                c.distinct_count()
            };
            (c.name.clone(), count)
        })
        .collect()
}

fn has_temporal(dataset: &TabularDataset, sample: &[usize]) -> bool {
    dataset
        .columns()
        .iter()
        .any(|c| column_is_temporal(c, sample))
}

/// A column is temporal when it has a timestamp dtype or is a text column
/// whose sampled values all parse as timestamps.
fn column_is_temporal(column: &Column, sample: &[usize]) -> bool {
    if column.dtype == DType::Timestamp {
        return true;
    }
    if column.dtype != DType::Text {
        return false;
    }
    let values = sampled_text(column, sample);
    !values.is_empty() && values.iter().all(|v| parse_timestamp(v).is_some())
}

fn has_numeric(dataset: &TabularDataset, sample: &[usize]) -> bool {
    dataset.columns().iter().any(|c| {
        if c.dtype.is_numeric() {
            return true;
        }
        if c.dtype != DType::Text {
            return false;
        }
        // Text columns count when their values are predominantly
        // numeric-looking strings.
        let values = sampled_text(c, sample);
        if values.is_empty() {
            return false;
        }
        let matching = values.iter().filter(|v| NUMERIC_RE.is_match(v)).count();
        matching * 2 > values.len()
    })
}

fn has_text(dataset: &TabularDataset) -> bool {
    dataset.columns().iter().any(|c| c.dtype.is_text_like())
}

fn has_categorical(dataset: &TabularDataset, sample: &[usize]) -> bool {
    dataset.columns().iter().any(|c| {
        if c.dtype == DType::Categorical {
            return true;
        }
        if c.dtype != DType::Text || sample.is_empty() {
            return false;
        }
        (sampled_distinct(c, sample) as f64) / (sample.len() as f64) < 0.5
    })
}

fn has_spatial(dataset: &TabularDataset) -> bool {
    let names: Vec<String> = dataset
        .columns()
        .iter()
        .map(|c| c.name.to_lowercase())
        .collect();
    for name in &names {
        if SPATIAL_KEYWORDS.iter().any(|k| name.contains(k)) {
            return true;
        }
    }
    // A bare x/y pair also counts as coordinates.
    names.iter().any(|n| n == "x") && names.iter().any(|n| n == "y")
}

fn has_nested(dataset: &TabularDataset) -> bool {
    dataset.columns().iter().any(|c| {
        let label = c.dtype.label();
        NESTED_KEYWORDS.iter().any(|k| label.contains(k))
    })
}

/// Columns whose sampled values are all distinct and that either carry an
/// identifier keyword in the name or are integer typed.
fn find_unique_ids(dataset: &TabularDataset, sample: &[usize]) -> Vec<String> {
    if sample.is_empty() {
        return Vec::new();
    }
    dataset
        .columns()
        .iter()
        .filter(|c| sampled_distinct(c, sample) == sample.len())
        .filter(|c| {
            let name = c.name.to_lowercase();
            ID_KEYWORDS.iter().any(|k| name.contains(k)) || c.dtype.is_integer()
        })
        .map(|c| c.name.clone())
        .collect()
}

/// `[min, max]` of the first temporal column, ISO formatted.
fn temporal_range(dataset: &TabularDataset, sample: &[usize]) -> Option<[String; 2]> {
    let column = dataset
        .columns()
        .iter()
        .find(|c| column_is_temporal(c, sample))?;

    let parsed: Vec<NaiveDateTime> = match &column.values {
        ColumnValues::Timestamp(v) => sample
            .iter()
            .filter_map(|&i| v.get(i).copied().flatten())
            .collect(),
        ColumnValues::Text(v) => sample
            .iter()
            .filter_map(|&i| v.get(i).and_then(|c| c.as_deref()))
            .filter_map(parse_timestamp)
            .collect(),
        _ => Vec::new(),
    };

    let min = parsed.iter().min()?;
    let max = parsed.iter().max()?;
    let fmt = "%Y-%m-%dT%H:%M:%S";
    Some([min.format(fmt).to_string(), max.format(fmt).to_string()])
}

/// `1 - (null ratio + duplicate-row ratio)`, clamped to [0, 1], over the
/// full dataset.
fn data_quality_score(dataset: &TabularDataset) -> f64 {
    let rows = dataset.row_count();
    let total_cells = rows * dataset.field_count();
    if rows == 0 || total_cells == 0 {
        return 0.0;
    }

    let null_cells: usize = dataset.columns().iter().map(|c| c.null_count()).sum();
    let null_ratio = null_cells as f64 / total_cells as f64;
    let duplicate_ratio = dataset.duplicate_row_count() as f64 / rows as f64;

    (1.0 - (null_ratio + duplicate_ratio)).clamp(0.0, 1.0)
}

/// Estimated compressed size over actual size. Free text compresses well
/// (0.3), numeric data moderately (0.6), everything else modestly (0.8).
fn compression_ratio(dataset: &TabularDataset) -> f64 {
    let actual = dataset.byte_size();
    if actual == 0 {
        return 1.0;
    }
    let compressed: f64 = dataset
        .columns()
        .iter()
        .map(|c| {
            let factor = if c.dtype.is_text_like() {
                0.3
            } else if c.dtype.is_numeric() {
                0.6
            } else {
                0.8
            };
            c.byte_size() as f64 * factor
        })
        .sum();
    compressed / actual as f64
}
