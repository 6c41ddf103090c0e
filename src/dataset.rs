//! Tabular dataset representation shared by parsers, feature extraction and
//! DDL generation.

use crate::{Result, StoreScoutError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Element type of a column after inference and optimization.
///
/// Width-specific integer/float variants exist so the memory-optimization
/// pass can narrow columns without touching their values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    Float32,
    Float64,
    Bool,
    Timestamp,
    Text,
    Categorical,
    /// Serialized structured values (flattened objects, scalar lists).
    Json,
}

impl DType {
    /// Lowercase label used in feature maps and generated DDL comments.
    pub fn label(&self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Bool => "bool",
            DType::Timestamp => "datetime64",
            DType::Text => "text",
            DType::Categorical => "category",
            DType::Json => "json",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DType::Int8
                | DType::Int16
                | DType::Int32
                | DType::Int64
                | DType::UInt8
                | DType::UInt16
                | DType::UInt32
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Free-text columns, including serialized structured values.
    pub fn is_text_like(&self) -> bool {
        matches!(self, DType::Text | DType::Json)
    }

    /// Bytes per element for fixed-width types.
    fn element_width(&self) -> u64 {
        match self {
            DType::Int8 | DType::UInt8 | DType::Bool => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 | DType::Categorical => 4,
            DType::Int64 | DType::Float64 | DType::Timestamp => 8,
            DType::Text | DType::Json => 0,
        }
    }
}

/// Typed column storage. Missing values are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColumnValues {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
    Text(Vec<Option<String>>),
    /// Dictionary-encoded text produced by the optimization pass.
    Categorical {
        codes: Vec<Option<u32>>,
        levels: Vec<String>,
    },
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Bool(v) => v.len(),
            ColumnValues::Timestamp(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Categorical { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column with an inferred element type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub dtype: DType,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: DType, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Build a column from raw string cells, inferring the element type.
    ///
    /// Inference order: integer, float, boolean, timestamp, free text. A
    /// column qualifies for a type only if every non-null cell parses.
    pub fn from_strings(name: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        let name = name.into();
        let non_null: Vec<&str> = cells.iter().flatten().map(|s| s.as_str()).collect();

        if !non_null.is_empty() {
            if non_null.iter().all(|s| s.trim().parse::<i64>().is_ok()) {
                let values = cells
                    .iter()
                    .map(|c| c.as_ref().and_then(|s| s.trim().parse::<i64>().ok()))
                    .collect();
                return Self::new(name, DType::Int64, ColumnValues::Int(values));
            }
            if non_null.iter().all(|s| s.trim().parse::<f64>().is_ok()) {
                let values = cells
                    .iter()
                    .map(|c| c.as_ref().and_then(|s| s.trim().parse::<f64>().ok()))
                    .collect();
                return Self::new(name, DType::Float64, ColumnValues::Float(values));
            }
            if non_null.iter().all(|s| parse_bool(s).is_some()) {
                let values = cells
                    .iter()
                    .map(|c| c.as_ref().and_then(|s| parse_bool(s)))
                    .collect();
                return Self::new(name, DType::Bool, ColumnValues::Bool(values));
            }
            if non_null.iter().all(|s| parse_timestamp(s).is_some()) {
                let values = cells
                    .iter()
                    .map(|c| c.as_ref().and_then(|s| parse_timestamp(s)))
                    .collect();
                return Self::new(name, DType::Timestamp, ColumnValues::Timestamp(values));
            }
        }

        Self::new(name, DType::Text, ColumnValues::Text(cells))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        match &self.values {
            ColumnValues::Int(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Float(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Bool(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Timestamp(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Text(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Categorical { codes, .. } => {
                codes.iter().filter(|c| c.is_none()).count()
            }
        }
    }

    /// Number of distinct non-null values.
    pub fn distinct_count(&self) -> usize {
        match &self.values {
            ColumnValues::Int(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnValues::Float(v) => v
                .iter()
                .flatten()
                .map(|f| f.to_bits())
                .collect::<HashSet<_>>()
                .len(),
            ColumnValues::Bool(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnValues::Timestamp(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnValues::Text(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnValues::Categorical { codes, .. } => {
                codes.iter().flatten().collect::<HashSet<_>>().len()
            }
        }
    }

    /// Canonical string rendering of one cell, `None` when missing.
    pub fn value_as_string(&self, row: usize) -> Option<String> {
        match &self.values {
            ColumnValues::Int(v) => v.get(row)?.map(|x| x.to_string()),
            ColumnValues::Float(v) => v.get(row)?.map(|x| x.to_string()),
            ColumnValues::Bool(v) => v.get(row)?.map(|x| x.to_string()),
            ColumnValues::Timestamp(v) => v.get(row)?.map(|x| x.to_string()),
            ColumnValues::Text(v) => v.get(row)?.clone(),
            ColumnValues::Categorical { codes, levels } => codes
                .get(row)?
                .map(|code| levels[code as usize].clone()),
        }
    }

    /// Deep in-memory footprint estimate in bytes.
    pub fn byte_size(&self) -> u64 {
        match &self.values {
            ColumnValues::Text(v) => v
                .iter()
                .map(|c| 48 + c.as_ref().map(|s| s.len() as u64).unwrap_or(0))
                .sum(),
            ColumnValues::Categorical { codes, levels } => {
                codes.len() as u64 * 4
                    + levels.iter().map(|l| 48 + l.len() as u64).sum::<u64>()
            }
            _ => self.len() as u64 * self.dtype.element_width(),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Parse a timestamp from the formats commonly seen in exported datasets.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// An ordered collection of equal-length, uniquely named columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularDataset {
    columns: Vec<Column>,
}

impl TabularDataset {
    /// Create a dataset, enforcing equal column lengths and unique names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut names = HashSet::new();
        for col in &columns {
            if !names.insert(col.name.clone()) {
                return Err(StoreScoutError::Validation(format!(
                    "duplicate column name: {}",
                    col.name
                )));
            }
        }
        if let Some(first) = columns.first() {
            let len = first.len();
            for col in &columns {
                if col.len() != len {
                    return Err(StoreScoutError::Validation(format!(
                        "column {} has {} rows, expected {}",
                        col.name,
                        col.len(),
                        len
                    )));
                }
            }
        }
        Ok(Self { columns })
    }

    /// Build a dataset from row-oriented string records, unioning keys across
    /// rows (absent keys become nulls). Column order follows first appearance.
    pub fn from_string_records(records: &[HashMap<String, String>]) -> Result<Self> {
        let mut order: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for record in records {
            let mut keys: Vec<&String> = record.keys().collect();
            keys.sort();
            for key in keys {
                if seen.insert(key.clone()) {
                    order.push(key.clone());
                }
            }
        }

        let columns = order
            .into_iter()
            .map(|name| {
                let cells = records.iter().map(|r| r.get(&name).cloned()).collect();
                Column::from_strings(name, cells)
            })
            .collect();

        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    /// Deep in-memory footprint estimate in bytes.
    pub fn byte_size(&self) -> u64 {
        self.columns.iter().map(|c| c.byte_size()).sum()
    }

    /// Number of rows that duplicate an earlier row.
    pub fn duplicate_row_count(&self) -> usize {
        let mut seen = HashSet::new();
        let mut duplicates = 0;
        for row in 0..self.row_count() {
            let key: Vec<Option<String>> = self
                .columns
                .iter()
                .map(|c| c.value_as_string(row))
                .collect();
            if !seen.insert(key) {
                duplicates += 1;
            }
        }
        duplicates
    }

    /// In-place memory optimization: narrow integers to the smallest safe
    /// width, downcast floats where lossless, dictionary-encode text columns
    /// with unique-value ratio below 0.5. Values are never altered.
    pub fn optimize(&mut self) {
        let row_count = self.row_count();
        for col in &mut self.columns {
            match (&col.values, col.dtype) {
                (ColumnValues::Int(v), _) => {
                    let min = v.iter().flatten().min().copied();
                    let max = v.iter().flatten().max().copied();
                    if let (Some(min), Some(max)) = (min, max) {
                        col.dtype = narrow_int_dtype(min, max);
                    }
                }
                (ColumnValues::Float(v), DType::Float64) => {
                    let lossless = v
                        .iter()
                        .flatten()
                        .all(|&f| f64::from(f as f32) == f || f.is_nan());
                    if lossless {
                        col.dtype = DType::Float32;
                    }
                }
                (ColumnValues::Text(v), DType::Text) => {
                    if row_count == 0 {
                        continue;
                    }
                    let distinct = col.distinct_count();
                    if (distinct as f64) / (row_count as f64) < 0.5 {
                        let mut levels: Vec<String> = Vec::new();
                        let mut index: HashMap<String, u32> = HashMap::new();
                        let codes = v
                            .iter()
                            .map(|cell| {
                                cell.as_ref().map(|s| {
                                    *index.entry(s.clone()).or_insert_with(|| {
                                        levels.push(s.clone());
                                        (levels.len() - 1) as u32
                                    })
                                })
                            })
                            .collect();
                        col.values = ColumnValues::Categorical { codes, levels };
                        col.dtype = DType::Categorical;
                    }
                }
                _ => {}
            }
        }
    }
}

fn narrow_int_dtype(min: i64, max: i64) -> DType {
    if min > 0 {
        if max < 255 {
            DType::UInt8
        } else if max < 65_535 {
            DType::UInt16
        } else if max < 4_294_967_295 {
            DType::UInt32
        } else {
            DType::Int64
        }
    } else if min > -128 && max < 127 {
        DType::Int8
    } else if min > -32_768 && max < 32_767 {
        DType::Int16
    } else if min > -2_147_483_648 && max < 2_147_483_647 {
        DType::Int32
    } else {
        DType::Int64
    }
}
