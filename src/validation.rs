//! Post-parse sanity checks. Hard failures only for unusable datasets;
//! everything else surfaces as warnings on the report.

use crate::dataset::{DType, TabularDataset};
use crate::parsers::DataFormat;
use crate::{Result, StoreScoutError};
use tracing::warn;

/// Per-column null ratio above which the column is flagged.
const NULL_RATIO_WARN: f64 = 0.8;
/// Duplicate-row ratio above which the dataset is flagged.
const DUPLICATE_RATIO_WARN: f64 = 0.5;
const MAX_EXPECTED_FIELDS: usize = 100;

pub struct DataValidator;

impl DataValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a parsed dataset. Empty datasets are an error; structural
    /// oddities come back as human-readable warnings.
    pub fn validate(
        &self,
        dataset: &TabularDataset,
        format: DataFormat,
    ) -> Result<Vec<String>> {
        let rows = dataset.row_count();
        if rows == 0 || dataset.field_count() == 0 {
            return Err(StoreScoutError::Validation(
                "dataset contains no records".to_string(),
            ));
        }

        let mut warnings = Vec::new();

        for column in dataset.columns() {
            let ratio = column.null_count() as f64 / rows as f64;
            if ratio > NULL_RATIO_WARN {
                warnings.push(format!(
                    "column '{}' is {:.0}% null",
                    column.name,
                    ratio * 100.0
                ));
            }
        }

        let duplicate_ratio = dataset.duplicate_row_count() as f64 / rows as f64;
        if duplicate_ratio > DUPLICATE_RATIO_WARN {
            warnings.push(format!(
                "{:.0}% of rows are duplicates",
                duplicate_ratio * 100.0
            ));
        }

        if dataset.field_count() > MAX_EXPECTED_FIELDS {
            warnings.push(format!(
                "unusually wide schema: {} fields",
                dataset.field_count()
            ));
        }
        if dataset.field_count() < 2 {
            warnings.push("single-column dataset, check the input format".to_string());
        }

        self.format_checks(dataset, format, &mut warnings);

        for warning in &warnings {
            warn!(%format, "{warning}");
        }
        Ok(warnings)
    }

    fn format_checks(
        &self,
        dataset: &TabularDataset,
        format: DataFormat,
        warnings: &mut Vec<String>,
    ) {
        match format {
            DataFormat::Csv => {
                if dataset
                    .columns()
                    .iter()
                    .any(|c| c.name.is_empty() || c.name.to_lowercase().starts_with("unnamed"))
                {
                    warnings.push("header row contains unnamed columns".to_string());
                }
            }
            DataFormat::Json => {
                let structured = dataset
                    .columns()
                    .iter()
                    .filter(|c| c.dtype == DType::Json)
                    .count();
                if structured * 2 > dataset.field_count() {
                    warnings.push(
                        "most fields are serialized structures; consider flattening \
                         the source further"
                            .to_string(),
                    );
                }
            }
            DataFormat::Xml => {
                if dataset
                    .columns()
                    .iter()
                    .all(|c| c.dtype == DType::Text || c.dtype == DType::Categorical)
                {
                    warnings.push(
                        "no typed values recovered from markup, all fields are text"
                            .to_string(),
                    );
                }
            }
        }
    }
}

impl Default for DataValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn text_col(name: &str, values: Vec<Option<&str>>) -> Column {
        Column::from_strings(
            name,
            values.into_iter().map(|v| v.map(|s| s.to_string())).collect(),
        )
    }

    #[test]
    fn test_empty_dataset_is_error() {
        let ds = TabularDataset::new(vec![text_col("a", vec![])]).unwrap();
        let err = DataValidator::new().validate(&ds, DataFormat::Csv).unwrap_err();
        assert!(matches!(err, StoreScoutError::Validation(_)));
    }

    #[test]
    fn test_mostly_null_column_warns() {
        let ds = TabularDataset::new(vec![
            text_col(
                "id",
                vec![Some("1"), Some("2"), Some("3"), Some("4"), Some("5"), Some("6")],
            ),
            text_col("note", vec![Some("x"), None, None, None, None, None]),
        ])
        .unwrap();
        let warnings = DataValidator::new().validate(&ds, DataFormat::Csv).unwrap();
        assert!(warnings.iter().any(|w| w.contains("note")));
    }

    #[test]
    fn test_duplicate_rows_warn() {
        let ds = TabularDataset::new(vec![
            text_col("a", vec![Some("1"); 4]),
            text_col("b", vec![Some("x"); 4]),
        ])
        .unwrap();
        let warnings = DataValidator::new().validate(&ds, DataFormat::Csv).unwrap();
        assert!(warnings.iter().any(|w| w.contains("duplicates")));
    }

    #[test]
    fn test_clean_dataset_has_no_warnings() {
        let ds = TabularDataset::new(vec![
            text_col("id", vec![Some("1"), Some("2"), Some("3")]),
            text_col("price", vec![Some("9.5"), Some("7.25"), Some("3.1")]),
        ])
        .unwrap();
        let warnings = DataValidator::new().validate(&ds, DataFormat::Csv).unwrap();
        assert!(warnings.is_empty());
    }
}
