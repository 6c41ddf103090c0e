//! StoreScout: dataset profiling and storage-backend recommendation.
//!
//! Feed it a raw CSV, JSON or XML file and it parses the data, extracts a
//! structural profile, picks a storage back-end through a deterministic rule
//! catalogue and emits ready-to-run DDL for that back-end. An optional LLM
//! augmenter can rewrite the rationale and refine the schema; its failures
//! never fail a recommendation.

pub mod augment;
pub mod dataset;
pub mod errors;
pub mod features;
pub mod generators;
pub mod parsers;
pub mod profile;
pub mod rules;
pub mod validation;

// Re-exports
pub use augment::{Augmenter, AugmenterConfig, HttpAugmenter};
pub use dataset::{Column, ColumnValues, DType, TabularDataset};
pub use errors::{Result, StoreScoutError};
pub use features::FeatureExtractor;
pub use generators::{generator_for, DdlGenerator};
pub use parsers::{DataFormat, ParseStrategy};
pub use profile::{
    AnalysisReport, DataProfile, FeatureSet, FileInfo, Recommendation, ScheduleHint,
    StorageType,
};
pub use rules::{RuleDecision, RuleEngine};
pub use validation::DataValidator;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Rationale augmentation only runs for reasonably confident decisions.
const AUGMENT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Main configuration for StoreScout
#[derive(Clone)]
pub struct StoreScoutConfig {
    /// Row cap for the classification sample; `None` disables sampling.
    pub sample_rows: Option<usize>,
    /// Optional LLM augmenter for rationale and schema refinement.
    pub augmenter: Option<Arc<dyn Augmenter>>,
}

impl Default for StoreScoutConfig {
    fn default() -> Self {
        Self {
            sample_rows: Some(10_000),
            augmenter: None,
        }
    }
}

/// Main StoreScout library interface
pub struct StoreScout {
    extractor: FeatureExtractor,
    engine: RuleEngine,
    validator: DataValidator,
    config: StoreScoutConfig,
}

impl StoreScout {
    /// Create a new StoreScout instance
    pub fn new(config: StoreScoutConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            engine: RuleEngine::new(),
            validator: DataValidator::new(),
            config,
        }
    }

    /// Parse and profile a data file without making a recommendation.
    ///
    /// `format` overrides detection from the file name.
    pub fn analyze(&self, path: &Path, format: Option<DataFormat>) -> Result<AnalysisReport> {
        let (profile, features, file_info, warnings) = self.profile_file(path, format)?;
        Ok(AnalysisReport {
            data_profile: profile,
            features,
            file_info,
            validation_warnings: warnings,
        })
    }

    /// Full pipeline: parse, profile, decide, generate DDL and optionally
    /// augment.
    pub async fn recommend(
        &self,
        path: &Path,
        format: Option<DataFormat>,
        table_name: &str,
    ) -> Result<Recommendation> {
        let (profile, features, file_info, warnings) = self.profile_file(path, format)?;

        let decision = self.engine.evaluate(&profile);
        let generator = generator_for(decision.target);
        let ddl_script = generator.generate(&features, table_name);

        info!(
            target = %decision.target,
            rule = decision.rule_name,
            confidence = decision.confidence,
            "storage recommendation ready"
        );

        let mut recommendation = Recommendation {
            target: decision.target,
            confidence: decision.confidence,
            rationale: decision.rationale.clone(),
            schedule_hint: decision.schedule_hint,
            ddl_hints: decision.ddl_hints.clone(),
            ddl_script,
            data_profile: profile,
            file_info,
            validation_warnings: warnings,
            augmented: false,
        };

        if decision.confidence > AUGMENT_CONFIDENCE_THRESHOLD {
            if let Some(augmenter) = &self.config.augmenter {
                self.augment(augmenter.as_ref(), &features, &decision, table_name, &mut recommendation)
                    .await;
            }
        }

        Ok(recommendation)
    }

    /// Best-effort augmentation; keeps the templated output on any failure.
    async fn augment(
        &self,
        augmenter: &dyn Augmenter,
        features: &FeatureSet,
        decision: &RuleDecision,
        table_name: &str,
        recommendation: &mut Recommendation,
    ) {
        match augmenter
            .generate_rationale(&recommendation.data_profile, decision)
            .await
        {
            Ok(rationale) => {
                recommendation.rationale = rationale;
                recommendation.augmented = true;
            }
            Err(e) => warn!("rationale augmentation failed, keeping template: {e}"),
        }

        match augmenter
            .generate_ddl(
                features,
                decision.target,
                table_name,
                &recommendation.ddl_script,
            )
            .await
        {
            Ok(ddl) => recommendation.ddl_script = ddl,
            Err(e) => warn!("schema augmentation failed, keeping generated DDL: {e}"),
        }
    }

    #[allow(clippy::type_complexity)]
    fn profile_file(
        &self,
        path: &Path,
        format: Option<DataFormat>,
    ) -> Result<(DataProfile, FeatureSet, Option<FileInfo>, Vec<String>)> {
        let format = match format {
            Some(f) => f,
            None => DataFormat::detect(path)?,
        };
        let file_size_mb = fs::metadata(path)?.len() as f64 / (1024.0 * 1024.0);

        let output = parsers::parse(path, format)?;
        let warnings = self.validator.validate(&output.dataset, format)?;

        let mut dataset = output.dataset;
        let features = self
            .extractor
            .extract(&mut dataset, self.config.sample_rows);
        let profile = features.to_profile(format);

        let file_info = Some(FileInfo {
            file_size_mb,
            parsing_strategy: output.strategy,
            structure: output.structure.map(|s| s.to_string()),
        });

        Ok((profile, features, file_info, warnings))
    }
}

impl Default for StoreScout {
    fn default() -> Self {
        Self::new(StoreScoutConfig::default())
    }
}
