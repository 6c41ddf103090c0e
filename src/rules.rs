//! Rule-based storage decision engine.
//!
//! A fixed catalogue of rules is evaluated against a [`DataProfile`]; among
//! the rules whose conditions all hold, the one with the most conditions
//! wins. Ties break toward earlier declaration, and an unconditional default
//! guarantees a decision for any profile.

use crate::profile::{DataProfile, ScheduleHint, StorageType};
use once_cell::sync::Lazy;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Gt,
    Lt,
    Ge,
    Le,
}

impl Comparator {
    fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::Gt => value > threshold,
            Comparator::Lt => value < threshold,
            Comparator::Ge => value >= threshold,
            Comparator::Le => value <= threshold,
        }
    }
}

/// Boolean traits of a profile a rule can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Temporal,
    Numeric,
    Text,
    Categorical,
    Spatial,
    Nested,
}

/// Numeric profile measures a rule can threshold on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    SizeMb,
    RecordCount,
    FieldCount,
}

#[derive(Debug, Clone, Copy)]
pub enum Condition {
    Flag { signal: Signal, expected: bool },
    Threshold { metric: Metric, op: Comparator, value: f64 },
}

impl Condition {
    fn matches(&self, profile: &DataProfile) -> bool {
        match *self {
            Condition::Flag { signal, expected } => {
                let actual = match signal {
                    Signal::Temporal => profile.has_temporal,
                    Signal::Numeric => profile.has_numeric,
                    Signal::Text => profile.has_text,
                    Signal::Categorical => profile.has_categorical,
                    Signal::Spatial => profile.has_spatial,
                    Signal::Nested => profile.has_nested,
                };
                actual == expected
            }
            Condition::Threshold { metric, op, value } => {
                let actual = match metric {
                    Metric::SizeMb => profile.estimated_size_mb,
                    Metric::RecordCount => profile.record_count as f64,
                    Metric::FieldCount => profile.field_count as f64,
                };
                op.apply(actual, value)
            }
        }
    }
}

const fn flag(signal: Signal, expected: bool) -> Condition {
    Condition::Flag { signal, expected }
}

const fn threshold(metric: Metric, op: Comparator, value: f64) -> Condition {
    Condition::Threshold { metric, op, value }
}

pub struct Rule {
    pub name: &'static str,
    pub conditions: Vec<Condition>,
    pub target: StorageType,
    pub confidence: f64,
    pub schedule_hint: ScheduleHint,
    rationale: fn(&DataProfile) -> String,
    pub ddl_hints: &'static [&'static str],
}

impl Rule {
    fn matches(&self, profile: &DataProfile) -> bool {
        self.conditions.iter().all(|c| c.matches(profile))
    }

    /// Number of conditions, used as the specificity score.
    fn specificity(&self) -> usize {
        self.conditions.len()
    }
}

static CATALOGUE: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            name: "very_large_temporal",
            conditions: vec![
                flag(Signal::Temporal, true),
                threshold(Metric::SizeMb, Comparator::Gt, 500.0),
                threshold(Metric::RecordCount, Comparator::Gt, 1_000_000.0),
            ],
            target: StorageType::ClickHouse,
            confidence: 0.95,
            schedule_hint: ScheduleHint::Hourly,
            rationale: |p| {
                format!(
                    "Very large time-series dataset ({} records, {:.0} MB) with a \
                     temporal axis. A columnar store handles this volume of \
                     append-heavy analytical data best.",
                    p.record_count, p.estimated_size_mb
                )
            },
            ddl_hints: &[
                "MergeTree engine with PARTITION BY toYYYYMM on the temporal column",
                "ORDER BY leading with the temporal column and identifier columns",
                "SummingMergeTree materialized view for daily aggregates",
            ],
        },
        Rule {
            name: "large_temporal",
            conditions: vec![
                flag(Signal::Temporal, true),
                threshold(Metric::SizeMb, Comparator::Gt, 100.0),
                threshold(Metric::RecordCount, Comparator::Gt, 100_000.0),
            ],
            target: StorageType::ClickHouse,
            confidence: 0.9,
            schedule_hint: ScheduleHint::Daily,
            rationale: |p| {
                format!(
                    "Large dataset ({} records, {:.0} MB) with temporal columns, \
                     suited to columnar storage and time-based partitioning.",
                    p.record_count, p.estimated_size_mb
                )
            },
            ddl_hints: &[
                "MergeTree engine with PARTITION BY toYYYYMM on the temporal column",
                "ORDER BY leading with the temporal column",
            ],
        },
        Rule {
            name: "cadastral_spatial",
            conditions: vec![
                flag(Signal::Spatial, true),
                flag(Signal::Nested, true),
                threshold(Metric::FieldCount, Comparator::Gt, 15.0),
            ],
            target: StorageType::PostgreSql,
            confidence: 0.92,
            schedule_hint: ScheduleHint::Realtime,
            rationale: |p| {
                format!(
                    "Rich spatial records with nested attributes across {} fields. \
                     A relational store with geospatial and document extensions \
                     supports both geometry queries and flexible attributes.",
                    p.field_count
                )
            },
            ddl_hints: &[
                "PostGIS extension with GEOMETRY(POINT, 4326) columns",
                "GIST index on spatial columns",
                "JSONB columns for nested attributes",
            ],
        },
        Rule {
            name: "complex_nested",
            conditions: vec![
                flag(Signal::Nested, true),
                flag(Signal::Text, true),
                threshold(Metric::FieldCount, Comparator::Gt, 20.0),
            ],
            target: StorageType::PostgreSql,
            confidence: 0.85,
            schedule_hint: ScheduleHint::Hourly,
            rationale: |p| {
                format!(
                    "Wide schema ({} fields) mixing nested structures and free \
                     text. Document columns inside a relational store keep the \
                     schema manageable.",
                    p.field_count
                )
            },
            ddl_hints: &[
                "JSONB columns with GIN indexes",
                "Generated columns for frequently queried nested keys",
            ],
        },
        Rule {
            name: "business_entities",
            conditions: vec![
                flag(Signal::Categorical, true),
                flag(Signal::Text, true),
                threshold(Metric::SizeMb, Comparator::Gt, 50.0),
                threshold(Metric::FieldCount, Comparator::Gt, 10.0),
            ],
            target: StorageType::PostgreSql,
            confidence: 0.8,
            schedule_hint: ScheduleHint::Daily,
            rationale: |p| {
                format!(
                    "Entity-style data ({} fields, {:.0} MB) with categorical \
                     dimensions and text, a natural fit for a normalized \
                     relational schema.",
                    p.field_count, p.estimated_size_mb
                )
            },
            ddl_hints: &[
                "B-tree indexes on categorical filter columns",
                "pg_trgm extension for text search",
            ],
        },
        Rule {
            name: "massive_archive",
            conditions: vec![
                threshold(Metric::SizeMb, Comparator::Gt, 5000.0),
                threshold(Metric::RecordCount, Comparator::Gt, 10_000_000.0),
            ],
            target: StorageType::Hdfs,
            confidence: 0.9,
            schedule_hint: ScheduleHint::Weekly,
            rationale: |p| {
                format!(
                    "Massive archive ({} records, {:.0} MB) beyond comfortable \
                     single-node storage. Distributed file storage with columnar \
                     files is the economical choice.",
                    p.record_count, p.estimated_size_mb
                )
            },
            ddl_hints: &[
                "Parquet files with Snappy compression",
                "Partition folders by ingestion date",
                "External Hive table over the data location",
            ],
        },
        Rule {
            name: "large_archive",
            conditions: vec![
                threshold(Metric::SizeMb, Comparator::Gt, 1000.0),
                threshold(Metric::RecordCount, Comparator::Gt, 1_000_000.0),
            ],
            target: StorageType::Hdfs,
            confidence: 0.8,
            schedule_hint: ScheduleHint::Weekly,
            rationale: |p| {
                format!(
                    "Large archival dataset ({} records, {:.0} MB) accessed in \
                     bulk rather than by key, suited to distributed file storage.",
                    p.record_count, p.estimated_size_mb
                )
            },
            ddl_hints: &[
                "Parquet files with Snappy compression",
                "External Hive table over the data location",
            ],
        },
        Rule {
            name: "small_dataset",
            conditions: vec![
                threshold(Metric::SizeMb, Comparator::Lt, 10.0),
                threshold(Metric::RecordCount, Comparator::Lt, 10_000.0),
            ],
            target: StorageType::PostgreSql,
            confidence: 0.7,
            schedule_hint: ScheduleHint::Daily,
            rationale: |p| {
                format!(
                    "Small dataset ({} records, {:.1} MB). A conventional \
                     relational table is the simplest and most capable option.",
                    p.record_count, p.estimated_size_mb
                )
            },
            ddl_hints: &["Single table with indexes on lookup columns"],
        },
        Rule {
            name: "medium_mixed",
            conditions: vec![
                threshold(Metric::SizeMb, Comparator::Le, 100.0),
                threshold(Metric::RecordCount, Comparator::Le, 100_000.0),
            ],
            target: StorageType::PostgreSql,
            confidence: 0.75,
            schedule_hint: ScheduleHint::Daily,
            rationale: |p| {
                format!(
                    "Medium dataset ({} records, {:.1} MB) with mixed column \
                     types, well served by a general-purpose relational store.",
                    p.record_count, p.estimated_size_mb
                )
            },
            ddl_hints: &[
                "Standard relational schema",
                "B-tree indexes on filter columns",
            ],
        },
    ]
});

/// Unconditional fallback when no catalogue rule matches.
static DEFAULT_RULE: Lazy<Rule> = Lazy::new(|| Rule {
    name: "default",
    conditions: Vec::new(),
    target: StorageType::PostgreSql,
    confidence: 0.6,
    schedule_hint: ScheduleHint::Daily,
    rationale: default_rationale,
    ddl_hints: &["Standard relational schema"],
});

fn default_rationale(_: &DataProfile) -> String {
    "No specialized rule applied. A general-purpose relational store is the \
     safe default."
        .to_string()
}

/// Outcome of one rule evaluation.
#[derive(Debug, Clone)]
pub struct RuleDecision {
    pub rule_name: &'static str,
    pub target: StorageType,
    pub confidence: f64,
    pub rationale: String,
    pub schedule_hint: ScheduleHint,
    pub ddl_hints: Vec<String>,
    /// Conditions of the winning rule, all satisfied.
    pub matched_conditions: usize,
}

pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Pick the most specific matching rule. Deterministic for a given
    /// profile: ties break toward the earlier rule, and the catch-all
    /// default makes a match certain.
    pub fn evaluate(&self, profile: &DataProfile) -> RuleDecision {
        // Strict comparison keeps the first rule on specificity ties.
        let winner = CATALOGUE
            .iter()
            .filter(|rule| rule.matches(profile))
            .fold(None::<&Rule>, |best, rule| match best {
                Some(b) if rule.specificity() <= b.specificity() => Some(b),
                _ => Some(rule),
            })
            .unwrap_or(&*DEFAULT_RULE);

        debug!(
            rule = winner.name,
            target = %winner.target,
            confidence = winner.confidence,
            "storage rule selected"
        );

        RuleDecision {
            rule_name: winner.name,
            target: winner.target,
            confidence: winner.confidence,
            rationale: (winner.rationale)(profile),
            schedule_hint: winner.schedule_hint,
            ddl_hints: winner.ddl_hints.iter().map(|h| h.to_string()).collect(),
            matched_conditions: winner.specificity(),
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
