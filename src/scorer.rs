// src/scorer.rs
//! Policy scorer: applies the catalog to a document and maps the result to a grade.
//!
//! Pass order:
//! 1) start from the baseline (50)
//! 2) positive rules: existence only, each adds its weight once
//! 3) negative rules: first match only; suppressed when the negation window
//!    before it contains a cue, otherwise adds its (negative) weight
//! 4) count bonuses for many positive findings (cumulative tiers)
//! 5) clamp to [0, 100] and grade top-down
//!
//! Repeats of a phrase never compound: a rule contributes at most once.

use crate::catalog::{CatalogError, PatternCatalog, PatternRule};
use crate::grade::{Grade, GradeThresholds};
use crate::negation::{NegationDetector, NEGATION_WINDOW_CHARS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const BASELINE_SCORE: i32 = 50;
pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

pub const FIRST_BONUS_MIN_POSITIVES: usize = 5;
pub const FIRST_BONUS: i32 = 10;
pub const SECOND_BONUS_MIN_POSITIVES: usize = 8;
pub const SECOND_BONUS: i32 = 10;

/// Extra points once at least `min_positive` positive rules fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusTier {
    pub min_positive: usize,
    pub bonus: i32,
}

/// Tunables for one scorer. Defaults give the standard A-E grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub baseline: i32,
    pub negation_window: usize,
    pub bonus_tiers: Vec<BonusTier>,
    pub grades: GradeThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            baseline: BASELINE_SCORE,
            negation_window: NEGATION_WINDOW_CHARS,
            bonus_tiers: vec![
                BonusTier {
                    min_positive: FIRST_BONUS_MIN_POSITIVES,
                    bonus: FIRST_BONUS,
                },
                BonusTier {
                    min_positive: SECOND_BONUS_MIN_POSITIVES,
                    bonus: SECOND_BONUS,
                },
            ],
            grades: GradeThresholds::default(),
        }
    }
}

impl ScoringConfig {
    /// Sum of every tier reached by `positive_count`.
    pub fn bonus_for(&self, positive_count: usize) -> i32 {
        self.bonus_tiers
            .iter()
            .filter(|t| positive_count >= t.min_positive)
            .fold(0i32, |acc, t| acc.saturating_add(t.bonus))
    }

    /// Reject settings that would make grades or bonuses meaningless.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&self.baseline) {
            return Err(CatalogError::InvalidScoring(format!(
                "baseline {} is outside {MIN_SCORE}..={MAX_SCORE}",
                self.baseline
            )));
        }
        if let Some(t) = self.bonus_tiers.iter().find(|t| t.bonus < 0) {
            return Err(CatalogError::InvalidScoring(format!(
                "bonus tier at {} positives has negative bonus {}",
                t.min_positive, t.bonus
            )));
        }
        self.grades.validate().map_err(CatalogError::InvalidScoring)
    }
}

/// Outcome of scoring one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u8,
    pub grade: Grade,
    pub positive_labels: Vec<String>,
    pub negative_labels: Vec<String>,
}

/// One rule's first match during a pass.
#[derive(Debug, Clone, Serialize)]
pub struct MatchEvent<'c> {
    #[serde(rename = "rule_id", serialize_with = "serialize_rule_id")]
    pub rule: &'c PatternRule,
    pub offset: usize,
    pub negated: bool,
}

fn serialize_rule_id<S: serde::Serializer>(rule: &&PatternRule, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&rule.id)
}

/// A result together with every match event that produced it,
/// including negated (suppressed) negative matches.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation<'c> {
    pub result: ScoreResult,
    pub raw_score: i32,
    pub bonus: i32,
    pub events: Vec<MatchEvent<'c>>,
}

impl<'c> Explanation<'c> {
    pub fn suppressed(&self) -> impl Iterator<Item = &MatchEvent<'c>> + '_ {
        self.events.iter().filter(|e| e.negated)
    }
}

#[derive(Debug, Clone)]
pub struct PolicyScorer {
    catalog: PatternCatalog,
    negation: NegationDetector,
    config: ScoringConfig,
}

#[derive(Debug, Deserialize)]
struct ScoringFile {
    #[serde(default)]
    scoring: ScoringConfig,
}

impl PolicyScorer {
    pub fn new(catalog: PatternCatalog, negation: NegationDetector, config: ScoringConfig) -> Self {
        Self {
            catalog,
            negation,
            config,
        }
    }

    /// Catalog with default negation and scoring settings.
    pub fn with_catalog(catalog: PatternCatalog) -> Self {
        let config = ScoringConfig::default();
        let negation = NegationDetector::new(config.negation_window);
        Self::new(catalog, negation, config)
    }

    /// Built-in catalog, default settings.
    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(Self::with_catalog(PatternCatalog::builtin()?))
    }

    /// `[[rules]]` plus an optional `[scoring]` table from one TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CatalogError> {
        let catalog = PatternCatalog::from_toml_str(toml_str)?;
        let file: ScoringFile = toml::from_str(toml_str)?;
        file.scoring.validate()?;
        let negation = NegationDetector::new(file.scoring.negation_window);
        Ok(Self::new(catalog, negation, file.scoring))
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn negation(&self) -> &NegationDetector {
        &self.negation
    }

    /// Score `text`. Total over all inputs; `""` yields the baseline.
    pub fn score_document(&self, text: &str) -> ScoreResult {
        self.explain(text).result
    }

    /// Score `text` and return the match events behind the result.
    pub fn explain<'c>(&'c self, text: &str) -> Explanation<'c> {
        let mut score = self.config.baseline;
        let mut positive_labels = Vec::new();
        let mut negative_labels = Vec::new();
        let mut events = Vec::new();

        for rule in self.catalog.positive() {
            if let Some(offset) = rule.first_match(text) {
                positive_labels.push(rule.label.clone());
                score = score.saturating_add(rule.weight);
                events.push(MatchEvent {
                    rule,
                    offset,
                    negated: false,
                });
            }
        }

        for rule in self.catalog.negative() {
            let Some(offset) = rule.first_match(text) else {
                continue;
            };
            let negated = self.negation.is_negated(text, offset);
            if !negated {
                negative_labels.push(rule.label.clone());
                score = score.saturating_add(rule.weight);
            }
            events.push(MatchEvent {
                rule,
                offset,
                negated,
            });
        }

        let bonus = self.config.bonus_for(positive_labels.len());
        let raw_score = score.saturating_add(bonus);
        let clamped = raw_score.clamp(MIN_SCORE, MAX_SCORE) as u8;
        let grade = self.config.grades.grade_for(clamped);

        debug!(
            doc = %doc_id(text),
            score = clamped,
            %grade,
            positives = positive_labels.len(),
            negatives = negative_labels.len(),
            suppressed = events.iter().filter(|e| e.negated).count(),
            "policy scored"
        );

        Explanation {
            result: ScoreResult {
                score: clamped,
                grade,
                positive_labels,
                negative_labels,
            },
            raw_score,
            bonus,
            events,
        }
    }
}

/// Short, anonymized id for log lines. Never log the policy text itself.
pub(crate) fn doc_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
