// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod catalog;
pub mod grade;
pub mod negation;
pub mod scorer;

// Caller-side deadline around the scorer
pub mod deadline;

// Batch harness: fetch → extract → score → report
pub mod batch;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod report;

pub mod api;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::catalog::{CatalogError, Category, PatternCatalog, PatternRule, RuleDef};
pub use crate::deadline::{score_with_deadline, ScoringTimeout};
pub use crate::extract::PolicyDocument;
pub use crate::grade::Grade;
pub use crate::negation::{NegationDetector, NEGATION_WINDOW_CHARS};
pub use crate::scorer::{Explanation, MatchEvent, PolicyScorer, ScoreResult, ScoringConfig};
