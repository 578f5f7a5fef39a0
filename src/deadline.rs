// src/deadline.rs
//! Caller-side scoring deadline.
//!
//! Scoring is synchronous, so it runs on tokio's blocking pool and is raced
//! against a timer. A lost race yields `ScoringTimeout`, which callers must
//! report as "unscoreable", never as a low score. The blocking task itself
//! cannot be interrupted and finishes in the background.

use crate::scorer::{PolicyScorer, ScoreResult};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("scoring exceeded its {limit_ms} ms deadline")]
pub struct ScoringTimeout {
    pub limit_ms: u64,
}

impl ScoringTimeout {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Run `work` on the blocking pool, giving up after `limit`.
///
/// A panic inside `work` is re-raised on the caller.
pub async fn run_with_deadline<F, T>(limit: Duration, work: F) -> Result<T, ScoringTimeout>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join)) if join.is_panic() => std::panic::resume_unwind(join.into_panic()),
        // cancelled: the runtime is shutting down
        Ok(Err(_)) | Err(_) => Err(ScoringTimeout::new(limit)),
    }
}

/// `PolicyScorer::score_document` under a deadline.
pub async fn score_with_deadline(
    scorer: Arc<PolicyScorer>,
    text: String,
    limit: Duration,
) -> Result<ScoreResult, ScoringTimeout> {
    run_with_deadline(limit, move || scorer.score_document(&text)).await
}
