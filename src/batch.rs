// src/batch.rs
//! Batch runner: fetch → extract → score (with deadline) for a list of services.
//!
//! Pacing and retry behavior are injected (`Throttle`, `RetryPolicy`) so runs
//! are reproducible in tests and no counters live in module state.

use crate::deadline::score_with_deadline;
use crate::extract::PolicyDocument;
use crate::fetch::{FetchError, PolicyFetcher};
use crate::grade::Grade;
use crate::metrics;
use crate::report::{BatchSummary, Outcome, ReportRow};
use crate::scorer::PolicyScorer;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_SCORE_TIMEOUT: Duration = Duration::from_secs(5);

/// One policy page to grade, with the grade it is expected to get.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    #[serde(default)]
    pub expected: Option<Grade>,
    pub url: String,
}

/// Pause between consecutive services.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        tokio::time::sleep(self.0).await;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn pause(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total fetch attempts per service, including the first. Minimum 1.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    #[serde(skip)]
    pub rows: Vec<ReportRow>,
    pub summary: BatchSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct BatchRunner {
    scorer: Arc<PolicyScorer>,
    fetcher: Arc<dyn PolicyFetcher>,
    throttle: Arc<dyn Throttle>,
    retry: RetryPolicy,
    score_timeout: Duration,
}

impl BatchRunner {
    pub fn new(scorer: Arc<PolicyScorer>, fetcher: Arc<dyn PolicyFetcher>) -> Self {
        Self {
            scorer,
            fetcher,
            throttle: Arc::new(FixedDelay(DEFAULT_REQUEST_DELAY)),
            retry: RetryPolicy::default(),
            score_timeout: DEFAULT_SCORE_TIMEOUT,
        }
    }

    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_score_timeout(mut self, limit: Duration) -> Self {
        self.score_timeout = limit;
        self
    }

    /// Grade every service in order, pausing between services.
    pub async fn run(&self, services: &[ServiceEntry]) -> BatchReport {
        metrics::ensure_described();
        let started_at = Utc::now();
        info!(
            target: "batch",
            services = services.len(),
            fetcher = self.fetcher.name(),
            "batch run started"
        );

        let mut rows = Vec::with_capacity(services.len());
        for (i, svc) in services.iter().enumerate() {
            if i > 0 {
                self.throttle.pause().await;
            }
            let row = self.run_one(svc).await;
            info!(
                target: "batch",
                n = i + 1,
                of = services.len(),
                service = %svc.name,
                actual = row.actual(),
                expected = svc.expected.map(Grade::as_str).unwrap_or("-"),
                matched = row.is_match(),
                "service graded"
            );
            rows.push(row);
        }

        let summary = BatchSummary::from_rows(&rows);
        BatchReport {
            rows,
            summary,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Fetch, extract and score one service. Never fails: problems become
    /// `Outcome::FetchFailed` or `Outcome::TimedOut`.
    pub async fn run_one(&self, svc: &ServiceEntry) -> ReportRow {
        let html = match self.fetch_with_retry(&svc.url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(target: "batch", service = %svc.name, error = %e, "fetch failed");
                metrics::record_fetch_error();
                return ReportRow::new(
                    svc.name.clone(),
                    svc.expected,
                    0,
                    Outcome::FetchFailed(e.to_string()),
                );
            }
        };

        let doc = PolicyDocument::from_html(&html);
        let t0 = Instant::now();
        let outcome = match score_with_deadline(
            Arc::clone(&self.scorer),
            doc.normalized_text,
            self.score_timeout,
        )
        .await
        {
            Ok(result) => {
                metrics::record_scored(result.grade, t0.elapsed());
                Outcome::Graded(result)
            }
            Err(timeout) => {
                warn!(target: "batch", service = %svc.name, %timeout, "scoring timed out");
                metrics::record_timeout();
                Outcome::TimedOut(timeout)
            }
        };
        ReportRow::new(svc.name.clone(), svc.expected, doc.word_count, outcome)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetcher.fetch_html(url).await {
                Ok(html) => return Ok(html),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(target: "batch", url, attempt, error = %e, "retrying fetch");
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
