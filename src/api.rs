// src/api.rs
//! HTTP surface over the scorer.
//!
//! Routes:
//! - GET  /health
//! - POST /grade       {"text": ".."}  → ScoreResult
//! - POST /grade/html  {"html": ".."}  → {word_count, result}
//! - POST /explain     {"text": ".."}  → result + match events (incl. suppressed)
//! - GET  /catalog                     → rule listing

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::batch::DEFAULT_SCORE_TIMEOUT;
use crate::catalog::RuleDef;
use crate::deadline::{run_with_deadline, score_with_deadline, ScoringTimeout};
use crate::extract::PolicyDocument;
use crate::metrics;
use crate::scorer::{PolicyScorer, ScoreResult, ScoringConfig};

#[derive(Clone)]
pub struct ApiState {
    scorer: Arc<PolicyScorer>,
    score_timeout: Duration,
}

impl ApiState {
    pub fn new(scorer: Arc<PolicyScorer>, score_timeout: Duration) -> Self {
        Self {
            scorer,
            score_timeout,
        }
    }

    /// Built-in catalog and the default deadline.
    pub fn builtin() -> Result<Self, crate::catalog::CatalogError> {
        Ok(Self::new(
            Arc::new(PolicyScorer::builtin()?),
            DEFAULT_SCORE_TIMEOUT,
        ))
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/grade", post(grade))
        .route("/grade/html", post(grade_html))
        .route("/explain", post(explain))
        .route("/catalog", get(catalog))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Timeout(ScoringTimeout),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Timeout(t) => (StatusCode::SERVICE_UNAVAILABLE, t.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl From<ScoringTimeout> for ApiError {
    fn from(value: ScoringTimeout) -> Self {
        Self::Timeout(value)
    }
}

#[derive(Deserialize)]
struct TextReq {
    text: String,
}

#[derive(Deserialize)]
struct HtmlReq {
    html: String,
}

#[derive(Serialize)]
struct HtmlResp {
    word_count: usize,
    result: ScoreResult,
}

#[derive(Serialize)]
struct CatalogResp {
    scoring: ScoringConfig,
    positive: Vec<RuleDef>,
    negative: Vec<RuleDef>,
}

async fn grade(
    State(state): State<ApiState>,
    Json(body): Json<TextReq>,
) -> Result<Json<ScoreResult>, ApiError> {
    let t0 = std::time::Instant::now();
    let result = score_with_deadline(state.scorer, body.text, state.score_timeout).await?;
    metrics::record_scored(result.grade, t0.elapsed());
    Ok(Json(result))
}

async fn grade_html(
    State(state): State<ApiState>,
    Json(body): Json<HtmlReq>,
) -> Result<Json<HtmlResp>, ApiError> {
    let doc = PolicyDocument::from_html(&body.html);
    let t0 = std::time::Instant::now();
    let result =
        score_with_deadline(state.scorer, doc.normalized_text, state.score_timeout).await?;
    metrics::record_scored(result.grade, t0.elapsed());
    Ok(Json(HtmlResp {
        word_count: doc.word_count,
        result,
    }))
}

async fn explain(
    State(state): State<ApiState>,
    Json(body): Json<TextReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let scorer = state.scorer;
    let value = run_with_deadline(state.score_timeout, move || {
        serde_json::to_value(scorer.explain(&body.text))
    })
    .await?
    .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(value))
}

async fn catalog(State(state): State<ApiState>) -> Json<CatalogResp> {
    let cat = state.scorer.catalog();
    Json(CatalogResp {
        scoring: state.scorer.config().clone(),
        positive: cat.positive().iter().map(|r| r.to_def()).collect(),
        negative: cat.negative().iter().map(|r| r.to_def()).collect(),
    })
}
