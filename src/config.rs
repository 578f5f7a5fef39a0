// src/config.rs
//! Harness configuration: environment variables with defaults, TOML service lists,
//! and scorer construction from an optional catalog file.
//!
//! Lookup order for every setting: CLI flag (applied by the binary) → env → default.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::{RetryPolicy, ServiceEntry, DEFAULT_REQUEST_DELAY, DEFAULT_SCORE_TIMEOUT};
use crate::catalog::CatalogError;
use crate::fetch::DEFAULT_FETCH_TIMEOUT;
use crate::scorer::PolicyScorer;

pub const ENV_SERVICES_PATH: &str = "PRIVACY_SERVICES_PATH";
pub const ENV_REPORT_PATH: &str = "PRIVACY_REPORT_PATH";
pub const ENV_CATALOG_PATH: &str = "PRIVACY_CATALOG_PATH";
pub const ENV_REQUEST_DELAY_MS: &str = "PRIVACY_REQUEST_DELAY_MS";
pub const ENV_SCORE_TIMEOUT_MS: &str = "PRIVACY_SCORE_TIMEOUT_MS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "PRIVACY_FETCH_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "PRIVACY_MAX_ATTEMPTS";
pub const ENV_RETRY_BACKOFF_MS: &str = "PRIVACY_RETRY_BACKOFF_MS";
pub const ENV_BIND_ADDR: &str = "PRIVACY_BIND_ADDR";

pub const DEFAULT_SERVICES_PATH: &str = "config/services.toml";
pub const DEFAULT_REPORT_PATH: &str = "batch-test-results.csv";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub services_path: PathBuf,
    pub report_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub request_delay: Duration,
    pub score_timeout: Duration,
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
    pub bind_addr: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            services_path: PathBuf::from(DEFAULT_SERVICES_PATH),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            catalog_path: None,
            request_delay: DEFAULT_REQUEST_DELAY,
            score_timeout: DEFAULT_SCORE_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            retry: RetryPolicy::default(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match get(key) {
                Some(v) => Ok(Duration::from_millis(parse_num(key, &v)?)),
                None => Ok(default),
            }
        };

        let mut cfg = Self::default();
        if let Some(p) = get(ENV_SERVICES_PATH) {
            cfg.services_path = PathBuf::from(p);
        }
        if let Some(p) = get(ENV_REPORT_PATH) {
            cfg.report_path = PathBuf::from(p);
        }
        cfg.catalog_path = get(ENV_CATALOG_PATH).map(PathBuf::from);
        cfg.request_delay = millis(ENV_REQUEST_DELAY_MS, cfg.request_delay)?;
        cfg.score_timeout = millis(ENV_SCORE_TIMEOUT_MS, cfg.score_timeout)?;
        if let Some(v) = get(ENV_FETCH_TIMEOUT_SECS) {
            cfg.fetch_timeout = Duration::from_secs(parse_num(ENV_FETCH_TIMEOUT_SECS, &v)?);
        }
        if let Some(v) = get(ENV_MAX_ATTEMPTS) {
            let n = parse_num(ENV_MAX_ATTEMPTS, &v)?;
            cfg.retry.max_attempts = u32::try_from(n).unwrap_or(u32::MAX).max(1);
        }
        cfg.retry.backoff = millis(ENV_RETRY_BACKOFF_MS, cfg.retry.backoff)?;
        if let Some(addr) = get(ENV_BIND_ADDR) {
            cfg.bind_addr = addr;
        }
        Ok(cfg)
    }
}

fn parse_num(key: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|e| anyhow!("{key}={raw:?} is not a non-negative integer: {e}"))
}

#[derive(Debug, Deserialize)]
struct ServicesFile {
    services: Vec<ServiceEntry>,
}

pub fn parse_services(toml_str: &str) -> Result<Vec<ServiceEntry>> {
    let file: ServicesFile = toml::from_str(toml_str).context("parsing services list")?;
    let services: Vec<ServiceEntry> = file
        .services
        .into_iter()
        .map(|mut s| {
            s.name = s.name.trim().to_string();
            s.url = s.url.trim().to_string();
            s
        })
        .collect();
    if let Some(bad) = services.iter().find(|s| s.name.is_empty() || s.url.is_empty()) {
        return Err(anyhow!("service entry with empty name or url: {bad:?}"));
    }
    Ok(services)
}

pub fn load_services(path: &Path) -> Result<Vec<ServiceEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading services from {}", path.display()))?;
    parse_services(&content)
}

/// Scorer from a TOML catalog when a path is given, otherwise the built-in table.
pub fn load_scorer(catalog_path: Option<&Path>) -> Result<PolicyScorer, CatalogError> {
    match catalog_path {
        Some(p) => PolicyScorer::from_path(p),
        None => PolicyScorer::builtin(),
    }
}
