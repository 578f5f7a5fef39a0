// src/fetch.rs
//! Policy page fetchers.
//!
//! `HttpFetcher` talks to the network; `FixtureFetcher` serves scripted
//! responses from memory for tests and offline runs.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("no page registered for {0}")]
    Missing(String),
}

impl FetchError {
    /// Server-side and transport failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(code) => *code == 429 || *code >= 500,
            FetchError::Transport(_) => true,
            FetchError::Missing(_) => false,
        }
    }
}

#[async_trait]
pub trait PolicyFetcher: Send + Sync {
    /// Fetch the raw HTML behind `url`.
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;
    fn name(&self) -> &'static str;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        use reqwest::header::{self, HeaderMap, HeaderValue};

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PolicyFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(error = ?e, url, "policy http error");
            FetchError::Transport(e.to_string())
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.text()
            .await
            .map_err(|e| FetchError::Transport(format!("reading body: {e}")))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// In-memory fetcher. Each URL holds a queue of responses; the last one
/// repeats once the queue is down to it.
#[derive(Default)]
pub struct FixtureFetcher {
    pages: Mutex<HashMap<String, VecDeque<Result<String, FetchError>>>>,
    calls: AtomicUsize,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.push(url.into(), Ok(html.into()));
        self
    }

    pub fn with_failure(self, url: impl Into<String>, err: FetchError) -> Self {
        self.push(url.into(), Err(err));
        self
    }

    fn push(&self, url: String, resp: Result<String, FetchError>) {
        let mut pages = self.pages.lock().unwrap_or_else(|p| p.into_inner());
        pages.entry(url).or_default().push_back(resp);
    }

    /// Total `fetch_html` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyFetcher for FixtureFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut pages = self.pages.lock().unwrap_or_else(|p| p.into_inner());
        let Some(queue) = pages.get_mut(url) else {
            return Err(FetchError::Missing(url.to_string()));
        };
        match queue.len() {
            0 => Err(FetchError::Missing(url.to_string())),
            1 => queue[0].clone(),
            _ => queue
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Missing(url.to_string()))),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
