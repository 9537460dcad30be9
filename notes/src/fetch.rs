use crate::github::GithubClient;
use crate::source::{NoteSource, NotesError, NotesResult};
use crate::types::{RepoId, ResolvedNote};
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// Strategy has no credentials to act with and never issued a request.
    Skipped,
    /// The endpoint answered but has no such content.
    Missing,
    /// 401/403 answer.
    Denied,
    RateLimited,
    /// Network failure or unexpected status; non-fatal by design.
    Unavailable,
}

#[derive(Debug)]
pub enum StrategyOutcome {
    Hit(String),
    Miss(MissReason),
}

/// One way of turning a resolved note location into its text content.
#[async_trait]
pub trait ContentStrategy: Send + Sync {
    async fn fetch(&self, repo: &RepoId, note: &ResolvedNote) -> StrategyOutcome;

    fn strategy_name(&self) -> &'static str;
}

fn classify_status(status: StatusCode, rate_remaining: Option<&str>) -> MissReason {
    match status.as_u16() {
        404 => MissReason::Missing,
        403 if rate_remaining == Some("0") => MissReason::RateLimited,
        401 | 403 => MissReason::Denied,
        429 => MissReason::RateLimited,
        _ => MissReason::Unavailable,
    }
}

async fn fetch_raw(
    http: &reqwest::Client,
    url: &str,
    cookie: Option<&str>,
) -> StrategyOutcome {
    let mut request = http.get(url);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("Request to {} failed: {}", url, e);
            return StrategyOutcome::Miss(MissReason::Unavailable);
        }
    };

    let status = response.status();
    if !status.is_success() {
        let rate_remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        return StrategyOutcome::Miss(classify_status(status, rate_remaining.as_deref()));
    }

    match response.text().await {
        Ok(text) => StrategyOutcome::Hit(text),
        Err(e) => {
            debug!("Reading body from {} failed: {}", url, e);
            StrategyOutcome::Miss(MissReason::Unavailable)
        }
    }
}

/// Cookie-authenticated fetch from the github.com web raw endpoint. The
/// analog of a same-origin request riding the browser session.
pub struct WebSessionStrategy {
    http: reqwest::Client,
    web_base: String,
    cookie: Option<String>,
}

#[async_trait]
impl ContentStrategy for WebSessionStrategy {
    async fn fetch(&self, repo: &RepoId, note: &ResolvedNote) -> StrategyOutcome {
        let Some(cookie) = &self.cookie else {
            return StrategyOutcome::Miss(MissReason::Skipped);
        };

        let url = format!(
            "{}/{}/{}/raw/{}/{}",
            self.web_base, repo.owner, repo.repo, note.tip_commit, note.path
        );
        fetch_raw(&self.http, &url, Some(cookie)).await
    }

    fn strategy_name(&self) -> &'static str {
        "web-session"
    }
}

/// Unauthenticated fetch from raw.githubusercontent.com.
pub struct PublicRawStrategy {
    http: reqwest::Client,
    raw_base: String,
}

#[async_trait]
impl ContentStrategy for PublicRawStrategy {
    async fn fetch(&self, repo: &RepoId, note: &ResolvedNote) -> StrategyOutcome {
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.raw_base, repo.owner, repo.repo, note.tip_commit, note.path
        );
        fetch_raw(&self.http, &url, None).await
    }

    fn strategy_name(&self) -> &'static str {
        "public-raw"
    }
}

/// Token-authenticated blob fetch through the REST API.
pub struct TokenBlobStrategy {
    source: Arc<dyn NoteSource>,
    has_token: bool,
}

#[async_trait]
impl ContentStrategy for TokenBlobStrategy {
    async fn fetch(&self, repo: &RepoId, note: &ResolvedNote) -> StrategyOutcome {
        if !self.has_token {
            return StrategyOutcome::Miss(MissReason::Skipped);
        }

        match self.source.blob_content(repo, &note.blob_sha).await {
            Ok(text) => StrategyOutcome::Hit(text),
            Err(NotesError::NotFound { .. }) => StrategyOutcome::Miss(MissReason::Missing),
            Err(NotesError::AuthInvalid) | Err(NotesError::NoToken) => {
                StrategyOutcome::Miss(MissReason::Denied)
            }
            Err(NotesError::RateLimited) => StrategyOutcome::Miss(MissReason::RateLimited),
            Err(e) => {
                debug!("Blob fetch failed: {}", e);
                StrategyOutcome::Miss(MissReason::Unavailable)
            }
        }
    }

    fn strategy_name(&self) -> &'static str {
        "token-blob"
    }
}

/// Runs the strategy chain in order, stopping at the first hit. When every
/// strategy misses, the misses are folded into the most useful error.
pub struct ContentFetcher {
    strategies: Vec<Box<dyn ContentStrategy>>,
    has_token: bool,
}

impl ContentFetcher {
    pub fn new(strategies: Vec<Box<dyn ContentStrategy>>, has_token: bool) -> Self {
        Self {
            strategies,
            has_token,
        }
    }

    /// The standard chain: web session, public raw, token blob.
    pub fn for_client(client: Arc<GithubClient>) -> Self {
        let config = client.config();
        let has_token = config.token.is_some();

        let strategies: Vec<Box<dyn ContentStrategy>> = vec![
            Box::new(WebSessionStrategy {
                http: client.http().clone(),
                web_base: config.web_base.clone(),
                cookie: config.session_cookie.clone(),
            }),
            Box::new(PublicRawStrategy {
                http: client.http().clone(),
                raw_base: config.raw_base.clone(),
            }),
            Box::new(TokenBlobStrategy {
                source: client.clone() as Arc<dyn NoteSource>,
                has_token,
            }),
        ];

        Self::new(strategies, has_token)
    }

    pub async fn fetch(&self, repo: &RepoId, note: &ResolvedNote) -> NotesResult<String> {
        let mut saw_denied = false;
        let mut saw_rate_limit = false;

        for strategy in &self.strategies {
            match strategy.fetch(repo, note).await {
                StrategyOutcome::Hit(text) => {
                    info!(
                        "Fetched note {} via {} strategy",
                        note.path,
                        strategy.strategy_name()
                    );
                    return Ok(text);
                }
                StrategyOutcome::Miss(reason) => {
                    debug!(
                        "Strategy {} missed for {}: {:?}",
                        strategy.strategy_name(),
                        note.path,
                        reason
                    );
                    match reason {
                        MissReason::Denied => saw_denied = true,
                        MissReason::RateLimited => saw_rate_limit = true,
                        _ => {}
                    }
                }
            }
        }

        if saw_rate_limit {
            Err(NotesError::RateLimited)
        } else if saw_denied && !self.has_token {
            Err(NotesError::NoToken)
        } else if saw_denied {
            Err(NotesError::AuthInvalid)
        } else {
            Err(NotesError::not_found(format!("note content {}", note.path)))
        }
    }
}
