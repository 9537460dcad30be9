use crate::config::GithubConfig;
use crate::source::{NoteSource, NotesError, NotesResult};
use crate::types::{AuthStatus, EntryKind, RepoId, TreeEntry};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("git-notes-viewer/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

#[derive(Deserialize)]
struct ApiRef {
    object: ApiObjectRef,
}

#[derive(Deserialize)]
struct ApiObjectRef {
    sha: String,
}

#[derive(Deserialize)]
struct ApiCommit {
    tree: ApiObjectRef,
}

#[derive(Deserialize)]
struct ApiTree {
    tree: Vec<ApiTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct ApiTreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    sha: String,
}

#[derive(Deserialize)]
struct ApiBlob {
    content: String,
    encoding: String,
}

#[derive(Deserialize)]
struct ApiMatchingRef {
    #[serde(rename = "ref")]
    full_ref: String,
}

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// GitHub REST client for the Git data endpoints used in note resolution.
pub struct GithubClient {
    http: reqwest::Client,
    config: GithubConfig,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> NotesResult<Self> {
        config
            .validate()
            .map_err(|msg| NotesError::InvalidConfig { message: msg })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn with_default_config() -> NotesResult<Self> {
        Self::new(GithubConfig::default())
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// Shared HTTP client for collaborators that hit non-API endpoints.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.config.api_base, repo.owner, repo.repo, path
        )
    }

    fn status_error(&self, status: StatusCode, rate_remaining: Option<String>, body: String, what: &str) -> NotesError {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        match status.as_u16() {
            401 if self.config.token.is_some() => NotesError::AuthInvalid,
            401 => NotesError::NoToken,
            403 if rate_remaining.as_deref() == Some("0") => NotesError::RateLimited,
            403 => NotesError::AuthInvalid,
            404 => NotesError::not_found(what),
            429 => NotesError::RateLimited,
            code => NotesError::Api {
                status: code,
                message,
            },
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> NotesResult<T> {
        debug!("GET {}", url);

        let mut request = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let rate_remaining = response
                .headers()
                .get(RATE_LIMIT_REMAINING)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, rate_remaining, body, what));
        }

        response.json::<T>().await.map_err(NotesError::Network)
    }

    /// Probes `/user` with the configured token.
    pub async fn check_auth(&self) -> NotesResult<AuthStatus> {
        if self.config.token.is_none() {
            return Ok(AuthStatus::Missing);
        }

        let url = format!("{}/user", self.config.api_base);
        match self.get_json::<ApiUser>(&url, "authenticated user").await {
            Ok(user) => Ok(AuthStatus::Valid { login: user.login }),
            Err(NotesError::AuthInvalid) => Ok(AuthStatus::Invalid),
            Err(e) => Err(e),
        }
    }
}

fn decode_blob(blob: ApiBlob) -> NotesResult<String> {
    match blob.encoding.as_str() {
        "base64" => {
            let packed: String = blob
                .content
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(packed.as_bytes())
                .map_err(|e| NotesError::Api {
                    status: 200,
                    message: format!("Undecodable blob payload: {}", e),
                })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        "utf-8" => Ok(blob.content),
        other => Err(NotesError::Api {
            status: 200,
            message: format!("Unsupported blob encoding: {}", other),
        }),
    }
}

#[async_trait]
impl NoteSource for GithubClient {
    async fn ref_tip(&self, repo: &RepoId, note_ref: &str) -> NotesResult<String> {
        let url = self.repo_url(repo, &format!("git/ref/{}", note_ref));
        let reference: ApiRef = self.get_json(&url, &format!("ref {}", note_ref)).await?;
        Ok(reference.object.sha)
    }

    async fn commit_tree(&self, repo: &RepoId, commit_sha: &str) -> NotesResult<String> {
        let url = self.repo_url(repo, &format!("git/commits/{}", commit_sha));
        let commit: ApiCommit = self
            .get_json(&url, &format!("commit {}", commit_sha))
            .await?;
        Ok(commit.tree.sha)
    }

    async fn tree_entries(&self, repo: &RepoId, tree_sha: &str) -> NotesResult<Vec<TreeEntry>> {
        let url = self.repo_url(repo, &format!("git/trees/{}", tree_sha));
        let tree: ApiTree = self.get_json(&url, &format!("tree {}", tree_sha)).await?;

        if tree.truncated {
            warn!("Tree listing {} was truncated by the API", tree_sha);
        }

        let entries = tree
            .tree
            .into_iter()
            .filter_map(|entry| {
                let kind = match entry.entry_type.as_str() {
                    "blob" => EntryKind::Blob,
                    "tree" => EntryKind::Tree,
                    other => {
                        debug!("Skipping tree entry {} of type {}", entry.path, other);
                        return None;
                    }
                };
                Some(TreeEntry {
                    name: entry.path,
                    kind,
                    sha: entry.sha,
                })
            })
            .collect();

        Ok(entries)
    }

    async fn blob_content(&self, repo: &RepoId, blob_sha: &str) -> NotesResult<String> {
        let url = self.repo_url(repo, &format!("git/blobs/{}", blob_sha));
        let blob: ApiBlob = self.get_json(&url, &format!("blob {}", blob_sha)).await?;
        decode_blob(blob)
    }

    async fn note_refs(&self, repo: &RepoId) -> NotesResult<Vec<String>> {
        let url = self.repo_url(repo, "git/matching-refs/notes/");
        let refs: Vec<ApiMatchingRef> = self.get_json(&url, "note refs").await?;

        Ok(refs
            .into_iter()
            .map(|r| {
                r.full_ref
                    .strip_prefix("refs/")
                    .map(str::to_string)
                    .unwrap_or(r.full_ref)
            })
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "github"
    }
}
