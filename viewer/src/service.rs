use notes::{
    AuthStatus, CommitSha, ContentFetcher, GithubClient, NoteContent, NoteRenderer, NoteResolver,
    NoteResult, NoteSource, NotesError, NotesResult, RepoId, TreeCache, DEFAULT_NOTES_REF,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Messages accepted by the service, mirroring the surface the popup and
/// content pages exchange with the background worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    FetchNote {
        owner: String,
        repo: String,
        commit: String,
        #[serde(default)]
        refs: Vec<String>,
    },
    CheckAuth,
    ClearCache,
    GetRefs {
        owner: String,
        repo: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Notes {
        notes: Vec<NoteResult>,
    },
    Auth {
        auth: AuthStatus,
    },
    CacheCleared {
        evicted: usize,
    },
    Refs {
        refs: Vec<String>,
    },
    Error {
        kind: String,
        message: String,
        settings_hint: bool,
    },
}

fn error_kind(error: &NotesError) -> &'static str {
    match error {
        NotesError::Network(_) => "network",
        NotesError::Serialization(_) => "serialization",
        NotesError::NoToken => "no_token",
        NotesError::AuthInvalid => "auth_invalid",
        NotesError::RateLimited => "rate_limited",
        NotesError::NotFound { .. } => "not_found",
        NotesError::InvalidSha { .. } => "invalid_sha",
        NotesError::InvalidConfig { .. } => "invalid_config",
        NotesError::Api { .. } => "api_error",
    }
}

/// Request dispatcher owning the resolver, its tree cache, and the fetch
/// chain. Every request gets a response; failures become `Response::Error`.
pub struct Service {
    client: Arc<GithubClient>,
    resolver: Mutex<NoteResolver>,
    fetcher: ContentFetcher,
    renderer: NoteRenderer<'static>,
    extra_refs: Vec<String>,
}

impl Service {
    pub fn new(client: Arc<GithubClient>, extra_refs: Vec<String>) -> Self {
        let cache = TreeCache::new(client.config().tree_ttl);
        let resolver = NoteResolver::new(client.clone() as Arc<dyn NoteSource>, cache);
        let fetcher = ContentFetcher::for_client(client.clone());

        Self {
            client,
            resolver: Mutex::new(resolver),
            fetcher,
            renderer: NoteRenderer::new(),
            extra_refs,
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        debug!("Handling {:?}", request);

        let result = match request {
            Request::FetchNote {
                owner,
                repo,
                commit,
                refs,
            } => self.fetch_note(&RepoId::new(owner, repo), &commit, refs).await,
            Request::CheckAuth => self.check_auth().await,
            Request::ClearCache => self.clear_cache().await,
            Request::GetRefs { owner, repo } => self.get_refs(&RepoId::new(owner, repo)).await,
        };

        result.unwrap_or_else(|error| {
            warn!("Request failed: {}", error);
            Response::Error {
                kind: error_kind(&error).to_string(),
                message: error.to_string(),
                settings_hint: error.settings_hint(),
            }
        })
    }

    fn requested_refs(&self, refs: Vec<String>) -> Vec<String> {
        let candidates = if refs.is_empty() {
            let mut defaults = vec![DEFAULT_NOTES_REF.to_string()];
            defaults.extend(self.extra_refs.iter().cloned());
            defaults
        } else {
            refs
        };

        let mut deduped: Vec<String> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !deduped.contains(&candidate) {
                deduped.push(candidate);
            }
        }
        deduped
    }

    async fn fetch_note(
        &self,
        repo: &RepoId,
        commit: &str,
        refs: Vec<String>,
    ) -> NotesResult<Response> {
        let commit = CommitSha::new(commit)?;
        let mut notes = Vec::new();

        for note_ref in self.requested_refs(refs) {
            let resolved = {
                let mut resolver = self.resolver.lock().await;
                resolver.resolve(repo, &note_ref, &commit).await
            };

            let content = match resolved {
                Ok(Some(note)) => match self.fetcher.fetch(repo, &note).await {
                    Ok(raw) => Some(self.renderer.render(&raw)),
                    Err(NotesError::NotFound { .. }) => None,
                    Err(e) => return Err(e),
                },
                Ok(None) => None,
                // A repository without the ref simply has no note here.
                Err(NotesError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            };

            notes.push(NoteResult { note_ref, content });
        }

        Ok(Response::Notes { notes })
    }

    async fn check_auth(&self) -> NotesResult<Response> {
        let auth = self.client.check_auth().await?;
        Ok(Response::Auth { auth })
    }

    async fn clear_cache(&self) -> NotesResult<Response> {
        let mut resolver = self.resolver.lock().await;
        let evicted = resolver.cache_mut().clear();
        Ok(Response::CacheCleared { evicted })
    }

    async fn get_refs(&self, repo: &RepoId) -> NotesResult<Response> {
        let mut refs = self.client.note_refs(repo).await?;
        refs.extend(self.extra_refs.iter().cloned());
        refs.sort();
        refs.dedup();
        Ok(Response::Refs { refs })
    }
}

/// Renders a response for human eyes; the `--json` path bypasses this.
pub fn describe_content(result: &NoteResult) -> String {
    match &result.content {
        Some(NoteContent { format, html, .. }) => {
            format!("== {} [{}]\n{}", result.note_ref, format, html)
        }
        None => format!("== {} [no note]", result.note_ref),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notes::GithubConfig;

    fn service_for(server: &mockito::Server) -> Service {
        let config = GithubConfig::default()
            .with_api_base(server.url())
            .with_raw_base(server.url())
            .with_web_base(server.url());
        let client = Arc::new(GithubClient::new(config).unwrap());
        Service::new(client, vec![])
    }

    #[tokio::test]
    async fn test_request_wire_format() {
        let json = r#"{"type":"fetch_note","owner":"o","repo":"r","commit":"abcd1234"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            request,
            Request::FetchNote { ref owner, ref refs, .. } if owner == "o" && refs.is_empty()
        ));

        let json = r#"{"type":"clear_cache"}"#;
        assert!(matches!(
            serde_json::from_str::<Request>(json).unwrap(),
            Request::ClearCache
        ));
    }

    #[tokio::test]
    async fn test_clear_cache_on_empty_service() {
        let server = mockito::Server::new_async().await;
        let service = service_for(&server);

        match service.handle(Request::ClearCache).await {
            Response::CacheCleared { evicted } => assert_eq!(evicted, 0),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_sha_becomes_error_response() {
        let server = mockito::Server::new_async().await;
        let service = service_for(&server);

        let response = service
            .handle(Request::FetchNote {
                owner: "o".to_string(),
                repo: "r".to_string(),
                commit: "zz".to_string(),
                refs: vec![],
            })
            .await;

        match response {
            Response::Error {
                kind,
                settings_hint,
                ..
            } => {
                assert_eq!(kind, "invalid_sha");
                assert!(!settings_hint);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_ref_is_silently_skipped() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/o/r/git/ref/notes/commits")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let service = service_for(&server);
        let response = service
            .handle(Request::FetchNote {
                owner: "o".to_string(),
                repo: "r".to_string(),
                commit: "abcd1234".to_string(),
                refs: vec![],
            })
            .await;

        match response {
            Response::Notes { notes } => {
                assert_eq!(notes.len(), 1);
                assert_eq!(notes[0].note_ref, DEFAULT_NOTES_REF);
                assert!(notes[0].content.is_none());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_refs_merges_extras() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/o/r/git/matching-refs/notes/")
            .with_status(200)
            .with_body(r#"[{"ref":"refs/notes/commits","object":{"sha":"a","type":"commit"}}]"#)
            .create_async()
            .await;

        let config = GithubConfig::default().with_api_base(server.url());
        let client = Arc::new(GithubClient::new(config).unwrap());
        let service = Service::new(
            client,
            vec!["notes/reviews".to_string(), "notes/commits".to_string()],
        );

        match service
            .handle(Request::GetRefs {
                owner: "o".to_string(),
                repo: "r".to_string(),
            })
            .await
        {
            Response::Refs { refs } => {
                assert_eq!(refs, vec!["notes/commits", "notes/reviews"]);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_check_auth_without_token() {
        let server = mockito::Server::new_async().await;
        let service = service_for(&server);

        match service.handle(Request::CheckAuth).await {
            Response::Auth { auth } => assert_eq!(auth, AuthStatus::Missing),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_describe_content() {
        let with_note = NoteResult {
            note_ref: "notes/commits".to_string(),
            content: Some(NoteContent {
                raw: "hi".to_string(),
                format: notes::NoteFormat::Plain,
                html: "<pre class=\"note-plain\">hi</pre>".to_string(),
            }),
        };
        let text = describe_content(&with_note);
        assert!(text.contains("notes/commits [plain]"));
        assert!(text.contains("<pre"));

        let without = NoteResult {
            note_ref: "notes/reviews".to_string(),
            content: None,
        };
        assert_eq!(describe_content(&without), "== notes/reviews [no note]");
    }
}
