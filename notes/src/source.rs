use crate::types::{RepoId, TreeEntry};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No access token configured")]
    NoToken,

    #[error("Authentication failed")]
    AuthInvalid,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Invalid commit sha: {sha}")]
    InvalidSha { sha: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl NotesError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Whether the user should be pointed at their token settings.
    pub fn settings_hint(&self) -> bool {
        matches!(
            self,
            Self::NoToken | Self::AuthInvalid | Self::Api { status: 403, .. }
        )
    }
}

pub type NotesResult<T> = Result<T, NotesError>;

/// Read access to the Git object store of a hosted repository. The seam
/// between the resolution logic and the GitHub REST client.
#[async_trait]
pub trait NoteSource: Send + Sync {
    /// SHA of the commit a ref currently points at.
    async fn ref_tip(&self, repo: &RepoId, note_ref: &str) -> NotesResult<String>;

    /// SHA of the root tree of a commit.
    async fn commit_tree(&self, repo: &RepoId, commit_sha: &str) -> NotesResult<String>;

    async fn tree_entries(&self, repo: &RepoId, tree_sha: &str) -> NotesResult<Vec<TreeEntry>>;

    /// Decoded text content of a blob. Requires credentials on private repos.
    async fn blob_content(&self, repo: &RepoId, blob_sha: &str) -> NotesResult<String>;

    /// Note refs advertised by the repository, without the `refs/` prefix.
    async fn note_refs(&self, repo: &RepoId) -> NotesResult<Vec<String>>;

    fn source_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TreeEntry;

    struct MockSource;

    #[async_trait]
    impl NoteSource for MockSource {
        async fn ref_tip(&self, _repo: &RepoId, note_ref: &str) -> NotesResult<String> {
            if note_ref == "notes/commits" {
                Ok("1111111111111111111111111111111111111111".to_string())
            } else {
                Err(NotesError::not_found(format!("ref {}", note_ref)))
            }
        }

        async fn commit_tree(&self, _repo: &RepoId, _commit_sha: &str) -> NotesResult<String> {
            Ok("2222222222222222222222222222222222222222".to_string())
        }

        async fn tree_entries(
            &self,
            _repo: &RepoId,
            _tree_sha: &str,
        ) -> NotesResult<Vec<TreeEntry>> {
            Ok(vec![TreeEntry::blob(
                "0123456789abcdef0123456789abcdef01234567",
                "3333333333333333333333333333333333333333",
            )])
        }

        async fn blob_content(&self, _repo: &RepoId, _blob_sha: &str) -> NotesResult<String> {
            Ok("note body".to_string())
        }

        async fn note_refs(&self, _repo: &RepoId) -> NotesResult<Vec<String>> {
            Ok(vec!["notes/commits".to_string()])
        }

        fn source_name(&self) -> &'static str {
            "mock"
        }
    }

    #[tokio::test]
    async fn test_mock_source() {
        let source = MockSource;
        let repo = RepoId::new("octocat", "hello-world");

        let tip = source.ref_tip(&repo, "notes/commits").await.unwrap();
        assert_eq!(tip.len(), 40);

        let tree = source.commit_tree(&repo, &tip).await.unwrap();
        let entries = source.tree_entries(&repo, &tree).await.unwrap();
        assert_eq!(entries.len(), 1);

        let missing = source.ref_tip(&repo, "notes/reviews").await;
        assert!(matches!(missing, Err(NotesError::NotFound { .. })));

        assert_eq!(source.source_name(), "mock");
    }

    #[test]
    fn test_settings_hint() {
        assert!(NotesError::NoToken.settings_hint());
        assert!(NotesError::AuthInvalid.settings_hint());
        assert!(NotesError::Api {
            status: 403,
            message: "Resource not accessible by integration".to_string(),
        }
        .settings_hint());
        assert!(!NotesError::RateLimited.settings_hint());
        assert!(!NotesError::not_found("ref").settings_hint());
    }
}
