use crate::format::NoteFormat;
use crate::source::{NotesError, NotesResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default notes ref, matching `git notes` without `--ref`.
pub const DEFAULT_NOTES_REF: &str = "notes/commits";

/// Shortest abbreviated SHA accepted for lookup, matching git's minimum.
pub const MIN_SHA_LEN: usize = 4;

pub const FULL_SHA_LEN: usize = 40;

/// Length of the directory prefix in a fanout notes tree.
pub const FANOUT_PREFIX_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoId {
    type Err = NotesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self::new(owner, repo))
            }
            _ => Err(NotesError::InvalidConfig {
                message: format!("Repository must be written as owner/repo, got '{}'", s),
            }),
        }
    }
}

/// A commit SHA as typed by the user: full 40-hex or an abbreviation of at
/// least [`MIN_SHA_LEN`] characters. Normalized to lowercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitSha(String);

impl CommitSha {
    pub fn new(sha: impl Into<String>) -> NotesResult<Self> {
        let sha = sha.into().to_ascii_lowercase();

        if sha.len() < MIN_SHA_LEN || sha.len() > FULL_SHA_LEN {
            return Err(NotesError::InvalidSha { sha });
        }

        if !sha.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(NotesError::InvalidSha { sha });
        }

        Ok(Self(sha))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_full(&self) -> bool {
        self.0.len() == FULL_SHA_LEN
    }

    /// Splits the SHA into its fanout directory name and file name.
    /// Returns `None` when the SHA is too short to name a fanout directory.
    pub fn fanout_parts(&self) -> Option<(&str, &str)> {
        if self.0.len() < FANOUT_PREFIX_LEN {
            return None;
        }
        Some(self.0.split_at(FANOUT_PREFIX_LEN))
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
}

/// One row of a Git tree listing as returned by the trees endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(name: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Blob,
            sha: sha.into(),
        }
    }

    pub fn tree(name: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Tree,
            sha: sha.into(),
        }
    }
}

/// Location of a note blob inside a notes ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNote {
    pub note_ref: String,
    /// Tip commit of the notes ref the lookup ran against.
    pub tip_commit: String,
    /// Path of the note inside the notes tree, e.g. `ab/cdef...`.
    pub path: String,
    pub blob_sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteContent {
    pub raw: String,
    pub format: NoteFormat,
    pub html: String,
}

/// Outcome of looking up one notes ref for one commit. A ref with no note
/// for the commit carries `content: null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteResult {
    pub note_ref: String,
    pub content: Option<NoteContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AuthStatus {
    Valid { login: String },
    Invalid,
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_parse() {
        let repo: RepoId = "octocat/hello-world".parse().unwrap();
        assert_eq!(repo.owner, "octocat");
        assert_eq!(repo.repo, "hello-world");
        assert_eq!(repo.to_string(), "octocat/hello-world");
    }

    #[test]
    fn test_repo_id_parse_rejects_malformed() {
        assert!("octocat".parse::<RepoId>().is_err());
        assert!("/repo".parse::<RepoId>().is_err());
        assert!("owner/".parse::<RepoId>().is_err());
        assert!("a/b/c".parse::<RepoId>().is_err());
    }

    #[test]
    fn test_commit_sha_full() {
        let sha = CommitSha::new("a".repeat(40)).unwrap();
        assert!(sha.is_full());
        assert_eq!(sha.as_str().len(), 40);
    }

    #[test]
    fn test_commit_sha_normalizes_case() {
        let sha = CommitSha::new("ABCDEF123456").unwrap();
        assert_eq!(sha.as_str(), "abcdef123456");
        assert!(!sha.is_full());
    }

    #[test]
    fn test_commit_sha_rejects_invalid() {
        assert!(CommitSha::new("abc").is_err());
        assert!(CommitSha::new("a".repeat(41)).is_err());
        assert!(CommitSha::new("xyzw1234").is_err());
        assert!(CommitSha::new("").is_err());
    }

    #[test]
    fn test_fanout_parts_round_trip() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        let sha = CommitSha::new(hex).unwrap();
        let (prefix, suffix) = sha.fanout_parts().unwrap();
        assert_eq!(prefix.len(), 2);
        assert_eq!(suffix.len(), 38);
        assert_eq!(format!("{}{}", prefix, suffix), hex);
    }

    #[test]
    fn test_tree_entry_kind_wire_names() {
        let entry = TreeEntry::blob("abc", "def");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"blob\""));

        let dir = TreeEntry::tree("ab", "123");
        let json = serde_json::to_string(&dir).unwrap();
        assert!(json.contains("\"tree\""));
    }
}
