use crate::cache::{fanout_key, ref_key, CachedTree, TreeCache};
use crate::source::{NoteSource, NotesResult};
use crate::types::{CommitSha, EntryKind, RepoId, ResolvedNote, TreeEntry, FULL_SHA_LEN};
use std::sync::Arc;
use tracing::{debug, warn};

enum EntryMatch<'a> {
    Hit(&'a TreeEntry),
    Ambiguous,
    Miss,
}

/// Finds the blob entry named by `wanted`. A full-length name must match
/// exactly; anything shorter is treated as an abbreviation and must
/// prefix-match exactly one blob.
fn match_blob<'a>(entries: &'a [TreeEntry], wanted: &str, full_len: usize) -> EntryMatch<'a> {
    if wanted.len() >= full_len {
        return match entries
            .iter()
            .find(|e| e.kind == EntryKind::Blob && e.name == wanted)
        {
            Some(entry) => EntryMatch::Hit(entry),
            None => EntryMatch::Miss,
        };
    }

    let mut candidates = entries
        .iter()
        .filter(|e| e.kind == EntryKind::Blob && e.name.starts_with(wanted));
    match (candidates.next(), candidates.next()) {
        (Some(entry), None) => EntryMatch::Hit(entry),
        (Some(_), Some(_)) => EntryMatch::Ambiguous,
        (None, _) => EntryMatch::Miss,
    }
}

/// Maps commits to note blobs inside a notes ref, reading trees through an
/// injected TTL cache.
pub struct NoteResolver {
    source: Arc<dyn NoteSource>,
    cache: TreeCache,
}

impl NoteResolver {
    pub fn new(source: Arc<dyn NoteSource>, cache: TreeCache) -> Self {
        Self { source, cache }
    }

    pub fn cache_mut(&mut self) -> &mut TreeCache {
        &mut self.cache
    }

    async fn root_tree(&mut self, repo: &RepoId, note_ref: &str) -> NotesResult<CachedTree> {
        let key = ref_key(&repo.owner, &repo.repo, note_ref);
        if let Some(tree) = self.cache.get(&key) {
            debug!("Tree cache hit for {}", key);
            return Ok(tree.clone());
        }

        let tip = self.source.ref_tip(repo, note_ref).await?;
        let tree_sha = self.source.commit_tree(repo, &tip).await?;
        let entries = self.source.tree_entries(repo, &tree_sha).await?;

        let tree = CachedTree {
            tip_commit: tip,
            entries,
        };
        self.cache.insert(key, tree.clone());
        Ok(tree)
    }

    async fn fanout_tree(
        &mut self,
        repo: &RepoId,
        note_ref: &str,
        tip_commit: &str,
        dir: &TreeEntry,
    ) -> NotesResult<CachedTree> {
        let key = fanout_key(&repo.owner, &repo.repo, note_ref, &dir.name);
        if let Some(tree) = self.cache.get(&key) {
            debug!("Tree cache hit for {}", key);
            return Ok(tree.clone());
        }

        let entries = self.source.tree_entries(repo, &dir.sha).await?;
        let tree = CachedTree {
            tip_commit: tip_commit.to_string(),
            entries,
        };
        self.cache.insert(key, tree.clone());
        Ok(tree)
    }

    /// Locates the note blob for a commit: direct entry first, then the
    /// 2-char fanout directory. `Ok(None)` means the ref has no note for
    /// this commit (including ambiguous abbreviations).
    pub async fn resolve(
        &mut self,
        repo: &RepoId,
        note_ref: &str,
        commit: &CommitSha,
    ) -> NotesResult<Option<ResolvedNote>> {
        let root = self.root_tree(repo, note_ref).await?;

        match match_blob(&root.entries, commit.as_str(), FULL_SHA_LEN) {
            EntryMatch::Hit(entry) => {
                return Ok(Some(ResolvedNote {
                    note_ref: note_ref.to_string(),
                    tip_commit: root.tip_commit,
                    path: entry.name.clone(),
                    blob_sha: entry.sha.clone(),
                }));
            }
            EntryMatch::Ambiguous => {
                warn!(
                    "Abbreviated sha {} matches several notes in {}, skipping",
                    commit, note_ref
                );
                return Ok(None);
            }
            EntryMatch::Miss => {}
        }

        let Some((prefix, rest)) = commit.fanout_parts() else {
            return Ok(None);
        };
        let Some(dir) = root
            .entries
            .iter()
            .find(|e| e.kind == EntryKind::Tree && e.name == prefix)
        else {
            return Ok(None);
        };

        let dir = dir.clone();
        let sub = self
            .fanout_tree(repo, note_ref, &root.tip_commit, &dir)
            .await?;

        match match_blob(&sub.entries, rest, FULL_SHA_LEN - prefix.len()) {
            EntryMatch::Hit(entry) => Ok(Some(ResolvedNote {
                note_ref: note_ref.to_string(),
                tip_commit: sub.tip_commit,
                path: format!("{}/{}", prefix, entry.name),
                blob_sha: entry.sha.clone(),
            })),
            EntryMatch::Ambiguous => {
                warn!(
                    "Abbreviated sha {} matches several notes in {}/{}, skipping",
                    commit, note_ref, prefix
                );
                Ok(None)
            }
            EntryMatch::Miss => Ok(None),
        }
    }
}
