use crate::config::DEFAULT_TREE_TTL;
use crate::types::TreeEntry;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A cached tree listing together with the notes tip commit it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTree {
    pub tip_commit: String,
    pub entries: Vec<TreeEntry>,
}

/// Time-boxed map of ref and fanout tree listings. Owned by whoever drives
/// resolution and passed in explicitly; eviction only happens through
/// [`TreeCache::purge_expired`] and [`TreeCache::clear`].
#[derive(Debug)]
pub struct TreeCache {
    ttl: Duration,
    map: HashMap<String, (Instant, CachedTree)>,
}

impl TreeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            map: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CachedTree> {
        let (inserted, tree) = self.map.get(key)?;
        if inserted.elapsed() > self.ttl {
            return None;
        }
        Some(tree)
    }

    pub fn insert(&mut self, key: impl Into<String>, tree: CachedTree) {
        self.map.insert(key.into(), (Instant::now(), tree));
    }

    /// Drops everything, returning how many entries were evicted.
    pub fn clear(&mut self) -> usize {
        let evicted = self.map.len();
        self.map.clear();
        evicted
    }

    pub fn purge_expired(&mut self) {
        let ttl = self.ttl;
        self.map.retain(|_, (inserted, _)| inserted.elapsed() <= ttl);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for TreeCache {
    fn default() -> Self {
        Self::new(DEFAULT_TREE_TTL)
    }
}

/// Cache key for the root tree of a notes ref.
pub fn ref_key(owner: &str, repo: &str, note_ref: &str) -> String {
    format!("{}/{}:{}", owner, repo, note_ref)
}

/// Cache key for a fanout subtree under a notes ref.
pub fn fanout_key(owner: &str, repo: &str, note_ref: &str, prefix: &str) -> String {
    format!("{}/{}:{}:{}", owner, repo, note_ref, prefix)
}
