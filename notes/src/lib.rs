pub mod cache;
pub mod config;
pub mod fetch;
pub mod format;
pub mod github;
pub mod render;
pub mod resolver;
pub mod sanitize;
pub mod source;
pub mod types;

pub use cache::{fanout_key, ref_key, CachedTree, TreeCache};
pub use config::{GithubConfig, DEFAULT_TREE_TTL};
pub use fetch::{
    ContentFetcher, ContentStrategy, MissReason, PublicRawStrategy, StrategyOutcome,
    TokenBlobStrategy, WebSessionStrategy,
};
pub use format::{detect, NoteFormat};
pub use github::GithubClient;
pub use render::NoteRenderer;
pub use resolver::NoteResolver;
pub use sanitize::{escape_html, sanitize};
pub use source::{NoteSource, NotesError, NotesResult};
pub use types::{
    AuthStatus, CommitSha, EntryKind, NoteContent, NoteResult, RepoId, ResolvedNote, TreeEntry,
    DEFAULT_NOTES_REF,
};

pub mod prelude {
    pub use crate::cache::*;
    pub use crate::config::*;
    pub use crate::fetch::*;
    pub use crate::format::*;
    pub use crate::github::*;
    pub use crate::render::*;
    pub use crate::resolver::*;
    pub use crate::sanitize::*;
    pub use crate::source::*;
    pub use crate::types::*;
}
