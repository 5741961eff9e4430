//! # RagRelay Knowledge
//!
//! Keyword retrieval over one static knowledge file. No vector DB, no
//! embeddings, nothing persisted.
//!
//! ## How it works
//! ```text
//! User: "Where can I get coffee?"
//!   ↓
//! KnowledgeStore.load()          (re-read per request unless cached)
//!   ↓
//! chunker::split_passages        (blank-line delimited blocks)
//!   ↓
//! search::score_passage          (category table + word overlap + FAQ boost)
//!   ↓
//! search::select_context         (top 4, else first 3 as overview)
//!   ↓
//! Injected into the system prompt by the relay
//! ```

pub mod chunker;
pub mod keywords;
pub mod search;
pub mod store;

pub use chunker::Passage;
pub use search::{ScoredPassage, Selection, retrieve};
pub use store::{KnowledgeStatus, KnowledgeStore};
