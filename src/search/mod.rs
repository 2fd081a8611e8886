//! # Relevance Index
//!
//! Lexical ranking of short documents (bundle descriptions plus tags)
//! against a natural-language query. [`Bm25Index`] is the built-in
//! implementation; the selection engine accepts any [`RelevanceIndex`].

pub mod bm25;
pub mod tokenizer;

pub use bm25::{Bm25Index, Bm25Params};
pub use tokenizer::{term_frequencies, tokenize};

/// A document id and its relevance score for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub score: f64,
}

/// Keyword lookup over bundles or capabilities.
///
/// None of the operations fail under normal use; implementations must be
/// safe to share between threads.
pub trait RelevanceIndex: Send + Sync {
    /// Add or replace the document `id`, indexing `text` followed by `tags`.
    fn index(&self, id: &str, text: &str, tags: &[String]);

    /// Remove a document. Unknown ids are ignored.
    fn remove(&self, id: &str);

    /// Up to `k` documents sharing at least one term with `query`, best
    /// first. Equal scores are ordered by id.
    fn search(&self, query: &str, k: usize) -> Vec<SearchResult>;

    /// Recompute corpus statistics from the retained documents.
    fn rebuild(&self);

    /// Drop every document.
    fn clear(&self);
}
