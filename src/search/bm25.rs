//! BM25 keyword index.
//!
//! Each document keeps only its term-frequency table and token count, which
//! is enough to recompute corpus statistics without the original text.
//! Statistics are recomputed in full on every mutation; this is linear in
//! the corpus size and meant for catalogs of tens to hundreds of bundles.

use std::cmp::Ordering;
use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::tokenizer::{term_frequencies, tokenize};
use super::{RelevanceIndex, SearchResult};
use crate::config::SelectionConfig;

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation
    #[serde(default = "default_k1")]
    pub k1: f64,

    /// Document-length normalisation
    #[serde(default = "default_b")]
    pub b: f64,
}

fn default_k1() -> f64 {
    1.2
}

fn default_b() -> f64 {
    0.75
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
        }
    }
}

#[derive(Debug, Clone)]
struct Bm25Document {
    term_freqs: HashMap<String, u32>,
    length: usize,
}

#[derive(Debug, Default)]
struct Corpus {
    docs: HashMap<String, Bm25Document>,
    // term -> number of documents containing it
    doc_freqs: HashMap<String, usize>,
    avg_len: f64,
}

impl Corpus {
    fn add_doc_freqs(&mut self, doc: &Bm25Document) {
        for term in doc.term_freqs.keys() {
            *self.doc_freqs.entry(term.clone()).or_insert(0) += 1;
        }
    }

    fn subtract_doc_freqs(&mut self, doc: &Bm25Document) {
        for term in doc.term_freqs.keys() {
            if let Some(df) = self.doc_freqs.get_mut(term) {
                *df = df.saturating_sub(1);
                if *df == 0 {
                    self.doc_freqs.remove(term);
                }
            }
        }
    }

    fn recompute_avg_len(&mut self) {
        if self.docs.is_empty() {
            self.avg_len = 0.0;
            return;
        }
        let total: usize = self.docs.values().map(|doc| doc.length).sum();
        self.avg_len = total as f64 / self.docs.len() as f64;
    }
}

/// Thread-safe BM25 index.
///
/// Mutations take the write lock; searches share the read lock.
#[derive(Debug, Default)]
pub struct Bm25Index {
    params: Bm25Params,
    corpus: RwLock<Corpus>,
}

impl Bm25Index {
    /// Index with the standard parameters (k1 = 1.2, b = 0.75).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: Bm25Params) -> Self {
        Self {
            params,
            corpus: RwLock::new(Corpus::default()),
        }
    }

    /// Index tuned by the `bm25` block of a selection config.
    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::with_params(config.bm25)
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.corpus.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.corpus.read().docs.contains_key(id)
    }

    /// Number of documents containing `term` (already tokenized).
    pub fn document_frequency(&self, term: &str) -> usize {
        self.corpus.read().doc_freqs.get(term).copied().unwrap_or(0)
    }

    /// Mean token count across the corpus.
    pub fn average_length(&self) -> f64 {
        self.corpus.read().avg_len
    }

    fn idf(&self, corpus_size: f64, doc_freq: f64) -> f64 {
        ((corpus_size - doc_freq + 0.5) / (doc_freq + 0.5) + 1.0).ln()
    }

    fn saturation(&self, tf: f64, length: f64, avg_len: f64) -> f64 {
        let Bm25Params { k1, b } = self.params;
        let norm = if avg_len > 0.0 { length / avg_len } else { 0.0 };
        tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * norm))
    }
}

impl RelevanceIndex for Bm25Index {
    fn index(&self, id: &str, text: &str, tags: &[String]) {
        let mut combined = text.to_string();
        if !tags.is_empty() {
            combined.push(' ');
            combined.push_str(&tags.join(" "));
        }
        let tokens = tokenize(&combined);
        let doc = Bm25Document {
            term_freqs: term_frequencies(&tokens),
            length: tokens.len(),
        };

        let mut corpus = self.corpus.write();
        if let Some(old) = corpus.docs.remove(id) {
            corpus.subtract_doc_freqs(&old);
        }
        corpus.add_doc_freqs(&doc);
        corpus.docs.insert(id.to_string(), doc);
        corpus.recompute_avg_len();
    }

    fn remove(&self, id: &str) {
        let mut corpus = self.corpus.write();
        if let Some(old) = corpus.docs.remove(id) {
            corpus.subtract_doc_freqs(&old);
            corpus.recompute_avg_len();
        }
    }

    fn search(&self, query: &str, k: usize) -> Vec<SearchResult> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || k == 0 {
            return Vec::new();
        }

        let corpus = self.corpus.read();
        if corpus.docs.is_empty() {
            return Vec::new();
        }
        let n = corpus.docs.len() as f64;

        let mut results: Vec<SearchResult> = corpus
            .docs
            .iter()
            .filter_map(|(id, doc)| {
                let mut score = 0.0;
                let mut matched = false;
                for term in &query_tokens {
                    let Some(&tf) = doc.term_freqs.get(term) else {
                        continue;
                    };
                    matched = true;
                    let df = corpus.doc_freqs.get(term).copied().unwrap_or(0) as f64;
                    score += self.idf(n, df)
                        * self.saturation(tf as f64, doc.length as f64, corpus.avg_len);
                }
                matched.then(|| SearchResult {
                    id: id.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(k);
        results
    }

    fn rebuild(&self) {
        let mut corpus = self.corpus.write();
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        for doc in corpus.docs.values() {
            for term in doc.term_freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
        }
        corpus.doc_freqs = doc_freqs;
        corpus.recompute_avg_len();
    }

    fn clear(&self) {
        *self.corpus.write() = Corpus::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_search_ranks_relevant_document_first() {
        let index = Bm25Index::new();
        index.index("web", "search web pages", &["web".to_string()]);
        index.index("math", "perform calculations", &["math".to_string()]);

        let results = index.search("search the web", 10);
        assert_eq!(ids(&results), vec!["web"]);
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn test_higher_term_frequency_scores_higher() {
        let index = Bm25Index::new();
        index.index("twice", "alpha alpha beta", &[]);
        index.index("once", "alpha beta gamma", &[]);

        let results = index.search("alpha", 10);
        assert_eq!(ids(&results), vec!["twice", "once"]);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_score_matches_formula() {
        let index = Bm25Index::new();
        index.index("a", "rust rust code", &[]);
        index.index("b", "python code", &[]);

        // N = 2, df(rust) = 1, tf = 2, len = 3, avg_len = 2.5
        let idf = ((2.0 - 1.0 + 0.5) / (1.0 + 0.5) + 1.0f64).ln();
        let sat = 2.0 * 2.2 / (2.0 + 1.2 * (1.0 - 0.75 + 0.75 * 3.0 / 2.5));
        let results = index.search("rust", 1);
        assert_eq!(results.len(), 1);
        assert!((results[0].score - idf * sat).abs() < 1e-12);
    }

    #[test]
    fn test_documents_without_shared_terms_are_excluded() {
        let index = Bm25Index::new();
        index.index("a", "one two", &[]);
        index.index("b", "three four", &[]);
        assert_eq!(ids(&index.search("two", 10)), vec!["a"]);
        assert!(index.search("five", 10).is_empty());
    }

    #[test]
    fn test_empty_query_or_zero_k_returns_nothing() {
        let index = Bm25Index::new();
        index.index("a", "content", &[]);
        assert!(index.search("", 5).is_empty());
        assert!(index.search(" ?! ", 5).is_empty());
        assert!(index.search("content", 0).is_empty());
    }

    #[test]
    fn test_search_respects_k() {
        let index = Bm25Index::new();
        for i in 0..5 {
            index.index(&format!("doc{}", i), "shared term", &[]);
        }
        assert_eq!(index.search("shared", 3).len(), 3);
    }

    #[test]
    fn test_equal_scores_are_ordered_by_id() {
        let index = Bm25Index::new();
        for id in ["charlie", "alpha", "bravo"] {
            index.index(id, "same words here", &[]);
        }
        assert_eq!(
            ids(&index.search("words", 10)),
            vec!["alpha", "bravo", "charlie"]
        );
    }

    #[test]
    fn test_remove_drops_unique_terms() {
        let index = Bm25Index::new();
        index.index("a", "unique shared", &[]);
        index.index("b", "shared other", &[]);

        index.remove("a");

        assert!(index.search("unique", 10).is_empty());
        assert_eq!(ids(&index.search("shared", 10)), vec!["b"]);
        assert_eq!(index.document_frequency("unique"), 0);
        assert_eq!(index.document_frequency("shared"), 1);
        assert_eq!(index.len(), 1);
        assert!((index.average_length() - 2.0).abs() < f64::EPSILON);

        index.remove("a");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_reindex_replaces_previous_terms() {
        let index = Bm25Index::new();
        index.index("doc", "old words", &[]);
        index.index("doc", "new text entirely", &["tagged".to_string()]);

        assert!(index.search("old", 10).is_empty());
        assert_eq!(ids(&index.search("tagged", 10)), vec!["doc"]);
        assert_eq!(index.document_frequency("words"), 0);
        assert_eq!(index.document_frequency("new"), 1);
        assert_eq!(index.len(), 1);
        assert!((index.average_length() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rebuild_preserves_statistics() {
        let index = Bm25Index::new();
        index.index("a", "red green", &[]);
        index.index("b", "green blue blue", &[]);
        let before = index.search("green blue", 10);

        index.rebuild();

        assert_eq!(index.document_frequency("green"), 2);
        assert_eq!(index.document_frequency("blue"), 1);
        assert!((index.average_length() - 2.5).abs() < f64::EPSILON);
        assert_eq!(index.search("green blue", 10), before);
    }

    #[test]
    fn test_params_from_config_change_scores() {
        let tuned = SelectionConfig::from_yaml_str("bm25:\n  k1: 0.0\n  b: 0.0\n").unwrap();
        let default = Bm25Index::from_config(&SelectionConfig::default());
        let flat = Bm25Index::from_config(&tuned);
        assert_eq!(flat.params(), Bm25Params { k1: 0.0, b: 0.0 });

        for index in [&default, &flat] {
            index.index("a", "alpha alpha beta", &[]);
            index.index("b", "gamma", &[]);
        }

        // k1 = 0 flattens term frequency to 1, leaving only idf
        let idf = 2.0f64.ln();
        let flat_score = flat.search("alpha", 1)[0].score;
        let default_score = default.search("alpha", 1)[0].score;
        assert!((flat_score - idf).abs() < 1e-12);
        assert!(default_score > flat_score);
    }

    #[test]
    fn test_clear_drops_everything() {
        let index = Bm25Index::new();
        index.index("a", "some words", &[]);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.document_frequency("words"), 0);
        assert_eq!(index.average_length(), 0.0);
        assert!(index.search("words", 5).is_empty());
    }

    #[test]
    fn test_concurrent_search_and_index() {
        let index = Bm25Index::new();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..100 {
                    index.index(&format!("doc{}", i), "parallel content", &[]);
                }
            });
            for _ in 0..3 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        for result in index.search("parallel", 5) {
                            assert!(result.score > 0.0);
                        }
                    }
                });
            }
        });
        assert_eq!(index.len(), 100);
    }
}
