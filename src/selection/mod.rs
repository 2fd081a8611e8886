//! # Tool Selection
//!
//! Narrows the capability catalog to the tools relevant to one query.
//!
//! ## Pipeline
//!
//! 1. Ask the relevance index for `candidate_fan_out` bundles
//! 2. Expand each candidate breadth-first through its dependencies; a
//!    capability first reached at hop `d` from a candidate with score `S`
//!    scores `S * dependency_decay^d`
//! 3. Keep the best score per capability across every path and candidate
//! 4. Order by score (then name) and keep the top `max_tools`
//!
//! When narrowing is impossible (no index, blank query, no hits, store
//! failure) the selector fails open and returns the whole catalog. It never
//! returns an error.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::capabilities::{Bundle, CapabilityDef, StoredCapability};
use crate::config::SelectionConfig;
use crate::search::{RelevanceIndex, SearchResult};
use crate::store::{Snapshot, Store, StoreError, INDEX_SOURCE};

/// A selected capability with the score that placed it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCapability {
    pub definition: CapabilityDef,
    /// Zero for fail-open results
    pub score: f64,
}

/// Query-driven capability selection over a store and an optional index.
#[derive(Clone)]
pub struct ToolSelector {
    store: Arc<Store>,
    index: Option<Arc<dyn RelevanceIndex>>,
    config: SelectionConfig,
}

impl std::fmt::Debug for ToolSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSelector")
            .field("store", &self.store)
            .field("indexed", &self.index.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl ToolSelector {
    /// Selector without an index; every query fails open.
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            index: None,
            config: SelectionConfig::default(),
        }
    }

    pub fn with_index(mut self, index: Arc<dyn RelevanceIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_config(mut self, config: SelectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Descriptors of the capabilities relevant to `query`, best first.
    pub fn select_tools(&self, query: &str) -> Vec<CapabilityDef> {
        self.rank_tools(query)
            .into_iter()
            .map(|scored| scored.definition)
            .collect()
    }

    /// Like [`ToolSelector::select_tools`] but keeps the scores.
    pub fn rank_tools(&self, query: &str) -> Vec<ScoredCapability> {
        let snapshot = self.store.snapshot();

        let Some(candidates) = self.candidates(query, self.config.candidate_fan_out) else {
            return full_catalog(&snapshot);
        };
        if candidates.is_empty() {
            log::debug!("no bundles matched '{}', returning full catalog", query);
            return full_catalog(&snapshot);
        }

        let mut best: HashMap<String, ScoredCapability> = HashMap::new();
        for candidate in &candidates {
            if let Err(e) = self.expand(&snapshot, candidate, &mut best) {
                log::warn!("tool selection failed, returning full catalog: {}", e);
                return full_catalog(&snapshot);
            }
        }

        let mut ranked: Vec<ScoredCapability> = best.into_values().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.definition.name.cmp(&b.definition.name))
        });
        ranked.truncate(self.config.max_tools);
        log::debug!(
            "selected {} tools from {} candidate bundles",
            ranked.len(),
            candidates.len()
        );
        ranked
    }

    /// Up to `k` bundles relevant to `query`, best first. Without an index
    /// or with a blank query every bundle is returned.
    pub fn select_bundles(&self, query: &str, k: usize) -> Vec<Bundle> {
        let snapshot = self.store.snapshot();
        let Some(candidates) = self.candidates(query, k) else {
            return snapshot
                .bundles()
                .into_iter()
                .map(|bundle| (*bundle).clone())
                .collect();
        };
        candidates
            .iter()
            .filter_map(|result| snapshot.get::<Bundle>(&result.id))
            .map(|bundle| (*bundle).clone())
            .collect()
    }

    /// Index hits for `query`, or `None` when narrowing is impossible.
    fn candidates(&self, query: &str, k: usize) -> Option<Vec<SearchResult>> {
        let index = self.index.as_ref()?;
        if query.trim().is_empty() {
            return None;
        }
        Some(index.search(query, k))
    }

    /// Score the capabilities reachable from one candidate bundle.
    fn expand(
        &self,
        snapshot: &Snapshot,
        candidate: &SearchResult,
        best: &mut HashMap<String, ScoredCapability>,
    ) -> Result<(), StoreError> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, i32)> = VecDeque::new();
        visited.insert(candidate.id.clone());
        queue.push_back((candidate.id.clone(), 0));

        while let Some((name, depth)) = queue.pop_front() {
            // dangling candidates and dependencies are skipped
            let Some(bundle) = snapshot.get::<Bundle>(&name) else {
                continue;
            };

            let score = candidate.score * self.config.dependency_decay.powi(depth);
            for capability in snapshot.list_by::<StoredCapability>(INDEX_SOURCE, &bundle.source())? {
                let entry = best
                    .entry(capability.name().to_string())
                    .or_insert_with(|| ScoredCapability {
                        definition: capability.definition.clone(),
                        score,
                    });
                if score > entry.score {
                    entry.score = score;
                }
            }

            for dependency in &bundle.dependencies {
                if visited.insert(dependency.clone()) {
                    queue.push_back((dependency.clone(), depth + 1));
                }
            }
        }
        Ok(())
    }
}

/// Every stored capability, ordered by name, with score 0.
fn full_catalog(snapshot: &Snapshot) -> Vec<ScoredCapability> {
    snapshot
        .capabilities()
        .iter()
        .map(|capability| ScoredCapability {
            definition: capability.definition.clone(),
            score: 0.0,
        })
        .collect()
}
