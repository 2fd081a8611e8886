//! # CrewAI Skills
//!
//! Per-turn capability selection for crewAI agents. Instead of handing the
//! model every registered tool, the agent asks a [`ToolSelector`] which
//! small, relevance-ordered subset matters for the current query.
//!
//! The crate is built from four parts:
//!
//! - [`store`]: transactional multi-index tables with snapshot reads
//! - [`search`]: BM25 relevance ranking of bundle descriptions
//! - [`capabilities`]: capability and bundle registries with dependency
//!   resolution and YAML manifests
//! - [`selection`]: ranked search fused with dependency expansion and score
//!   decay, failing open to the full catalog
//!
//! ```rust
//! use std::sync::Arc;
//! use crewai_skills::{Bm25Index, Bundle, BundleRegistry, CapabilityDef, Store, ToolSelector};
//!
//! let store = Arc::new(Store::new());
//! let index = Arc::new(Bm25Index::new());
//! let bundles = BundleRegistry::new(Arc::clone(&store)).with_index(index.clone());
//!
//! bundles
//!     .register(
//!         Bundle::new("math", "Perform mathematical calculations"),
//!         vec![CapabilityDef::new("calculate", "Evaluate an expression")],
//!     )
//!     .unwrap();
//!
//! let selector = ToolSelector::new(store).with_index(index);
//! let tools = selector.select_tools("run some calculations");
//! assert_eq!(tools[0].name, "calculate");
//! ```

pub mod capabilities;
pub mod config;
pub mod rules;
pub mod search;
pub mod selection;
pub mod store;

pub use capabilities::{
    Bundle, BundleCapability, BundleExample, BundleManifest, BundleRegistry, CapabilityDef,
    CapabilityRegistry, HandlerRef, RegistryError, StoredCapability,
};
pub use config::{ConfigError, SelectionConfig};
pub use rules::{RuleBook, StoredRule};
pub use search::{Bm25Index, Bm25Params, RelevanceIndex, SearchResult};
pub use selection::{ScoredCapability, ToolSelector};
pub use store::{Snapshot, Store, StoreError, WriteTxn};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
