//! Bundle definition: a named, composable group of capabilities.
//!
//! A bundle owns every capability whose source is `bundle:<name>` and may
//! depend on other bundles by name. Dependencies are not checked when the
//! bundle is stored; an unknown dependency only fails resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::capability::bundle_source;
use crate::store::{IndexSchema, Record, Table, Tables, INDEX_CATEGORY, INDEX_TAGS};

/// Example query a bundle is meant to handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleExample {
    pub query: String,

    #[serde(default)]
    pub tools_used: Vec<String>,

    #[serde(default)]
    pub description: String,
}

/// A composable capability bundle.
///
/// Example YAML:
/// ```yaml
/// name: "web-research"
/// description: "Search the web and fetch page content for research"
/// tags: ["web", "search", "research"]
/// category: "research"
/// dependencies: ["text-processing"]
/// examples:
///   - query: "Find the latest news about Rust"
///     tools_used: ["web_search", "fetch_page"]
/// priority: 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Unique bundle name
    pub name: String,

    /// Text indexed for relevance search
    #[serde(default)]
    pub description: String,

    /// Searchable tags, also stamped onto every owned capability
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub category: String,

    /// Bundles whose capabilities this bundle needs, in declaration order
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub examples: Vec<BundleExample>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Bundle {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Append a dependency on another bundle.
    pub fn depends_on(mut self, bundle: impl Into<String>) -> Self {
        self.dependencies.push(bundle.into());
        self
    }

    pub fn with_example(mut self, example: BundleExample) -> Self {
        self.examples.push(example);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Source tag carried by the capabilities this bundle owns.
    pub fn source(&self) -> String {
        bundle_source(&self.name)
    }
}

fn bundle_category(bundle: &Bundle) -> Vec<String> {
    vec![bundle.category.clone()]
}

fn bundle_tags(bundle: &Bundle) -> Vec<String> {
    bundle.tags.clone()
}

impl Record for Bundle {
    const TABLE: &'static str = "bundles";
    const INDEXES: &'static [IndexSchema<Self>] = &[
        IndexSchema {
            name: INDEX_CATEGORY,
            allow_missing: true,
            extract: bundle_category,
        },
        IndexSchema {
            name: INDEX_TAGS,
            allow_missing: true,
            extract: bundle_tags,
        },
    ];

    fn primary_key(&self) -> &str {
        &self.name
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.bundles
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        Arc::make_mut(&mut tables.bundles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let bundle = Bundle::new("web-research", "Search the web")
            .with_tags(["web", "search"])
            .with_category("research")
            .depends_on("text-processing")
            .with_priority(3)
            .with_metadata("owner", "platform");

        assert_eq!(bundle.tags, vec!["web", "search"]);
        assert_eq!(bundle.dependencies, vec!["text-processing"]);
        assert_eq!(bundle.source(), "bundle:web-research");
        assert_eq!(bundle.metadata.get("owner").map(String::as_str), Some("platform"));
    }

    #[test]
    fn test_parse_bundle_yaml_with_defaults() {
        let yaml = r#"
name: "math"
description: "Perform mathematical calculations"
examples:
  - query: "what is 2 + 2"
"#;
        let bundle: Bundle = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(bundle.name, "math");
        assert!(bundle.tags.is_empty());
        assert_eq!(bundle.priority, 0);
        assert_eq!(bundle.examples[0].query, "what is 2 + 2");
        assert!(bundle.examples[0].tools_used.is_empty());
    }
}
