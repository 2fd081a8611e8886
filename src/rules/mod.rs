//! # Tool Rules
//!
//! Rules attach pre/post handlers to tools by name for the hook pipeline
//! that wraps capability execution. The pipeline itself lives outside this
//! crate; here rules are stored in the shared store and matched against
//! tool names.
//!
//! A pattern is an exact tool name, `*` for every tool, or (with
//! `is_regex`) an unanchored regular expression. Regexes are compiled once
//! on first use; an invalid regex matches nothing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::capabilities::HandlerRef;
use crate::store::{IndexSchema, Record, Store, StoreError, Table, Tables, INDEX_PATTERN};

/// Pattern matching every tool.
pub const MATCH_ALL: &str = "*";

/// A tool-matching rule with its handlers.
#[derive(Clone)]
pub struct StoredRule {
    /// Generated by [`RuleBook::add`] when left empty.
    pub id: String,
    pub pattern: String,
    pub is_regex: bool,
    /// `None` means no limit.
    pub timeout: Option<Duration>,
    pub pre: Vec<HandlerRef>,
    pub post: Vec<HandlerRef>,
    compiled: Arc<OnceCell<Option<Regex>>>,
}

impl fmt::Debug for StoredRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredRule")
            .field("id", &self.id)
            .field("pattern", &self.pattern)
            .field("is_regex", &self.is_regex)
            .field("timeout", &self.timeout)
            .field("pre", &self.pre.len())
            .field("post", &self.post.len())
            .finish()
    }
}

impl PartialEq for StoredRule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.pattern == other.pattern
            && self.is_regex == other.is_regex
            && self.timeout == other.timeout
            && self.pre == other.pre
            && self.post == other.post
    }
}

impl StoredRule {
    fn with_pattern(pattern: impl Into<String>, is_regex: bool) -> Self {
        Self {
            id: String::new(),
            pattern: pattern.into(),
            is_regex,
            timeout: None,
            pre: Vec::new(),
            post: Vec::new(),
            compiled: Arc::new(OnceCell::new()),
        }
    }

    /// Rule for exactly one tool name.
    pub fn exact(tool_name: impl Into<String>) -> Self {
        Self::with_pattern(tool_name, false)
    }

    /// Rule applying to every tool.
    pub fn all() -> Self {
        Self::with_pattern(MATCH_ALL, false)
    }

    /// Rule whose pattern is a regular expression.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::with_pattern(pattern, true)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_pre(mut self, handler: HandlerRef) -> Self {
        self.pre.push(handler);
        self
    }

    pub fn with_post(mut self, handler: HandlerRef) -> Self {
        self.post.push(handler);
        self
    }

    /// Whether this rule applies to `tool_name`.
    pub fn matches(&self, tool_name: &str) -> bool {
        if self.pattern == MATCH_ALL {
            return true;
        }
        if self.is_regex {
            return self
                .compiled
                .get_or_init(|| match Regex::new(&self.pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        log::warn!("rule '{}' has invalid pattern: {}", self.id, e);
                        None
                    }
                })
                .as_ref()
                .map_or(false, |re| re.is_match(tool_name));
        }
        self.pattern == tool_name
    }
}

fn rule_pattern(rule: &StoredRule) -> Vec<String> {
    vec![rule.pattern.clone()]
}

impl Record for StoredRule {
    const TABLE: &'static str = "rules";
    const INDEXES: &'static [IndexSchema<Self>] = &[IndexSchema {
        name: INDEX_PATTERN,
        allow_missing: false,
        extract: rule_pattern,
    }];

    fn primary_key(&self) -> &str {
        &self.id
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.rules
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        Arc::make_mut(&mut tables.rules)
    }
}

// ---------------------------------------------------------------------------
// RuleBook
// ---------------------------------------------------------------------------

/// Rule table access over a shared store.
#[derive(Debug, Clone)]
pub struct RuleBook {
    store: Arc<Store>,
}

impl RuleBook {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Store `rule`, generating an id when it has none. Returns the id.
    ///
    /// Adding a rule with an existing id replaces it.
    pub fn add(&self, mut rule: StoredRule) -> Result<String, StoreError> {
        if rule.id.is_empty() {
            rule.id = self.store.next_rule_id();
        }
        let id = rule.id.clone();
        self.store.put(rule)?;
        log::debug!("added rule '{}'", id);
        Ok(id)
    }

    /// Remove a rule. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.store.delete::<StoredRule>(id)
    }

    pub fn get(&self, id: &str) -> Option<StoredRule> {
        self.store.get::<StoredRule>(id).map(|rule| (*rule).clone())
    }

    /// Every rule, ordered by id (generated ids follow insertion order).
    pub fn all(&self) -> Vec<StoredRule> {
        self.store
            .list::<StoredRule>()
            .iter()
            .map(|rule| (**rule).clone())
            .collect()
    }

    /// Rules stored under exactly `pattern`.
    pub fn by_pattern(&self, pattern: &str) -> Result<Vec<StoredRule>, StoreError> {
        Ok(self
            .store
            .list_by::<StoredRule>(INDEX_PATTERN, pattern)?
            .iter()
            .map(|rule| (**rule).clone())
            .collect())
    }

    /// Rules that apply to `tool_name`, ordered by id.
    pub fn matching(&self, tool_name: &str) -> Vec<StoredRule> {
        self.store
            .list::<StoredRule>()
            .iter()
            .filter(|rule| rule.matches(tool_name))
            .map(|rule| (**rule).clone())
            .collect()
    }
}
