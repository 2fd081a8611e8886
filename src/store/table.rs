//! Copy-on-write tables with a unique primary index and secondary indexes.
//!
//! A [`Table`] keeps its rows and every secondary index in ordered maps so
//! iteration order is stable (by primary key, then by index value). Tables
//! are held behind `Arc` inside [`Tables`]; a write transaction calls
//! `Arc::make_mut` on each table it touches. The committed state always
//! holds a reference too, so the first write to a table in a transaction
//! copies it in full. Tables the transaction never touches stay shared.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::error::StoreError;
use crate::capabilities::{Bundle, StoredCapability};
use crate::rules::StoredRule;

/// Name of the unique primary index carried by every table.
pub const PRIMARY_INDEX: &str = "id";
/// Capability origin (`native`, `bundle:<name>`, `mcp:<server>`).
pub const INDEX_SOURCE: &str = "source";
/// Multi-valued tag membership index.
pub const INDEX_TAGS: &str = "tags";
/// Bundle category.
pub const INDEX_CATEGORY: &str = "category";
/// Rule tool-name pattern.
pub const INDEX_PATTERN: &str = "pattern";

/// Declares one secondary index of a table.
///
/// `extract` returns every value the record is indexed under; a list index
/// (tags) returns several. Empty strings are ignored. When `allow_missing`
/// is false the record must yield at least one value.
pub struct IndexSchema<R> {
    pub name: &'static str,
    pub allow_missing: bool,
    pub extract: fn(&R) -> Vec<String>,
}

/// A type that can live in a store table.
pub trait Record: Clone + Send + Sync + 'static {
    /// Table name, used in errors and logs.
    const TABLE: &'static str;

    /// Secondary indexes maintained for this table.
    const INDEXES: &'static [IndexSchema<Self>];

    /// Value of the unique primary index.
    fn primary_key(&self) -> &str;

    #[doc(hidden)]
    fn table(tables: &Tables) -> &Table<Self>;

    #[doc(hidden)]
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;
}

/// The full set of tables making up one committed store state.
#[derive(Clone, Default)]
pub struct Tables {
    pub(crate) capabilities: Arc<Table<StoredCapability>>,
    pub(crate) bundles: Arc<Table<Bundle>>,
    pub(crate) rules: Arc<Table<StoredRule>>,
}

/// Rows of one record type plus their secondary indexes.
pub struct Table<R: Record> {
    rows: BTreeMap<String, Arc<R>>,
    // index name -> index value -> primary keys
    indexes: BTreeMap<&'static str, BTreeMap<String, BTreeSet<String>>>,
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            indexes: BTreeMap::new(),
        }
    }
}

impl<R: Record> Clone for Table<R> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            indexes: self.indexes.clone(),
        }
    }
}

impl<R: Record> Table<R> {
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Arc<R>> {
        self.rows.get(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<R>> {
        self.rows.values()
    }

    /// Every record indexed under `value` in `index`, ordered by primary key.
    pub(crate) fn lookup(&self, index: &str, value: &str) -> Result<Vec<Arc<R>>, StoreError> {
        if index == PRIMARY_INDEX {
            return Ok(self.rows.get(value).cloned().into_iter().collect());
        }
        if !R::INDEXES.iter().any(|schema| schema.name == index) {
            return Err(StoreError::transaction(format!(
                "unknown index '{}' on table '{}'",
                index,
                R::TABLE
            )));
        }
        let keys = match self.indexes.get(index).and_then(|values| values.get(value)) {
            Some(keys) => keys,
            None => return Ok(Vec::new()),
        };
        Ok(keys
            .iter()
            .filter_map(|key| self.rows.get(key).cloned())
            .collect())
    }

    /// Upsert a record, replacing any previous row and its index entries.
    ///
    /// The record is validated before anything is touched, so a failed
    /// insert leaves the table unchanged.
    pub(crate) fn insert(&mut self, record: R) -> Result<Option<Arc<R>>, StoreError> {
        let key = record.primary_key().to_string();
        if key.is_empty() {
            return Err(StoreError::transaction(format!(
                "missing primary key for table '{}'",
                R::TABLE
            )));
        }
        let entries = Self::index_entries(&record)?;

        let previous = self.remove(&key);
        for (name, values) in entries {
            let index = self.indexes.entry(name).or_default();
            for value in values {
                index.entry(value).or_default().insert(key.clone());
            }
        }
        self.rows.insert(key, Arc::new(record));
        Ok(previous)
    }

    /// Delete a row and all its index entries. Absent keys are a no-op.
    pub(crate) fn remove(&mut self, key: &str) -> Option<Arc<R>> {
        let previous = self.rows.remove(key)?;
        for schema in R::INDEXES {
            let Some(index) = self.indexes.get_mut(schema.name) else {
                continue;
            };
            for value in (schema.extract)(&previous) {
                if let Some(keys) = index.get_mut(&value) {
                    keys.remove(key);
                    if keys.is_empty() {
                        index.remove(&value);
                    }
                }
            }
        }
        Some(previous)
    }

    fn index_entries(record: &R) -> Result<Vec<(&'static str, BTreeSet<String>)>, StoreError> {
        let mut entries = Vec::with_capacity(R::INDEXES.len());
        for schema in R::INDEXES {
            let values: BTreeSet<String> = (schema.extract)(record)
                .into_iter()
                .filter(|value| !value.is_empty())
                .collect();
            if values.is_empty() && !schema.allow_missing {
                return Err(StoreError::transaction(format!(
                    "missing value for index '{}' on {} record '{}'",
                    schema.name,
                    R::TABLE,
                    record.primary_key()
                )));
            }
            entries.push((schema.name, values));
        }
        Ok(entries)
    }
}
