//! # Multi-Index Store
//!
//! Transactional in-memory tables for capabilities, bundles and rules.
//!
//! Every committed state is immutable and shared behind an `Arc`. A write
//! transaction starts from the latest state, mutates private copy-on-write
//! tables and, on success, publishes the result as the new state in a single
//! pointer swap. Consequences:
//!
//! - writers are serialized by a mutex and never partially visible;
//! - readers take a [`Snapshot`] by cloning the current `Arc` and are never
//!   affected by later commits;
//! - secondary indexes live in the same state as the rows they index, so a
//!   record can never be seen in one index and missing from another.
//!
//! ```rust
//! use crewai_skills::capabilities::{CapabilityDef, StoredCapability};
//! use crewai_skills::store::Store;
//!
//! let store = Store::new();
//! store
//!     .put(StoredCapability::native(CapabilityDef::new("ping", "Check liveness")))
//!     .unwrap();
//! let snapshot = store.snapshot();
//! assert!(snapshot.get::<StoredCapability>("ping").is_some());
//! ```

pub mod error;
pub mod table;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

pub use error::StoreError;
pub use table::{
    IndexSchema, Record, Table, Tables, INDEX_CATEGORY, INDEX_PATTERN, INDEX_SOURCE, INDEX_TAGS,
    PRIMARY_INDEX,
};

use crate::capabilities::{Bundle, StoredCapability};
use crate::rules::StoredRule;

/// One committed, immutable store state.
#[derive(Clone, Default)]
struct Committed {
    tables: Tables,
    version: u64,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Shared multi-index store.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Store {
    current: RwLock<Arc<Committed>>,
    writer: Mutex<()>,
    rule_seq: AtomicU64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.current.read().clone();
        f.debug_struct("Store")
            .field("version", &state.version)
            .field("capabilities", &state.tables.capabilities.len())
            .field("bundles", &state.tables.bundles.len())
            .field("rules", &state.tables.rules.len())
            .finish()
    }
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Committed::default())),
            writer: Mutex::new(()),
            rule_seq: AtomicU64::new(0),
        }
    }

    /// Take a point-in-time read view. Later commits are invisible to it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.current.read().clone(),
        }
    }

    /// Number of commits applied so far.
    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Run `f` inside a write transaction.
    ///
    /// All changes made through the [`WriteTxn`] are published together when
    /// `f` returns `Ok`; an `Err` discards every one of them. Only one write
    /// transaction runs at a time.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTxn) -> Result<T, E>,
    {
        let _guard = self.writer.lock();
        let base = self.current.read().clone();
        let mut txn = WriteTxn {
            tables: base.tables.clone(),
            changes: 0,
        };

        let out = f(&mut txn)?;

        if txn.changes > 0 {
            let next = Arc::new(Committed {
                tables: txn.tables,
                version: base.version + 1,
            });
            *self.current.write() = next;
            log::debug!("store commit v{} ({} changes)", base.version + 1, txn.changes);
        }
        Ok(out)
    }

    /// Upsert a single record.
    pub fn put<R: Record>(&self, record: R) -> Result<(), StoreError> {
        self.write(|txn| txn.put(record))
    }

    /// Delete a single record by primary key. Absent keys succeed silently.
    pub fn delete<R: Record>(&self, key: &str) -> bool {
        let result: Result<bool, StoreError> = self.write(|txn| Ok(txn.delete::<R>(key)));
        matches!(result, Ok(true))
    }

    /// Read a record by primary key from the latest state.
    pub fn get<R: Record>(&self, key: &str) -> Option<Arc<R>> {
        self.snapshot().get(key)
    }

    /// List every record of a table, ordered by primary key.
    pub fn list<R: Record>(&self) -> Vec<Arc<R>> {
        self.snapshot().list()
    }

    /// List the records indexed under `value` in `index`.
    pub fn list_by<R: Record>(&self, index: &str, value: &str) -> Result<Vec<Arc<R>>, StoreError> {
        self.snapshot().list_by(index, value)
    }

    /// Generate the next rule identifier (`rule-000001`, ...).
    pub(crate) fn next_rule_id(&self) -> String {
        format!("rule-{:06}", self.rule_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ---------------------------------------------------------------------------
// WriteTxn
// ---------------------------------------------------------------------------

/// Mutable view handed to [`Store::write`].
///
/// Reads through the transaction observe its own uncommitted writes.
pub struct WriteTxn {
    tables: Tables,
    changes: usize,
}

impl WriteTxn {
    /// Upsert a record, replacing any previous row with the same key.
    pub fn put<R: Record>(&mut self, record: R) -> Result<(), StoreError> {
        R::table_mut(&mut self.tables).insert(record)?;
        self.changes += 1;
        Ok(())
    }

    /// Delete a record. Returns whether a row was removed.
    pub fn delete<R: Record>(&mut self, key: &str) -> bool {
        if R::table(&self.tables).get(key).is_none() {
            return false;
        }
        let removed = R::table_mut(&mut self.tables).remove(key).is_some();
        if removed {
            self.changes += 1;
        }
        removed
    }

    pub fn get<R: Record>(&self, key: &str) -> Option<Arc<R>> {
        R::table(&self.tables).get(key).cloned()
    }

    pub fn list<R: Record>(&self) -> Vec<Arc<R>> {
        R::table(&self.tables).iter().cloned().collect()
    }

    pub fn list_by<R: Record>(&self, index: &str, value: &str) -> Result<Vec<Arc<R>>, StoreError> {
        R::table(&self.tables).lookup(index, value)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable point-in-time view of the store. Released on drop.
#[derive(Clone)]
pub struct Snapshot {
    state: Arc<Committed>,
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.state.version)
            .finish()
    }
}

impl Snapshot {
    /// Commit counter of the state this snapshot was taken from.
    pub fn version(&self) -> u64 {
        self.state.version
    }

    pub fn get<R: Record>(&self, key: &str) -> Option<Arc<R>> {
        R::table(&self.state.tables).get(key).cloned()
    }

    /// Like [`Snapshot::get`] but an absent key is a [`StoreError::NotFound`].
    pub fn require<R: Record>(&self, key: &str) -> Result<Arc<R>, StoreError> {
        self.get(key).ok_or_else(|| StoreError::not_found(R::TABLE, key))
    }

    pub fn list<R: Record>(&self) -> Vec<Arc<R>> {
        R::table(&self.state.tables).iter().cloned().collect()
    }

    pub fn list_by<R: Record>(&self, index: &str, value: &str) -> Result<Vec<Arc<R>>, StoreError> {
        R::table(&self.state.tables).lookup(index, value)
    }

    pub fn len<R: Record>(&self) -> usize {
        R::table(&self.state.tables).len()
    }

    /// Capability records, the table selection reads most.
    pub fn capabilities(&self) -> Vec<Arc<StoredCapability>> {
        self.list()
    }

    pub fn bundles(&self) -> Vec<Arc<Bundle>> {
        self.list()
    }

    pub fn rules(&self) -> Vec<Arc<StoredRule>> {
        self.list()
    }
}
