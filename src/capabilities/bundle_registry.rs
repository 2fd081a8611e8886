//! Bundle Registry: bundles, their owned capabilities and dependency
//! resolution.
//!
//! Registration writes the bundle and its capabilities in one store commit
//! and, when a relevance index is attached, (re-)indexes the bundle's
//! description and tags under its name. Removal deletes the owned
//! capabilities and the bundle record, also in one commit, and is safe to
//! repeat.
//!
//! Index updates run inside the write transaction, after every record has
//! been accepted, so concurrent registrations and removals reach the index
//! in the same order they reach the store. Writes that bypass the registry
//! (direct `Store` calls, or a second registry without the index) are not
//! seen by the index; [`BundleRegistry::reindex`] brings it back in line.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::bundle::Bundle;
use super::capability::{bundle_source, CapabilityDef, HandlerRef, StoredCapability};
use super::error::RegistryError;
use super::manifest::{is_manifest_path, BundleManifest};
use super::registry::CapabilityRegistry;
use crate::search::RelevanceIndex;
use crate::store::{Snapshot, Store, StoreError, INDEX_CATEGORY, INDEX_SOURCE, INDEX_TAGS};

/// A capability handed to [`BundleRegistry::register`].
#[derive(Debug, Clone, PartialEq)]
pub struct BundleCapability {
    pub definition: CapabilityDef,
    pub handler: Option<HandlerRef>,
}

impl BundleCapability {
    pub fn new(definition: CapabilityDef, handler: Option<HandlerRef>) -> Self {
        Self {
            definition,
            handler,
        }
    }
}

impl From<CapabilityDef> for BundleCapability {
    fn from(definition: CapabilityDef) -> Self {
        Self::new(definition, None)
    }
}

/// Registry of capability bundles over a shared [`Store`].
#[derive(Clone)]
pub struct BundleRegistry {
    store: Arc<Store>,
    index: Option<Arc<dyn RelevanceIndex>>,
}

impl std::fmt::Debug for BundleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleRegistry")
            .field("store", &self.store)
            .field("indexed", &self.index.is_some())
            .finish()
    }
}

impl BundleRegistry {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store, index: None }
    }

    /// Keep `index` in sync with registrations and removals.
    pub fn with_index(mut self, index: Arc<dyn RelevanceIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn index(&self) -> Option<&Arc<dyn RelevanceIndex>> {
        self.index.as_ref()
    }

    /// Upsert `bundle` and each of `capabilities`.
    ///
    /// Every capability is stored with `source = "bundle:<name>"` and the
    /// bundle's tags, replacing whatever tags it carried. Nothing is written
    /// if any record is rejected.
    pub fn register<I>(&self, bundle: Bundle, capabilities: I) -> Result<(), RegistryError>
    where
        I: IntoIterator,
        I::Item: Into<BundleCapability>,
    {
        let source = bundle.source();
        let tags = bundle.tags.clone();
        let stored = self.store.write(|txn| {
            txn.put(bundle.clone())?;
            let mut count = 0usize;
            for capability in capabilities {
                let capability = capability.into();
                txn.put(StoredCapability {
                    definition: capability.definition,
                    source: source.clone(),
                    tags: tags.clone(),
                    handler: capability.handler,
                })?;
                count += 1;
            }
            // under the writer lock, so index order follows commit order
            if let Some(index) = &self.index {
                index.index(&bundle.name, &bundle.description, &bundle.tags);
            }
            Ok::<_, StoreError>(count)
        })?;

        log::debug!(
            "registered bundle '{}' with {} capabilities",
            bundle.name,
            stored
        );
        Ok(())
    }

    /// Register `bundle` with every capability currently held by `tools`,
    /// handlers included.
    pub fn register_from(
        &self,
        bundle: Bundle,
        tools: &CapabilityRegistry,
    ) -> Result<(), RegistryError> {
        let capabilities: Vec<BundleCapability> = tools
            .records()
            .into_iter()
            .map(|record| BundleCapability::new(record.definition, record.handler))
            .collect();
        self.register(bundle, capabilities)
    }

    /// Delete the bundle and every capability it owns.
    ///
    /// Removing an unknown or partially removed bundle succeeds.
    pub fn remove(&self, name: &str) -> Result<(), RegistryError> {
        let source = bundle_source(name);
        let removed = self.store.write(|txn| {
            let owned = txn.list_by::<StoredCapability>(INDEX_SOURCE, &source)?;
            for capability in &owned {
                txn.delete::<StoredCapability>(capability.name());
            }
            txn.delete::<Bundle>(name);
            if let Some(index) = &self.index {
                index.remove(name);
            }
            Ok::<_, StoreError>(owned.len())
        })?;

        log::debug!("removed bundle '{}' and {} capabilities", name, removed);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Bundle> {
        self.store.get::<Bundle>(name).map(|bundle| (*bundle).clone())
    }

    pub fn by_tag(&self, tag: &str) -> Result<Vec<Bundle>, RegistryError> {
        Ok(clone_all(self.store.list_by::<Bundle>(INDEX_TAGS, tag)?))
    }

    pub fn by_category(&self, category: &str) -> Result<Vec<Bundle>, RegistryError> {
        Ok(clone_all(self.store.list_by::<Bundle>(INDEX_CATEGORY, category)?))
    }

    /// Every bundle, ordered by name.
    pub fn all(&self) -> Vec<Bundle> {
        clone_all(self.store.list::<Bundle>())
    }

    /// Capabilities owned by a single bundle, ordered by name.
    pub fn capabilities_of(&self, name: &str) -> Result<Vec<StoredCapability>, RegistryError> {
        Ok(clone_all(
            self.store
                .list_by::<StoredCapability>(INDEX_SOURCE, &bundle_source(name))?,
        ))
    }

    /// Capabilities of the named bundles and of every bundle reachable
    /// through their dependencies.
    ///
    /// Each bundle is expanded once per call, so dependency cycles terminate.
    /// Dependencies come before their dependents and every capability
    /// appears once. Any unknown bundle fails the whole call.
    pub fn resolve<I>(&self, names: I) -> Result<Vec<StoredCapability>, RegistryError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let snapshot = self.store.snapshot();
        let mut visited = HashSet::new();
        let mut emitted = HashSet::new();
        let mut resolved = Vec::new();

        for name in names {
            resolve_into(
                &snapshot,
                name.as_ref(),
                &mut visited,
                &mut emitted,
                &mut resolved,
            )?;
        }
        Ok(resolved)
    }

    /// Rebuild the attached index from the stored bundles, dropping any
    /// document without a bundle behind it. Returns the number of bundles
    /// indexed (zero without an index).
    pub fn reindex(&self) -> usize {
        let Some(index) = &self.index else {
            return 0;
        };
        let indexed: Result<usize, StoreError> = self.store.write(|txn| {
            let bundles = txn.list::<Bundle>();
            index.clear();
            for bundle in &bundles {
                index.index(&bundle.name, &bundle.description, &bundle.tags);
            }
            Ok(bundles.len())
        });
        indexed.unwrap_or(0)
    }

    /// Register the bundle declared in a YAML manifest file.
    pub fn load_manifest_file(&self, path: &Path) -> Result<(), RegistryError> {
        let manifest = BundleManifest::from_file(path)?;
        self.register(manifest.bundle, manifest.capabilities)
    }

    /// Register every `.yaml`/`.yml` manifest under `dir` (recursive).
    ///
    /// Manifests that fail to load are skipped with a warning. A missing
    /// directory loads nothing.
    pub fn load_directory(&self, dir: &Path) -> Result<usize, RegistryError> {
        if !dir.exists() {
            return Ok(0);
        }

        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        let mut count = 0;
        for path in entries {
            if path.is_dir() {
                count += self.load_directory(&path)?;
            } else if is_manifest_path(&path) {
                match self.load_manifest_file(&path) {
                    Ok(()) => count += 1,
                    Err(e) => {
                        log::warn!("Failed to load bundle manifest {}: {}", path.display(), e);
                    }
                }
            }
        }
        Ok(count)
    }
}

fn resolve_into(
    snapshot: &Snapshot,
    name: &str,
    visited: &mut HashSet<String>,
    emitted: &mut HashSet<String>,
    out: &mut Vec<StoredCapability>,
) -> Result<(), RegistryError> {
    if !visited.insert(name.to_string()) {
        return Ok(());
    }

    let bundle = snapshot
        .get::<Bundle>(name)
        .ok_or_else(|| RegistryError::BundleNotFound(name.to_string()))?;

    for dependency in &bundle.dependencies {
        resolve_into(snapshot, dependency, visited, emitted, out)?;
    }

    for capability in snapshot.list_by::<StoredCapability>(INDEX_SOURCE, &bundle.source())? {
        if emitted.insert(capability.name().to_string()) {
            out.push((*capability).clone());
        }
    }
    Ok(())
}

fn clone_all<R: Clone>(records: Vec<Arc<R>>) -> Vec<R> {
    records.into_iter().map(|record| (*record).clone()).collect()
}
