//! # Rule Cache
//!
//! Maps canonical record keys to compiled rule sets.
//!
//! Reads take a shared `parking_lot::RwLock` and clone an `Arc`, so a
//! reader holds either the old or the new set in full while a
//! re-registration swaps the entry. Compilation is serialized by a
//! separate mutex; callers re-check the map after acquiring it, so a key
//! is compiled at most once under concurrent first use.
//!
//! ## Naming
//!
//! A root record is stored under its full type path. Because type paths
//! are not guaranteed unique, a key already held by a different `TypeId`
//! is never reused: roots fall back to `path#TypeId`, and nested records
//! fall back to the positional `parent#index`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::reflect::RecordType;
use crate::ruleset::CompiledRuleSet;

/// Concurrency-safe store of compiled rule sets, owned by one validator.
#[derive(Debug, Default)]
pub struct RuleCache {
    sets: RwLock<HashMap<String, Arc<CompiledRuleSet>>>,
    compile_guard: Mutex<()>,
    compilations: AtomicUsize,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule set stored under `key`.
    pub fn get(&self, key: &str) -> Option<Arc<CompiledRuleSet>> {
        self.sets.read().get(key).cloned()
    }

    /// Rule set stored under `key`, only if it was compiled for `record_type`.
    pub fn get_for(&self, key: &str, record_type: &RecordType) -> Option<Arc<CompiledRuleSet>> {
        self.get(key)
            .filter(|set| set.record_type().type_id() == record_type.type_id())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sets.read().contains_key(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sets.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.sets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rule sets compiled over the cache's lifetime.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Stores `set` under its key, replacing any previous entry.
    pub(crate) fn insert(&self, set: CompiledRuleSet) -> Arc<CompiledRuleSet> {
        let set = Arc::new(set);
        self.sets.write().insert(set.key().to_string(), Arc::clone(&set));
        self.compilations.fetch_add(1, Ordering::Relaxed);
        set
    }

    /// Serializes compilation. Hold the guard across lookup-compile-insert.
    pub(crate) fn lock_compilation(&self) -> MutexGuard<'_, ()> {
        self.compile_guard.lock()
    }

    /// Key a root record is stored under.
    pub(crate) fn root_key(&self, record_type: &RecordType) -> String {
        let path = record_type.type_name();
        if self.is_free_for(path, record_type) {
            path.to_string()
        } else {
            format!("{path}#{:?}", record_type.type_id())
        }
    }

    /// Key for the record at field `index` of the set stored under `parent`.
    pub(crate) fn nested_key(&self, parent: &str, index: usize, record_type: &RecordType) -> String {
        let path = record_type.type_name();
        if self.is_free_for(path, record_type) {
            path.to_string()
        } else {
            format!("{parent}#{index}")
        }
    }

    /// Cached root rule set for `record_type`, if one exists.
    pub(crate) fn lookup_root(&self, record_type: &RecordType) -> Option<Arc<CompiledRuleSet>> {
        self.get_for(record_type.type_name(), record_type)
            .or_else(|| self.get_for(&self.root_key(record_type), record_type))
    }

    fn is_free_for(&self, key: &str, record_type: &RecordType) -> bool {
        self.sets
            .read()
            .get(key)
            .map_or(true, |set| set.record_type().type_id() == record_type.type_id())
    }
}
