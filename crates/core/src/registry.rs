//! Concurrent servant and adapter registries.
//!
//! Both registries are per-key linearizable maps: a reader observes either
//! the pre- or post-state of a single insert, never a partial write, and
//! iteration never breaks under concurrent inserts. Name listings are
//! snapshots; a name registered concurrently during a listing may or may not
//! be observed.

use crate::adapter::Adapter;
use crate::servant::ServantSkeleton;
use dashmap::DashMap;
use std::sync::Arc;

/// Maps a servant name to its registered skeleton.
///
/// Inserting a duplicate name replaces the previous binding (last-write-wins).
#[derive(Default)]
pub struct SkeletonRegistry {
    inner: DashMap<String, Arc<ServantSkeleton>>,
}

impl SkeletonRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a skeleton under its own name, returning the replaced binding
    /// if one existed.
    pub fn insert(&self, skeleton: Arc<ServantSkeleton>) -> Option<Arc<ServantSkeleton>> {
        self.inner.insert(skeleton.name().to_string(), skeleton)
    }

    /// Returns the skeleton bound under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<ServantSkeleton>> {
        self.inner.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of the currently registered servant names.
    pub fn names(&self) -> Vec<String> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered skeletons.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Maps a servant name to the adapter carrying its traffic.
///
/// Every entry is expected to pair with a skeleton registered under the same
/// name; both maps are written by the same registration path.
#[derive(Default)]
pub struct AdapterRegistry {
    inner: DashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts an adapter under the servant name it serves.
    pub fn insert(&self, servant: impl Into<String>, adapter: Arc<dyn Adapter>) {
        self.inner.insert(servant.into(), adapter);
    }

    /// Returns the adapter serving `servant`, if any.
    pub fn get(&self, servant: &str) -> Option<Arc<dyn Adapter>> {
        self.inner.get(servant).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of servant names with a registered adapter.
    pub fn names(&self) -> Vec<String> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
