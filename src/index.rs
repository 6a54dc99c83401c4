//! Path → instance index.
//!
//! Many-to-many: a shared fragment maps to every instance that includes it.
//! Entries are only ever added or purged per instance, and a path whose last
//! owner is purged disappears from the index.

use crate::instance::InstanceId;
use rustc_hash::FxHashMap;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

#[derive(Debug, Default)]
pub struct PathIndex {
    owners: FxHashMap<PathBuf, BTreeSet<InstanceId>>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<PathBuf>, id: &InstanceId) {
        self.owners.entry(path.into()).or_default().insert(id.clone());
    }

    /// Drop every association of `id`.
    pub fn purge(&mut self, id: &InstanceId) {
        self.owners.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
    }

    /// Instances that depend on `path`.
    pub fn owners(&self, path: &Path) -> Option<&BTreeSet<InstanceId>> {
        self.owners.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.owners.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Parent directories of every indexed path.
    pub fn directories(&self) -> BTreeSet<PathBuf> {
        self.owners
            .keys()
            .filter_map(|p| p.parent())
            .map(Path::to_path_buf)
            .collect()
    }
}
