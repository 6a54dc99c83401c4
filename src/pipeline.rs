//! Dependency-tracked incremental rebuild pipeline.
//!
//! Owns every [`Instance`] and the [`PathIndex`] mapping each path an
//! instance was built from back to that instance. The watch thread hands
//! over one batch of filesystem events per session; each impacted instance
//! is rebuilt exactly once, however many events named it.
//!
//! ```text
//! events ──► classify ──► impacted ids ──► rebuild each ──► publish snapshot
//!              │                             │
//!              ├─ new source   → add          ├─ inline + minify
//!              ├─ own source   → remove       ├─ merge with data
//!              └─ shared path  → skip         └─ re-register paths
//! ```
//!
//! All mutation happens on one thread. Readers elsewhere go through the
//! [`Snapshot`], which lags by at most one session.

use crate::app::AppContext;
use crate::error::ErrorCategory;
use crate::index::PathIndex;
use crate::inline::{self, Inliner};
use crate::instance::{Instance, InstanceId, InstanceSummary};
use crate::live::InstanceUpdate;
use crate::log;
use crate::merge;
use crate::utils::category::{FileCategory, categorize_path, is_source_file, normalize_path};
use arc_swap::ArcSwap;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::Arc,
};
use walkdir::WalkDir;

/// Latest published instance summaries.
pub type Snapshot = Arc<ArcSwap<Vec<InstanceSummary>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Modified,
    Deleted,
}

/// One filesystem change, as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// What one session did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub created: Vec<InstanceId>,
    pub rebuilt: Vec<InstanceId>,
    pub removed: Vec<InstanceId>,
    /// Deleted paths owned by more than one instance.
    pub ambiguous: Vec<PathBuf>,
}

impl SessionReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.rebuilt.is_empty()
            && self.removed.is_empty()
            && self.ambiguous.is_empty()
    }
}

pub struct Pipeline {
    app: AppContext,
    inliner: Inliner,
    source_dir: PathBuf,
    data_dir: PathBuf,
    output_dir: PathBuf,
    instances: BTreeMap<InstanceId, Instance>,
    index: PathIndex,
    snapshot: Snapshot,
}

impl Pipeline {
    pub fn new(app: AppContext) -> Self {
        let source_dir = app.config.build.source.clone();
        let data_dir = app.config.build.data.clone();
        let output_dir = app.config.output_dir();
        Self {
            app,
            inliner: Inliner::new(),
            source_dir,
            data_dir,
            output_dir,
            instances: BTreeMap::new(),
            index: PathIndex::new(),
            snapshot: Arc::new(ArcSwap::from_pointee(Vec::new())),
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Build every top-level template in the source directory.
    ///
    /// Returns the number of instances created.
    pub fn initial_load(&mut self) -> usize {
        let sources: Vec<PathBuf> = WalkDir::new(&self.source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log!("error"; "cannot scan source directory: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path()))
            .map(|entry| normalize_path(entry.path()))
            .collect();

        for source in &sources {
            let id = self.add_instance(source);
            self.rebuild(&id);
        }
        self.publish();

        log!("watch"; "loaded {} templates from {}", sources.len(), self.source_dir.display());
        sources.len()
    }

    fn add_instance(&mut self, source: &Path) -> InstanceId {
        let instance = Instance::new(source, &self.data_dir, &self.output_dir);
        let id = instance.id.clone();
        self.instances.insert(id.clone(), instance);
        id
    }

    fn remove_instance(&mut self, id: &InstanceId) {
        self.index.purge(id);
        if let Some(instance) = self.instances.remove(id) {
            log!("watch"; "removed {}", instance.name);
            self.app.sink.push(InstanceUpdate::Removed(id.clone()));
        }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Apply one drained batch of events.
    ///
    /// Impacted instances are collected first and rebuilt once each at the
    /// end, in id order.
    pub fn apply_session(&mut self, events: &[FsEvent]) -> SessionReport {
        let mut report = SessionReport::default();
        let mut impacted = BTreeSet::new();
        let mut touched = BTreeSet::new();

        for event in events {
            let path = normalize_path(&event.path);
            match event.kind {
                FsEventKind::Deleted => {
                    self.handle_delete(&path, &mut impacted, &mut touched, &mut report)
                }
                FsEventKind::Created | FsEventKind::Modified => {
                    if let Some(owners) = self.index.owners(&path) {
                        impacted.extend(owners.iter().cloned());
                    } else if self.is_new_source(&path) {
                        let id = self.add_instance(&path);
                        log!("watch"; "new template {}", path.display());
                        report.created.push(id.clone());
                        impacted.insert(id);
                    }
                }
            }
        }

        impacted.retain(|id| self.instances.contains_key(id));
        for id in &impacted {
            self.rebuild(id);
        }
        for id in touched.difference(&impacted) {
            if let Some(instance) = self.instances.get(id) {
                self.app
                    .sink
                    .push(InstanceUpdate::Refreshed(instance.summary()));
            }
        }
        report.rebuilt = impacted.into_iter().collect();

        if !report.is_empty() {
            self.publish();
        }
        report
    }

    fn handle_delete(
        &mut self,
        path: &Path,
        impacted: &mut BTreeSet<InstanceId>,
        touched: &mut BTreeSet<InstanceId>,
        report: &mut SessionReport,
    ) {
        let Some(owners) = self.index.owners(path) else {
            return;
        };
        let owners: Vec<InstanceId> = owners.iter().cloned().collect();

        if let [id] = owners.as_slice() {
            let is_own_source = self
                .instances
                .get(id)
                .is_some_and(|instance| instance.source == path);
            if is_own_source {
                self.remove_instance(id);
                impacted.remove(id);
                report.removed.push(id.clone());
            } else {
                impacted.insert(id.clone());
            }
            return;
        }

        let message = format!(
            "deleted `{}` belongs to {} templates, skipped",
            path.display(),
            owners.len()
        );
        log!("watch"; "{message}");
        for id in &owners {
            if let Some(instance) = self.instances.get_mut(id) {
                instance.log_error(ErrorCategory::AmbiguousPath, message.clone());
                touched.insert(id.clone());
            }
        }
        report.ambiguous.push(path.to_path_buf());
    }

    fn is_new_source(&self, path: &Path) -> bool {
        categorize_path(path, &self.source_dir, &self.data_dir) == FileCategory::Source
            && is_source_file(path)
            && path.is_file()
            && !self.instances.contains_key(&InstanceId::from_path(path))
    }

    // =========================================================================
    // Rebuild
    // =========================================================================

    /// Rebuild one instance from scratch and announce the result.
    ///
    /// Failures are recorded on the instance and never reach the caller.
    pub fn rebuild(&mut self, id: &InstanceId) {
        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        self.index.purge(id);
        instance.reset();

        match self.inliner.process(&instance.source, Some(&instance.inlined)) {
            Ok(ctx) => {
                instance.update(ctx);
                merge_instance(self.app.merger.as_ref(), instance);
            }
            Err(e) => {
                log!("error"; "{}: {e}", instance.name);
                instance.log_error(e.category(), e.to_string());
            }
        }

        self.index.register(&instance.source, id);
        self.index.register(&instance.data, id);
        for dependency in &instance.dependencies {
            self.index.register(&dependency.path, id);
        }

        log!("watch"; "rebuilt {}", instance.name);
        self.app
            .sink
            .push(InstanceUpdate::Refreshed(instance.summary()));
    }

    fn publish(&self) {
        let summaries = self.instances.values().map(Instance::summary).collect();
        self.snapshot.store(Arc::new(summaries));
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Directories that have to be watched: every indexed path's parent plus
    /// the source and data directories.
    pub fn watch_dirs(&self) -> BTreeSet<PathBuf> {
        let mut dirs = self.index.directories();
        dirs.insert(self.source_dir.clone());
        dirs.insert(self.data_dir.clone());
        dirs
    }

    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.snapshot)
    }

    pub fn instance(&self, id: &InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }
}

/// Merge the inlined document with its data, then take the title from the
/// merged result.
fn merge_instance(merger: &dyn merge::Merger, instance: &mut Instance) {
    if let Err(e) = merge::merge_file(merger, &instance.inlined, &instance.data, &instance.merged)
    {
        log!("merge"; "{}: {e}", instance.name);
        instance.log_error(e.category(), e.to_string());
    }

    match inline::title_of(&instance.merged) {
        Ok(title) => instance.title = title.unwrap_or_default(),
        Err(e) => instance.log_error(ErrorCategory::Title, e.to_string()),
    }
}
