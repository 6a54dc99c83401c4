//! Background watch thread.
//!
//! Feeds filesystem events into a [`Pipeline`] in sessions:
//!
//! ```text
//! ┌──────────┐   ┌─────────────────────────── watch thread ───────────────────────────┐
//! │ notify   │──▶│ block on first event ─▶ sleep DRAIN_DELAY ─▶ drain channel         │
//! │ callback │   │        ▲                                          │                │
//! └──────────┘   │        │                                          ▼                │
//! ┌──────────┐   │   sync watched dirs ◀── apply_session ◀── map + filter events      │
//! │  stop()  │──▶│ (Stop ends the loop at the next wake-up)                           │
//! └──────────┘   └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Directories are watched non-recursively. After every session the watched
//! set is diffed against [`Pipeline::watch_dirs`], so a fragment in a new
//! directory is picked up as soon as some template includes it.

use crate::log;
use crate::pipeline::{FsEvent, FsEventKind, Pipeline, Snapshot};
use anyhow::{Context, Result};
use notify::{
    Event, EventKind, RecursiveMode, Watcher,
    event::{ModifyKind, RenameMode},
};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

/// Pause between the first event of a session and draining the rest.
pub const DRAIN_DELAY: Duration = Duration::from_millis(150);

enum WatchMessage {
    Fs(notify::Result<Event>),
    Stop,
}

/// Running watch thread.
pub struct WatchHandle {
    tx: Sender<WatchMessage>,
    thread: JoinHandle<Pipeline>,
    snapshot: Snapshot,
}

impl WatchHandle {
    /// Lock-free view of the latest instance summaries.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Stop the thread after any in-flight session and hand the pipeline
    /// back.
    pub fn stop(self) -> Result<Pipeline> {
        // A closed channel means the thread already exited.
        let _ = self.tx.send(WatchMessage::Stop);
        self.thread
            .join()
            .map_err(|_| anyhow::anyhow!("watch thread panicked"))
    }
}

/// Start watching everything `pipeline` depends on.
///
/// Initial watches are in place when this returns.
pub fn spawn(pipeline: Pipeline) -> Result<WatchHandle> {
    let (tx, rx) = mpsc::channel();
    let fs_tx = tx.clone();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = fs_tx.send(WatchMessage::Fs(res));
    })
    .context("Failed to create file watcher")?;

    let mut watched = BTreeSet::new();
    sync_watches(&mut watcher, &mut watched, pipeline.watch_dirs());
    log!("watch"; "watching {} directories", watched.len());

    let snapshot = pipeline.snapshot();
    let thread = thread::Builder::new()
        .name("inliner-watch".into())
        .spawn(move || run(pipeline, watcher, watched, &rx))
        .context("Failed to spawn watch thread")?;

    Ok(WatchHandle {
        tx,
        thread,
        snapshot,
    })
}

fn run(
    mut pipeline: Pipeline,
    mut watcher: impl Watcher,
    mut watched: BTreeSet<PathBuf>,
    rx: &Receiver<WatchMessage>,
) -> Pipeline {
    // The handle keeps a sender alive, so `recv` only fails once it is gone.
    while let Ok(WatchMessage::Fs(first)) = rx.recv() {
        let mut batch = Vec::new();
        collect(first, &mut batch);

        thread::sleep(DRAIN_DELAY);
        let mut stop = false;
        for message in rx.try_iter() {
            match message {
                WatchMessage::Fs(res) => collect(res, &mut batch),
                WatchMessage::Stop => {
                    stop = true;
                    break;
                }
            }
        }
        if stop {
            break;
        }
        if batch.is_empty() {
            continue;
        }

        let report = pipeline.apply_session(&batch);
        if !report.is_empty() {
            log!(
                "watch";
                "{} events: {} rebuilt, {} new, {} removed",
                batch.len(),
                report.rebuilt.len(),
                report.created.len(),
                report.removed.len()
            );
        }
        sync_watches(&mut watcher, &mut watched, pipeline.watch_dirs());
    }

    pipeline
}

fn collect(res: notify::Result<Event>, batch: &mut Vec<FsEvent>) {
    match res {
        Ok(event) => batch.extend(
            map_event(&event)
                .into_iter()
                .filter(|e| !is_temp_file(&e.path)),
        ),
        Err(e) => log!("watch"; "error: {e}"),
    }
}

/// Translate a notify event. Renames become a delete of the old name and a
/// create of the new one.
fn map_event(event: &Event) -> Vec<FsEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => FsEventKind::Created,
        EventKind::Remove(_) => FsEventKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => FsEventKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => FsEventKind::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            return match event.paths.as_slice() {
                [from, to] => vec![
                    FsEvent::new(FsEventKind::Deleted, from),
                    FsEvent::new(FsEventKind::Created, to),
                ],
                _ => Vec::new(),
            };
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => FsEventKind::Modified,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .map(|path| FsEvent::new(kind, path))
        .collect()
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
}

/// Bring the watched set in line with `wanted`.
///
/// Directories that do not exist yet are skipped and retried after the next
/// session.
fn sync_watches(
    watcher: &mut impl Watcher,
    watched: &mut BTreeSet<PathBuf>,
    wanted: BTreeSet<PathBuf>,
) {
    let stale: Vec<PathBuf> = watched.difference(&wanted).cloned().collect();
    for dir in stale {
        // Fails for directories that are already gone.
        let _ = watcher.unwatch(&dir);
        watched.remove(&dir);
    }

    for dir in wanted {
        if watched.contains(&dir) || !dir.is_dir() {
            continue;
        }
        match watcher.watch(&dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                watched.insert(dir);
            }
            Err(e) => log!("watch"; "cannot watch {}: {e}", dir.display()),
        }
    }
}
