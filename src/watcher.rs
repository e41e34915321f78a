//! Dev-loop file watcher (external collaborator to C9).
//!
//! Watches the content root and publishes [`crate::incremental::FileChange`]
//! events to a broadcast channel after debouncing raw filesystem events.
//! Structured the same way the ancestor desktop app's watcher publishes
//! `FileEvent`s for its indexer: a debouncer callback classifies and
//! forwards, subscribers drain independently.

use crate::config::{DEBOUNCE_INTERVAL, DEFAULT_EVENT_CHANNEL_CAPACITY};
use crate::error::Result;
use crate::incremental::{ChangeKind, FileChange};
use crate::utils::is_markdown_file;
use notify_debouncer_full::{
    new_debouncer,
    notify::{
        event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
        EventKind, RecommendedWatcher, RecursiveMode,
    },
    DebounceEventResult, DebouncedEvent, Debouncer, FileIdMap,
};
use std::path::Path;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Watches a content root for changes, debounces them, and republishes
/// them as [`FileChange`]s. Stops watching when dropped.
pub struct Watcher {
    debouncer: Option<Debouncer<RecommendedWatcher, FileIdMap>>,
    sender: broadcast::Sender<FileChange>,
}

impl Watcher {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
        Self { debouncer: None, sender }
    }

    /// Starts watching `root` recursively. Replacing an already-started
    /// watcher first drops the old debouncer, which stops its thread.
    pub fn start(&mut self, root: &Path) -> Result<()> {
        self.debouncer = None;

        let sender = self.sender.clone();
        let mut debouncer = new_debouncer(DEBOUNCE_INTERVAL, None, move |result: DebounceEventResult| match result {
            Ok(events) => dispatch(&sender, events),
            Err(errors) => {
                for err in errors {
                    error!(?err, "file watcher error");
                }
            }
        })?;

        notify::Watcher::watch(debouncer.watcher(), root, RecursiveMode::Recursive)?;
        self.debouncer = Some(debouncer);
        info!(root = %root.display(), "file watcher started");
        Ok(())
    }

    /// Subscribes to the stream of changes. Call this before `start` races
    /// the first events, or accept that events published before
    /// subscribing are missed (there are no subscribers to miss them for).
    pub fn subscribe(&self) -> broadcast::Receiver<FileChange> {
        self.sender.subscribe()
    }
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Paths the incremental driver's classification (§4.9) cares about:
/// Markdown files, `leafpress.json`, `style.css`, and anything under
/// `static/`. Anything else is dropped here rather than forwarded, since
/// `incremental::rebuild` would ignore it anyway.
fn is_relevant(path: &Path) -> bool {
    if is_markdown_file(path) {
        return true;
    }
    match path.file_name().and_then(|n| n.to_str()) {
        Some("leafpress.json") | Some("style.css") => true,
        _ => path.components().any(|c| c.as_os_str() == "static"),
    }
}

fn dispatch(sender: &broadcast::Sender<FileChange>, events: Vec<DebouncedEvent>) {
    for event in events {
        let changes = classify(&event);
        for change in changes {
            if sender.send(change).is_err() {
                warn!("no subscribers for file change event");
            }
        }
    }
}

fn classify(event: &DebouncedEvent) -> Vec<FileChange> {
    match event.kind {
        EventKind::Create(CreateKind::File) => event
            .paths
            .iter()
            .filter(|p| is_relevant(p))
            .map(|p| FileChange { path: p.clone(), kind: ChangeKind::Create })
            .collect(),

        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => event
            .paths
            .iter()
            .filter(|p| is_relevant(p))
            .map(|p| FileChange { path: p.clone(), kind: ChangeKind::Modify })
            .collect(),

        EventKind::Remove(RemoveKind::File) => event
            .paths
            .iter()
            .filter(|p| is_relevant(p))
            .map(|p| FileChange { path: p.clone(), kind: ChangeKind::Delete })
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let from = &event.paths[0];
            let to = &event.paths[1];
            let mut changes = Vec::new();
            if is_relevant(from) {
                changes.push(FileChange { path: from.clone(), kind: ChangeKind::Delete });
            }
            if is_relevant(to) {
                changes.push(FileChange { path: to.clone(), kind: ChangeKind::Create });
            }
            changes
        }

        _ => Vec::new(),
    }
}
