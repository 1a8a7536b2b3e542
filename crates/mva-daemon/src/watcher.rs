//! Filesystem monitoring for one watched directory.
//!
//! Watches a directory non-recursively and emits the path of every new
//! direct child: files created in place and files renamed or moved in.
//! Hidden (dot-prefixed) entries are ignored.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{WatcherError, WatcherResult};

/// Default channel buffer size for candidate paths.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Handle to a running directory watcher.
///
/// Dropping the handle also stops watching.
pub struct WatcherHandle {
    watcher: Option<RecommendedWatcher>,
    thread: std::thread::JoinHandle<()>,
}

impl WatcherHandle {
    /// Check if the forwarding thread is still running.
    pub fn is_running(&self) -> bool {
        self.watcher.is_some() && !self.thread.is_finished()
    }

    /// Stop watching. The forwarding thread exits once the notify backend
    /// has shut down; this call does not wait for it.
    pub fn close(&mut self) {
        self.watcher.take();
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("running", &self.is_running())
            .finish()
    }
}

/// Watches one directory for new files.
#[derive(Debug, Clone)]
pub struct DirectoryWatcher {
    dir: PathBuf,
    buffer_size: usize,
}

impl DirectoryWatcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            buffer_size: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Set the channel buffer size.
    pub fn with_buffer(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Start watching and return a receiver of candidate paths.
    ///
    /// The notify callback feeds a background thread which filters events
    /// and forwards candidates to the returned channel. The handle must be
    /// kept alive to continue watching.
    pub fn start(&self) -> WatcherResult<(mpsc::Receiver<PathBuf>, WatcherHandle)> {
        let (event_tx, event_rx) = mpsc::channel(self.buffer_size);
        let (notify_tx, notify_rx) = std::sync::mpsc::channel::<notify::Result<Event>>();

        let mut watcher = notify::recommended_watcher(notify_tx)
            .map_err(|e| WatcherError::InitFailed(e.to_string()))?;

        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::WatchFailed {
                path: self.dir.clone(),
                error: e.to_string(),
            })?;

        // Backends differ on whether they report the path as given or
        // canonicalized
        let mut roots = vec![self.dir.clone()];
        if let Ok(canonical) = self.dir.canonicalize()
            && canonical != self.dir
        {
            roots.push(canonical);
        }

        info!(dir = %self.dir.display(), "started directory watcher");

        let dir = self.dir.clone();
        let thread = std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(dir = %dir.display(), error = %e, "watcher error");
                        continue;
                    }
                };

                for path in candidate_paths(&event) {
                    if is_hidden(path) {
                        continue;
                    }
                    let Some(path) = rebase_child(&dir, &roots, path) else {
                        continue;
                    };
                    debug!(path = %path.display(), kind = ?event.kind, "new file observed");
                    if event_tx.blocking_send(path).is_err() {
                        debug!(dir = %dir.display(), "event receiver dropped, stopping watcher thread");
                        return;
                    }
                }
            }
            debug!(dir = %dir.display(), "watcher thread exiting");
        });

        Ok((
            event_rx,
            WatcherHandle {
                watcher: Some(watcher),
                thread,
            },
        ))
    }
}

/// Paths in `event` that may be new entries.
fn candidate_paths(event: &Event) -> Vec<&PathBuf> {
    match event.kind {
        EventKind::Create(_) => event.paths.iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().collect(),
        // [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event.paths.get(1).into_iter().collect(),
        // Backends that cannot tell the two sides apart
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().filter(|p| p.exists()).collect()
        }
        _ => Vec::new(),
    }
}

/// `path` re-rooted onto `dir` when it is a direct child of one of `roots`.
///
/// `roots` are spellings of `dir` (as configured, canonical). Every event
/// path comes out under `dir`, so the same file always has the same key.
pub fn rebase_child(dir: &Path, roots: &[PathBuf], path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    let name = path.file_name()?;
    roots.iter().any(|root| root == parent).then(|| dir.join(name))
}

/// Dot-prefixed file name.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
