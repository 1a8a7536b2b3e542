//! Per-path in-flight tracking.
//!
//! Every trigger source must hold an [`InFlightGuard`] for a path before
//! running the pipeline on it. The guard releases the path on drop, so the
//! mark is cleared on success, failure, early return and panic alike.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Set of paths currently being archived.
///
/// Cloning shares the same set.
#[derive(Debug, Clone, Default)]
pub struct TaskDeduplicator {
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl TaskDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` in progress. `None` if another task already holds it.
    pub fn try_acquire(&self, path: &Path) -> Option<InFlightGuard> {
        let key = normalize(path);
        if self.in_flight.lock().insert(key.clone()) {
            Some(InFlightGuard {
                dedup: self.clone(),
                path: key,
            })
        } else {
            None
        }
    }

    /// Clear the mark on `path`. Returns whether it was set.
    pub fn release(&self, path: &Path) -> bool {
        self.in_flight.lock().remove(&normalize(path))
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.in_flight.lock().contains(&normalize(path))
    }

    /// Number of paths in flight.
    pub fn len(&self) -> usize {
        self.in_flight.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.lock().is_empty()
    }
}

/// Releases its path when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    dedup: TaskDeduplicator,
    path: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.dedup.release(&self.path);
    }
}

/// Absolute, lexically normalized form used as the map key.
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
