//! Per-directory archiving session.
//!
//! A session binds one [`DirectoryConfig`] to two trigger sources:
//!
//! - **Event trigger**: new direct children reported by the
//!   [`DirectoryWatcher`]. Each candidate runs as its own task and waits for
//!   the [`StabilityDetector`] before archiving.
//! - **Time trigger**: the directory's cron schedule. Each sweep lists every
//!   regular file and archives them one after another, without the
//!   stability wait.
//!
//! Both go through the shared [`TaskDeduplicator`], so a file seen by both
//! is archived at most once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mva_archive::{ArchiveError, ArchivePipeline, ArchiveReceipt, ArchiveTask, Trigger};
use mva_config::{DaemonSettings, DirectoryConfig};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::dedup::TaskDeduplicator;
use crate::error::{DaemonError, Result};
use crate::scheduler::ScheduleTrigger;
use crate::stability::{FileFingerprint, StabilityDetector, StabilityVerdict};
use crate::watcher::{DirectoryWatcher, WatcherHandle, is_hidden, rebase_child};

/// Collaborators shared by every session of a supervisor.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub pipeline: ArchivePipeline,
    pub dedup: TaskDeduplicator,
    pub stability: StabilityDetector,
    /// Route files already present at start through the event path.
    pub initial_scan: bool,
    pub event_buffer: usize,
}

impl SessionContext {
    pub fn new(pipeline: ArchivePipeline, settings: &DaemonSettings) -> Self {
        Self {
            pipeline,
            dedup: TaskDeduplicator::new(),
            stability: StabilityDetector::from_settings(&settings.stability),
            initial_scan: settings.initial_scan,
            event_buffer: settings.event_buffer,
        }
    }
}

/// Why a candidate was dropped without running the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Another task holds the path.
    InFlight,
    /// Failed the stability check.
    Unstable(StabilityVerdict),
    /// Dot-prefixed name on the event path.
    Hidden,
    /// Not a direct child of the session's directory.
    OutsideDirectory,
    /// Session stopped before the pipeline started.
    Stopping,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InFlight => write!(f, "already in flight"),
            SkipReason::Unstable(verdict) => write!(f, "{}", verdict.reason()),
            SkipReason::Hidden => write!(f, "hidden file"),
            SkipReason::OutsideDirectory => write!(f, "not a direct child"),
            SkipReason::Stopping => write!(f, "session stopping"),
        }
    }
}

/// Result of routing one candidate through a session.
#[derive(Debug)]
pub enum CandidateOutcome {
    Archived(ArchiveReceipt),
    Skipped(SkipReason),
    Failed(ArchiveError),
}

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub archived: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: &CandidateOutcome) {
        match outcome {
            CandidateOutcome::Archived(_) => self.archived += 1,
            CandidateOutcome::Failed(_) => self.failed += 1,
            CandidateOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    /// Files looked at.
    pub fn total(&self) -> usize {
        self.archived + self.failed + self.skipped
    }
}

struct SessionInner {
    config: Arc<DirectoryConfig>,
    ctx: SessionContext,
    cancel: CancellationToken,
    tracker: TaskTracker,
    schedule_armed: AtomicBool,
}

/// A running session for one watched directory.
pub struct DirectorySession {
    inner: Arc<SessionInner>,
    watcher: Mutex<Option<WatcherHandle>>,
}

impl DirectorySession {
    /// Arm the watcher and the schedule for `config`.
    ///
    /// The destination is probed first; a failed probe is logged and the
    /// session starts anyway. The directory must already exist.
    pub async fn start(config: DirectoryConfig, ctx: SessionContext) -> Result<Self> {
        let schedule = config
            .parsed_schedule()
            .map_err(|source| DaemonError::Config {
                path: config.path.clone(),
                source,
            })?;

        match ctx.pipeline.uploader().probe(&config.destination).await {
            Ok(()) => debug!(destination = %config.destination, "destination reachable"),
            Err(e) => warn!(
                dir = %config.path.display(),
                destination = %config.destination,
                error = %e,
                "destination probe failed, continuing"
            ),
        }

        let (events, watcher) = DirectoryWatcher::new(&config.path)
            .with_buffer(ctx.event_buffer)
            .start()?;

        let inner = Arc::new(SessionInner {
            config: Arc::new(config),
            ctx,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            schedule_armed: AtomicBool::new(true),
        });

        inner.tracker.spawn(inner.clone().event_loop(events));

        let trigger = ScheduleTrigger::new(schedule);
        let this = inner.clone();
        inner.tracker.spawn(async move {
            let sweeper = this.clone();
            trigger
                .run(this.cancel.clone(), move || {
                    let sweeper = sweeper.clone();
                    async move {
                        sweeper.sweep(Trigger::Schedule).await;
                    }
                })
                .await;
            this.schedule_armed.store(false, Ordering::SeqCst);
        });

        if inner.ctx.initial_scan {
            let this = inner.clone();
            inner.tracker.spawn(async move { this.startup_scan().await });
        }

        info!(
            dir = %inner.config.path.display(),
            schedule = %inner.config.schedule,
            destination = %inner.config.destination,
            "session started"
        );

        Ok(Self {
            inner,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.inner.config
    }

    pub fn path(&self) -> &Path {
        &self.inner.config.path
    }

    /// Whether the session has not been stopped.
    pub fn is_active(&self) -> bool {
        !self.inner.cancel.is_cancelled()
    }

    /// Whether the time trigger is still armed.
    pub fn has_schedule(&self) -> bool {
        self.is_active() && self.inner.schedule_armed.load(Ordering::SeqCst)
    }

    pub fn watcher_running(&self) -> bool {
        self.watcher
            .lock()
            .as_ref()
            .map(WatcherHandle::is_running)
            .unwrap_or(false)
    }

    /// Run a sweep now, as the schedule would.
    pub async fn sweep_now(&self) -> SweepReport {
        self.inner.sweep(Trigger::Schedule).await
    }

    /// Route one path through the event path: dedup, stability, pipeline.
    pub async fn submit(&self, path: &Path) -> CandidateOutcome {
        self.inner.process_candidate(path, Trigger::Event).await
    }

    /// Close the watcher, cancel the schedule and wait for in-flight tasks.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        if let Some(mut watcher) = self.watcher.lock().take() {
            watcher.close();
        }

        self.inner.tracker.close();
        self.inner.tracker.wait().await;

        info!(dir = %self.inner.config.path.display(), "session stopped");
    }
}

impl fmt::Debug for DirectorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorySession")
            .field("path", &self.inner.config.path)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl SessionInner {
    async fn event_loop(self: Arc<Self>, mut events: mpsc::Receiver<PathBuf>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = events.recv() => match next {
                    Some(path) => self.spawn_candidate(path, Trigger::Event),
                    None => {
                        warn!(dir = %self.config.path.display(), "watcher channel closed");
                        break;
                    }
                },
            }
        }
    }

    fn spawn_candidate(self: &Arc<Self>, path: PathBuf, trigger: Trigger) {
        let this = self.clone();
        self.tracker.spawn(async move {
            this.process_candidate(&path, trigger).await;
        });
    }

    async fn startup_scan(self: Arc<Self>) {
        let files = match list_regular_files(&self.config.path).await {
            Ok(files) => files,
            Err(e) => {
                error!(dir = %self.config.path.display(), error = %e, "startup scan failed");
                return;
            }
        };

        let files: Vec<PathBuf> = files.into_iter().filter(|p| !is_hidden(p)).collect();
        if !files.is_empty() {
            info!(dir = %self.config.path.display(), count = files.len(), "found files at startup");
        }
        for path in files {
            self.spawn_candidate(path, Trigger::StartupScan);
        }
    }

    async fn sweep(&self, trigger: Trigger) -> SweepReport {
        let mut report = SweepReport::default();
        let dir = &self.config.path;

        let files = match list_regular_files(dir).await {
            Ok(files) => files,
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "failed to list directory for sweep");
                return report;
            }
        };

        info!(dir = %dir.display(), count = files.len(), "sweep started");

        for path in files {
            if self.cancel.is_cancelled() {
                debug!(dir = %dir.display(), "sweep interrupted by stop");
                break;
            }
            let outcome = self.process_candidate(&path, trigger).await;
            report.record(&outcome);
        }

        info!(
            dir = %dir.display(),
            archived = report.archived,
            failed = report.failed,
            skipped = report.skipped,
            "sweep finished"
        );
        report
    }

    async fn process_candidate(&self, path: &Path, trigger: Trigger) -> CandidateOutcome {
        let outcome = self.run_candidate(path, trigger).await;
        if let CandidateOutcome::Skipped(reason) = &outcome {
            debug!(path = %path.display(), %trigger, %reason, "candidate skipped");
        }
        outcome
    }

    async fn run_candidate(&self, path: &Path, trigger: Trigger) -> CandidateOutcome {
        let event_path = matches!(trigger, Trigger::Event | Trigger::StartupScan);

        let Some(path) = self.own_child(path) else {
            return CandidateOutcome::Skipped(SkipReason::OutsideDirectory);
        };
        let path = path.as_path();
        if event_path && is_hidden(path) {
            return CandidateOutcome::Skipped(SkipReason::Hidden);
        }

        let Some(_guard) = self.ctx.dedup.try_acquire(path) else {
            return CandidateOutcome::Skipped(SkipReason::InFlight);
        };

        if event_path {
            let verdict = tokio::select! {
                v = self.ctx.stability.check(path) => v,
                _ = self.cancel.cancelled() => {
                    return CandidateOutcome::Skipped(SkipReason::Stopping);
                }
            };
            if !verdict.is_stable() {
                return CandidateOutcome::Skipped(SkipReason::Unstable(verdict));
            }
        } else if let Err(verdict) = FileFingerprint::sample(path).await {
            // consumed by another trigger since the listing
            return CandidateOutcome::Skipped(SkipReason::Unstable(verdict));
        }

        let task = ArchiveTask::new(path, self.config.clone(), trigger);
        match self.ctx.pipeline.archive(&task).await {
            Ok(receipt) => CandidateOutcome::Archived(receipt),
            Err(e) => CandidateOutcome::Failed(e),
        }
    }

    /// `path` spelled under the configured directory, if it is a direct child.
    fn own_child(&self, path: &Path) -> Option<PathBuf> {
        let dir = &self.config.path;
        rebase_child(dir, std::slice::from_ref(dir), path).or_else(|| {
            let canonical = dir.canonicalize().ok()?;
            rebase_child(dir, &[canonical], path)
        })
    }
}

/// Regular-file direct children of `dir`, sorted by name.
pub async fn list_regular_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
