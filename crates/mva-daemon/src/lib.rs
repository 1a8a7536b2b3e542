//! Directory sessions and the supervisor for the mva daemon.
//!
//! A [`Supervisor`] owns one [`DirectorySession`] per configured directory.
//! Each session feeds two trigger sources into the shared archive pipeline:
//!
//! ```text
//! DirectoryWatcher ──▶ TaskDeduplicator ──▶ StabilityDetector ──▶ ArchivePipeline
//! ScheduleTrigger  ──▶ TaskDeduplicator ─────────────────────────▶ ArchivePipeline
//! ```

pub mod dedup;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod stability;
pub mod supervisor;
pub mod watcher;

pub use dedup::{InFlightGuard, TaskDeduplicator};
pub use error::{DaemonError, Result, WatcherError, WatcherResult};
pub use scheduler::ScheduleTrigger;
pub use session::{
    CandidateOutcome, DirectorySession, SessionContext, SkipReason, SweepReport,
    list_regular_files,
};
pub use stability::{FileFingerprint, StabilityDetector, StabilityVerdict};
pub use supervisor::{DaemonState, DaemonStatus, Supervisor};
pub use watcher::{DirectoryWatcher, WatcherHandle};
