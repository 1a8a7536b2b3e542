//! The daemon supervisor.
//!
//! Owns one [`DirectorySession`] per configured directory and starts and
//! stops them as a unit.
//!
//! ```text
//! Stopped ──start()──▶ Starting ──▶ Running ──stop()──▶ Stopping ──▶ Stopped
//!                         │
//!                         └── any session fails: started sessions stopped, back to Stopped
//! ```

use std::fmt;
use std::sync::Arc;

use mva_archive::{ArchivePipeline, PipelineConfig, SharedUploader};
use mva_config::{DirectoryConfig, MvaConfig};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info};

use crate::dedup::TaskDeduplicator;
use crate::error::{DaemonError, Result};
use crate::session::{DirectorySession, SessionContext};

/// Lifecycle state of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonState::Stopped => write!(f, "stopped"),
            DaemonState::Starting => write!(f, "starting"),
            DaemonState::Running => write!(f, "running"),
            DaemonState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaemonStatus {
    pub state: DaemonState,
    pub running: bool,
    /// Active directory sessions.
    pub sessions: usize,
    /// Armed schedules.
    pub schedules: usize,
    /// Paths currently being archived.
    pub in_flight: usize,
}

/// Owns the set of directory sessions.
pub struct Supervisor {
    config: MvaConfig,
    context: SessionContext,
    state: Mutex<DaemonState>,
    sessions: Mutex<Arc<Vec<DirectorySession>>>,
}

impl Supervisor {
    /// Create a supervisor whose pipeline uploads through `uploader`.
    pub fn new(config: MvaConfig, uploader: SharedUploader) -> Self {
        let pipeline = ArchivePipeline::new(
            PipelineConfig {
                temp_root: config.daemon.effective_temp_dir(),
            },
            uploader,
        );
        let context = SessionContext::new(pipeline, &config.daemon);
        Self::with_context(config, context)
    }

    /// Create a supervisor with explicit session collaborators.
    pub fn with_context(config: MvaConfig, context: SessionContext) -> Self {
        Self {
            config,
            context,
            state: Mutex::new(DaemonState::Stopped),
            sessions: Mutex::new(Arc::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &MvaConfig {
        &self.config
    }

    pub fn state(&self) -> DaemonState {
        *self.state.lock()
    }

    pub fn deduplicator(&self) -> &TaskDeduplicator {
        &self.context.dedup
    }

    /// Start one session per configured directory.
    ///
    /// Missing directories are created. If any session fails to start, the
    /// sessions already started are stopped and the error is returned.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != DaemonState::Stopped {
                return Err(DaemonError::AlreadyRunning);
            }
            *state = DaemonState::Starting;
        }

        info!(directories = self.config.directories.len(), "starting daemon");

        let mut started = Vec::with_capacity(self.config.directories.len());
        for dir in &self.config.directories {
            match self.start_session(dir).await {
                Ok(session) => started.push(session),
                Err(e) => {
                    error!(dir = %dir.path.display(), error = %e, "failed to start session");
                    for session in &started {
                        session.stop().await;
                    }
                    *self.state.lock() = DaemonState::Stopped;
                    return Err(e);
                }
            }
        }

        *self.sessions.lock() = Arc::new(started);
        *self.state.lock() = DaemonState::Running;
        info!("daemon running");
        Ok(())
    }

    async fn start_session(&self, dir: &DirectoryConfig) -> Result<DirectorySession> {
        tokio::fs::create_dir_all(&dir.path)
            .await
            .map_err(|source| DaemonError::CreateDir {
                path: dir.path.clone(),
                source,
            })?;
        DirectorySession::start(dir.clone(), self.context.clone()).await
    }

    /// Stop every session. A no-op when already stopped.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            match *state {
                DaemonState::Stopped => return Ok(()),
                DaemonState::Running => *state = DaemonState::Stopping,
                other => {
                    return Err(DaemonError::InvalidTransition {
                        action: "stop",
                        state: other,
                    });
                }
            }
        }

        info!("stopping daemon");

        let sessions = std::mem::take(&mut *self.sessions.lock());
        for session in sessions.iter() {
            session.stop().await;
        }

        *self.state.lock() = DaemonState::Stopped;
        info!("daemon stopped");
        Ok(())
    }

    /// Current status. Read-only.
    pub fn status(&self) -> DaemonStatus {
        let state = self.state();
        let sessions = self.sessions.lock().clone();
        DaemonStatus {
            state,
            running: state == DaemonState::Running,
            sessions: sessions.iter().filter(|s| s.is_active()).count(),
            schedules: sessions.iter().filter(|s| s.has_schedule()).count(),
            in_flight: self.context.dedup.len(),
        }
    }

    /// Snapshot of the running sessions.
    pub fn sessions(&self) -> Arc<Vec<DirectorySession>> {
        self.sessions.lock().clone()
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("state", &self.state())
            .field("directories", &self.config.directories.len())
            .finish_non_exhaustive()
    }
}
