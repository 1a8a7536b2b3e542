//! Integration tests for sessions and the supervisor.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mva_archive::{ArchivePipeline, MockUploader, PipelineConfig};
use mva_config::{DaemonSettings, DirectoryConfig, MvaConfig};
use mva_daemon::{
    CandidateOutcome, DaemonError, DaemonState, DirectorySession, SessionContext, SkipReason,
    StabilityDetector, StabilityVerdict, Supervisor, TaskDeduplicator,
};
use tempfile::TempDir;

struct Env {
    tmp: TempDir,
    mock: MockUploader,
}

impl Env {
    fn new(mock: MockUploader) -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
            mock,
        }
    }

    fn root(&self) -> PathBuf {
        self.tmp.path().canonicalize().unwrap()
    }

    fn watch_dir(&self, name: &str) -> PathBuf {
        let dir = self.root().join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn context(&self, initial: u64, resample: u64) -> SessionContext {
        SessionContext {
            pipeline: ArchivePipeline::new(
                PipelineConfig {
                    temp_root: self.root().join("work"),
                },
                Arc::new(self.mock.clone()),
            ),
            dedup: TaskDeduplicator::new(),
            stability: StabilityDetector::new(
                Duration::from_millis(initial),
                Duration::from_millis(resample),
            ),
            initial_scan: false,
            event_buffer: 32,
        }
    }
}

fn directory(path: &Path, compression: &str) -> DirectoryConfig {
    DirectoryConfig {
        path: path.to_path_buf(),
        schedule: "0 2 * * *".to_string(),
        naming_template: "{filename}.{ext}".to_string(),
        compression: compression.to_string(),
        destination: "remote:archive".to_string(),
    }
}

async fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    cond()
}

#[tokio::test]
async fn test_event_and_forced_sweep_archive_once() {
    let env = Env::new(MockUploader::new());
    let dir = env.watch_dir("in");
    // long enough that the sweep lands inside the event task's stability wait
    let ctx = env.context(600, 300);

    let session = DirectorySession::start(directory(&dir, "tar.gz"), ctx.clone())
        .await
        .unwrap();

    let file = dir.join("report.pdf");
    fs::write(&file, b"0123456789").unwrap();

    assert!(
        wait_until(Duration::from_secs(5), || ctx.dedup.is_in_flight(&file)).await,
        "event task should hold the file"
    );
    let report = session.sweep_now().await;
    assert_eq!(report.skipped, 1);
    assert_eq!(report.archived, 0);
    assert_eq!(report.failed, 0);
    assert!(file.exists(), "sweep must not touch a held file");

    let mock = env.mock.clone();
    assert!(
        wait_until(Duration::from_secs(5), || mock.upload_count() == 1 && ctx.dedup.is_empty())
            .await,
        "event task should archive the file"
    );
    session.stop().await;

    assert_eq!(env.mock.upload_count(), 1);
    assert_eq!(env.mock.uploads()[0].file_name, "report.pdf.tar.gz");
    assert!(!file.exists());
}

#[tokio::test]
async fn test_event_trigger_archives_new_file() {
    let env = Env::new(MockUploader::new());
    let dir = env.watch_dir("in");
    let session = DirectorySession::start(directory(&dir, "none"), env.context(20, 20))
        .await
        .unwrap();

    let file = dir.join("photo.jpg");
    fs::write(&file, b"jpeg").unwrap();

    let mock = env.mock.clone();
    assert!(wait_until(Duration::from_secs(5), || mock.upload_count() == 1).await);
    assert!(wait_until(Duration::from_secs(5), || !file.exists()).await);
    session.stop().await;

    let uploads = env.mock.uploads();
    assert_eq!(uploads[0].file_name, "photo.jpg");
    assert_eq!(uploads[0].contents, b"jpeg");
}

#[tokio::test]
async fn test_unstable_file_is_not_archived() {
    let env = Env::new(MockUploader::new());
    let dir = env.watch_dir("in");
    // written before the watcher is armed, so only submit() sees it
    let file = dir.join("growing.log");
    fs::write(&file, b"part one").unwrap();

    let session = DirectorySession::start(directory(&dir, "none"), env.context(0, 400))
        .await
        .unwrap();

    let writer = {
        let file = file.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            use std::io::Write;
            let mut f = fs::OpenOptions::new().append(true).open(&file).unwrap();
            f.write_all(b", part two").unwrap();
        })
    };

    let outcome = session.submit(&file).await;
    writer.await.unwrap();

    match outcome {
        CandidateOutcome::Skipped(SkipReason::Unstable(StabilityVerdict::Changed { .. })) => {}
        other => panic!("Expected unstable skip, got: {other:?}"),
    }
    assert!(file.exists());

    session.stop().await;
}

#[tokio::test]
async fn test_startup_scan_picks_up_existing_files() {
    let env = Env::new(MockUploader::new());
    let dir = env.watch_dir("in");
    fs::write(dir.join("old.txt"), b"old").unwrap();
    fs::write(dir.join(".hidden"), b"hidden").unwrap();

    let mut ctx = env.context(20, 20);
    ctx.initial_scan = true;
    let session = DirectorySession::start(directory(&dir, "none"), ctx).await.unwrap();

    let old = dir.join("old.txt");
    assert!(wait_until(Duration::from_secs(5), || !old.exists()).await);
    session.stop().await;

    assert_eq!(env.mock.upload_count(), 1);
    assert!(dir.join(".hidden").exists());
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_work() {
    let env = Env::new(MockUploader::new());
    let dir = env.watch_dir("in");
    let session = DirectorySession::start(directory(&dir, "none"), env.context(20, 20))
        .await
        .unwrap();

    fs::write(dir.join("a.txt"), b"a").unwrap();
    let mock = env.mock.clone();
    assert!(wait_until(Duration::from_secs(5), || mock.upload_count() == 1).await);

    session.stop().await;
    // nothing runs after stop returns
    fs::write(dir.join("b.txt"), b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(env.mock.upload_count(), 1);
    assert!(dir.join("b.txt").exists());
}

fn supervisor_config(env: &Env, dirs: &[PathBuf]) -> MvaConfig {
    let mut daemon = DaemonSettings::default();
    daemon.temp_dir = Some(env.root().join("work"));
    daemon.initial_scan = false;
    MvaConfig {
        directories: dirs
            .iter()
            .enumerate()
            .map(|(i, p)| DirectoryConfig {
                destination: format!("remote{i}:archive"),
                ..directory(p, "tar.gz")
            })
            .collect(),
        daemon,
    }
}

#[tokio::test]
async fn test_supervisor_lifecycle() {
    let env = Env::new(MockUploader::new());
    let a = env.root().join("a");
    let b = env.root().join("nested").join("b");
    let sup = Supervisor::new(
        supervisor_config(&env, &[a.clone(), b.clone()]),
        Arc::new(env.mock.clone()),
    );

    sup.start().await.unwrap();
    assert!(a.is_dir(), "missing directories are created");
    assert!(b.is_dir());

    let status = sup.status();
    assert_eq!(status.state, DaemonState::Running);
    assert!(status.running);
    assert_eq!(status.sessions, 2);
    assert_eq!(status.schedules, 2);

    assert!(matches!(sup.start().await, Err(DaemonError::AlreadyRunning)));

    let mut probes = env.mock.probes();
    probes.sort();
    assert_eq!(probes, vec!["remote0:archive", "remote1:archive"]);

    sup.stop().await.unwrap();
    let status = sup.status();
    assert_eq!(status.state, DaemonState::Stopped);
    assert!(!status.running);
    assert_eq!(status.sessions, 0);
    assert_eq!(status.schedules, 0);

    // idempotent, and restartable
    sup.stop().await.unwrap();
    sup.start().await.unwrap();
    assert_eq!(sup.status().sessions, 2);
    sup.stop().await.unwrap();
}

#[tokio::test]
async fn test_supervisor_rolls_back_on_failed_session() {
    let env = Env::new(MockUploader::new());
    let good = env.root().join("good");
    // a regular file where a directory is expected
    let blocked = env.root().join("blocked");
    fs::write(&blocked, b"not a dir").unwrap();

    let sup = Supervisor::new(
        supervisor_config(&env, &[good.clone(), blocked.clone()]),
        Arc::new(env.mock.clone()),
    );

    let err = sup.start().await.unwrap_err();
    assert!(matches!(err, DaemonError::CreateDir { .. }));
    assert_eq!(sup.state(), DaemonState::Stopped);
    assert_eq!(sup.status().sessions, 0);

    // the good session was torn down: new files are left alone
    fs::write(good.join("late.txt"), b"late").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(env.mock.upload_count(), 0);
}

#[tokio::test]
async fn test_supervisor_shares_deduplicator() {
    let env = Env::new(MockUploader::new());
    let a = env.root().join("a");
    let sup = Supervisor::new(supervisor_config(&env, &[a.clone()]), Arc::new(env.mock.clone()));
    sup.start().await.unwrap();

    let file = a.join("held.txt");
    let guard = sup.deduplicator().try_acquire(&file).unwrap();
    fs::write(&file, b"held").unwrap();
    // let the create event arrive and be dropped as in flight
    tokio::time::sleep(Duration::from_millis(200)).await;

    let sessions = sup.sessions();
    let report = sessions[0].sweep_now().await;
    assert_eq!(report.skipped, 1);
    assert_eq!(report.archived, 0);
    assert!(file.exists());

    drop(guard);
    let report = sessions[0].sweep_now().await;
    assert_eq!(report.archived, 1);
    assert!(!file.exists());

    sup.stop().await.unwrap();
}
