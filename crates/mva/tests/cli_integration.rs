//! CLI integration tests for the mva command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Argument parsing works as expected
//! - Config-driven commands behave against a temporary config directory
//!
//! No test needs rclone: uploads go through `true`/`false` where needed.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the mva binary with an isolated config directory.
fn mva(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mva").unwrap();
    cmd.env("MVA_CONFIG_DIR", config_dir);
    cmd
}

/// Write a config with one watched directory and return (config dir, watch dir).
fn write_config(tmp: &TempDir, upload_command: &str) -> (PathBuf, PathBuf) {
    let config_dir = tmp.path().join("config");
    let watch_dir = tmp.path().join("watch");
    fs::create_dir_all(&config_dir).unwrap();

    let yaml = format!(
        r#"directories:
  - directory: {watch}
    at: "0 2 * * *"
    format: "archived-{{filename}}.{{ext}}"
    compress: tar.gz
    destination: "remote:archive"
daemon:
  upload:
    command: "{upload_command}"
  temp_dir: {temp}
"#,
        watch = watch_dir.display(),
        temp = tmp.path().join("work").display(),
    );
    fs::write(config_dir.join("config.yml"), yaml).unwrap();
    (config_dir, watch_dir)
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    mva(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mva"))
        .stdout(predicate::str::contains("rclone"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    mva(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mva"));
}

#[test]
fn test_help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    mva(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("archive"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("setup-directories"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let tmp = TempDir::new().unwrap();
    mva(tmp.path()).arg("frobnicate").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Parsing Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_archive_requires_files() {
    let tmp = TempDir::new().unwrap();
    mva(tmp.path())
        .args(["archive", "-d", "remote:archive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FILES"));
}

#[test]
fn test_archive_requires_destination() {
    let tmp = TempDir::new().unwrap();
    mva(tmp.path())
        .args(["archive", "a.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--destination"));
}

#[test]
fn test_verbose_flag_accepted() {
    let tmp = TempDir::new().unwrap();
    mva(tmp.path()).args(["--verbose", "--help"]).assert().success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_init_creates_config_once() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("cfg");

    mva(&config_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("config.yml"))
        .stdout(predicate::str::contains("gdrive:archive"));

    let written = fs::read_to_string(config_dir.join("config.yml")).unwrap();
    assert!(written.contains("directory:"));
    assert!(written.contains("azure:backup"));

    mva(&config_dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_init_with_explicit_config_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("elsewhere").join("mva.yml");

    mva(tmp.path())
        .args(["--config", path.to_str().unwrap(), "init"])
        .assert()
        .success();
    assert!(path.is_file());
}

#[test]
fn test_status_without_config_suggests_init() {
    let tmp = TempDir::new().unwrap();
    mva(tmp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("mva init"));
}

#[test]
fn test_status_reports_directories() {
    let tmp = TempDir::new().unwrap();
    let (config_dir, watch_dir) = write_config(&tmp, "true");

    mva(&config_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("remote:archive"))
        .stdout(predicate::str::contains("directory missing"));

    fs::create_dir_all(&watch_dir).unwrap();
    fs::write(watch_dir.join("one.txt"), b"1").unwrap();
    fs::write(watch_dir.join("two.txt"), b"2").unwrap();

    let output = mva(&config_dir)
        .args(["status", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["directories"][0]["destination"], "remote:archive");
    assert_eq!(json["directories"][0]["compression"], "tar.gz");
    assert_eq!(json["directories"][0]["pending_files"], 2);
}

#[test]
fn test_status_rejects_invalid_schedule() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.yml"),
        "directories:\n  - directory: /tmp/x\n    at: \"0 2 * *\"\n    format: \"{filename}\"\n    compress: tar.gz\n    destination: \"r:a\"\n",
    )
    .unwrap();

    mva(&config_dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("0 2 * *"));
}

#[test]
fn test_setup_directories_creates_watch_dirs() {
    let tmp = TempDir::new().unwrap();
    let (config_dir, watch_dir) = write_config(&tmp, "true");

    mva(&config_dir)
        .arg("setup-directories")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created watch directory"));
    assert!(watch_dir.is_dir());
}

// ─────────────────────────────────────────────────────────────────────────────
// Manual Archive
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_archive_unknown_destination_fails() {
    let tmp = TempDir::new().unwrap();
    let (config_dir, _) = write_config(&tmp, "true");

    mva(&config_dir)
        .args(["archive", "whatever.txt", "-d", "nowhere:else"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere:else"));
}

#[test]
fn test_archive_missing_file_fails() {
    let tmp = TempDir::new().unwrap();
    let (config_dir, _) = write_config(&tmp, "true");

    mva(&config_dir)
        .args(["archive", "/definitely/not/here.txt", "-d", "remote:archive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[cfg(unix)]
#[test]
fn test_archive_succeeds_and_removes_original() {
    let tmp = TempDir::new().unwrap();
    let (config_dir, watch_dir) = write_config(&tmp, "true");
    fs::create_dir_all(&watch_dir).unwrap();
    let file = watch_dir.join("report.pdf");
    fs::write(&file, b"0123456789").unwrap();

    mva(&config_dir)
        .args(["archive", file.to_str().unwrap(), "-d", "remote:archive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("archived-report.pdf.tar.gz"));

    assert!(!file.exists());
}

#[cfg(unix)]
#[test]
fn test_archive_upload_failure_keeps_original() {
    let tmp = TempDir::new().unwrap();
    let (config_dir, watch_dir) = write_config(&tmp, "false");
    fs::create_dir_all(&watch_dir).unwrap();
    let file = watch_dir.join("report.pdf");
    fs::write(&file, b"0123456789").unwrap();

    mva(&config_dir)
        .args(["archive", file.to_str().unwrap(), "-d", "remote:archive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 1 files"));

    assert_eq!(fs::read(&file).unwrap(), b"0123456789");
}

#[cfg(unix)]
#[test]
fn test_archive_processes_remaining_files_after_missing_one() {
    let tmp = TempDir::new().unwrap();
    let (config_dir, watch_dir) = write_config(&tmp, "true");
    fs::create_dir_all(&watch_dir).unwrap();
    let present = watch_dir.join("present.txt");
    fs::write(&present, b"here").unwrap();

    mva(&config_dir)
        .args([
            "archive",
            "/definitely/not/here.txt",
            present.to_str().unwrap(),
            "-d",
            "remote:archive",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Archived"))
        .stderr(predicate::str::contains("1 of 2 files"));

    assert!(!present.exists());
}
