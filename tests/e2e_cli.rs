//! CLI end-to-end tests
//!
//! Tests for the bdscan command-line interface.

use assert_cmd::prelude::*;
use bdscan_disc::fixtures::{write_file, write_minimal_disc};
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the bdscan binary
#[allow(deprecated)]
fn bdscan_cmd() -> Command {
    let mut cmd = Command::cargo_bin("bdscan").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn sample_disc() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let root = dir.path().join("SAMPLE_DISC");
    write_minimal_disc(&root).unwrap();
    (dir, root)
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = bdscan_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = bdscan_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bdscan"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = bdscan_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("bdscan "));
}

#[test]
fn test_cli_scan_help() {
    let mut cmd = bdscan_cmd();
    cmd.args(["scan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scan a disc"))
        .stdout(predicate::str::contains("--stop-on-error"));
}

#[test]
fn test_cli_scan_text() {
    let (_dir, root) = sample_disc();
    let mut cmd = bdscan_cmd();
    cmd.arg("scan")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Disc:      SAMPLE_DISC"))
        .stdout(predicate::str::contains("Playlist 00000.MPLS  0:01:00"))
        .stdout(predicate::str::contains("Clip 00001.M2TS"));
}

#[test]
fn test_cli_scan_json() {
    let (_dir, root) = sample_disc();
    let output = bdscan_cmd()
        .args(["scan", "--json"])
        .arg(root.join("BDMV/PLAYLIST"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["disc"]["volume_label"], "SAMPLE_DISC");
    assert_eq!(value["playlists"][0], "00000.MPLS");
    assert_eq!(
        value["disc"]["stream_files"]["00001.M2TS"]["playlists"][0],
        "00000.MPLS"
    );
}

#[test]
fn test_cli_scan_continues_past_bad_clip() {
    let (_dir, root) = sample_disc();
    write_file(&root.join("BDMV/CLIPINF/00002.clpi"), b"junk").unwrap();

    let mut cmd = bdscan_cmd();
    cmd.arg("scan")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("00002.CLPI"));
}

#[test]
fn test_cli_scan_stop_on_error() {
    let (_dir, root) = sample_disc();
    write_file(&root.join("BDMV/CLIPINF/00002.clpi"), b"junk").unwrap();

    let mut cmd = bdscan_cmd();
    cmd.args(["scan", "--stop-on-error"])
        .arg(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to scan disc"));
}

#[test]
fn test_cli_scan_short_playlists_filtered() {
    let (dir, root) = sample_disc();
    let config = dir.path().join("bdscan.toml");
    fs::write(&config, "[filter]\nmin_playlist_length_secs = 90\n").unwrap();

    let mut cmd = bdscan_cmd();
    cmd.arg("--config")
        .arg(&config)
        .arg("scan")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Playlist 00000.MPLS").not());

    let mut cmd = bdscan_cmd();
    cmd.arg("--config")
        .arg(&config)
        .args(["scan", "--all-playlists"])
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Playlist 00000.MPLS"));
}

#[test]
fn test_cli_scan_missing_disc() {
    let dir = tempdir().unwrap();
    let mut cmd = bdscan_cmd();
    cmd.arg("scan")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("BDMV not found"));
}

#[test]
fn test_cli_locate() {
    let (_dir, root) = sample_disc();
    let mut cmd = bdscan_cmd();
    cmd.arg("locate")
        .arg(root.join("BDMV/STREAM"))
        .assert()
        .success()
        .stdout(predicate::str::contains("SAMPLE_DISC/BDMV"));
}

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[scan]\nenable_ssif = true\n").unwrap();

    let mut cmd = bdscan_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("SSIF scanning: true"));
}

#[test]
fn test_cli_validate_rejects_bad_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[scan]\nbdmv_search_depth = 20\n").unwrap();

    let mut cmd = bdscan_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bdmv_search_depth"));
}
