//! Integration tests for the netcheck CLI
//!
//! Commands run with --local against a root that does not exist, so they
//! only need sh and grep on the build host.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const MISSING_ROOT: &str = "/nonexistent-netcheck-root";

fn netcheck() -> Command {
    Command::cargo_bin("netcheck").unwrap()
}

/// Config with a short poll budget so timeouts come quickly
fn fast_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("netcheck.toml");
    fs::write(
        &path,
        "[target]\nlocal = true\n\n[wait]\ndelay_ms = 10\ntries = 2\n",
    )
    .unwrap();
    path
}

#[test]
fn test_help_command() {
    netcheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Installer network test helper"))
        .stdout(predicate::str::contains("preinstall"))
        .stdout(predicate::str::contains("count-profiles"));
}

#[test]
fn test_version() {
    netcheck()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_hostname_help() {
    netcheck()
        .args(["hostname", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reset"));
}

#[test]
fn test_unknown_start_step_rejected() {
    netcheck()
        .args(["preinstall", "ens3", "--start-step", "storage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown installer step"));
}

#[test]
fn test_root_and_sysroot_conflict() {
    netcheck()
        .args(["con-setting", "ens3", "connection.autoconnect", "yes"])
        .args(["--root", "/mnt/sysimage", "--sysroot"])
        .assert()
        .failure();
}

#[test]
fn test_missing_config_file() {
    netcheck()
        .args(["--config", "/nonexistent/netcheck.toml", "iface"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading /nonexistent/netcheck.toml"));
}

#[test]
fn test_count_profiles_in_missing_root() {
    netcheck()
        .args(["--local", "count-profiles", "", "0", "--root", MISSING_ROOT])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn test_count_profiles_mismatch() {
    netcheck()
        .args(["--local", "count-profiles", "ens3", "1", "--transient", "--root", MISSING_ROOT])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Assertion failed"));
}

#[test]
fn test_count_profiles_rejects_relative_root() {
    netcheck()
        .args(["--local", "count-profiles", "ens3", "0", "--root", "mnt/sysimage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be an absolute path"));
}

#[test]
fn test_wait_profile_times_out() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);

    netcheck()
        .arg("--config")
        .arg(&config)
        .args(["wait-profile", "ens3", "--root", MISSING_ROOT])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Timeout"));
}

#[test]
fn test_wait_profile_finds_file() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    let profiles = dir.path().join("etc/NetworkManager/system-connections");
    fs::create_dir_all(&profiles).unwrap();
    fs::write(profiles.join("ens3.nmconnection"), "[connection]\nid=ens3\n").unwrap();

    let root = dir.path().to_str().unwrap().to_string();
    // Temp dirs may carry characters a root is not allowed to contain
    if root.chars().any(|c| !(c.is_ascii_alphanumeric() || "/_.-".contains(c))) {
        eprintln!("Test skipped: unusual temp dir {}", root);
        return;
    }

    netcheck()
        .arg("--config")
        .arg(&config)
        .args(["wait-profile", "ens3", "--root", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));

    netcheck()
        .arg("--config")
        .arg(&config)
        .args(["count-profiles", "ens3", "1", "--root", &root, "--file-name", "ens3"])
        .assert()
        .success();
}
