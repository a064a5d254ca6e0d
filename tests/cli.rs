//! End-to-end tests for the smartcat binary

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn smartcat() -> Command {
    Command::cargo_bin("smartcat").unwrap()
}

fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(content).unwrap();
    path
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn test_empty_file() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(dir.path(), "empty", b"");

    smartcat().arg(&path).assert().success().stdout(predicate::eq(&b""[..]));
}

#[test]
fn test_single_byte_every_preset() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(dir.path(), "a.txt", b"A");

    for preset in ["page", "block", "scaled", "tuned"] {
        smartcat()
            .args(["--preset", preset])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::eq(&b"A"[..]));
    }
}

#[test]
fn test_exact_page_multiple() {
    let dir = TempDir::new().unwrap();
    let data = pattern(64 * 1024);
    let path = create_test_file(dir.path(), "pages.bin", &data);

    smartcat()
        .args(["--preset", "page"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq(data.as_slice()));
}

#[test]
fn test_large_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let data = pattern(3 * 1024 * 1024 + 123);
    let path = create_test_file(dir.path(), "large.bin", &data);

    for alloc in ["native", "offset"] {
        smartcat()
            .args(["--alloc", alloc, "--scale-factor", "4"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::eq(data.as_slice()));
    }
}

#[test]
fn test_missing_path() {
    let dir = TempDir::new().unwrap();

    smartcat()
        .arg(dir.path().join("does-not-exist"))
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("open"));
}

#[test]
fn test_wrong_argument_count() {
    smartcat().assert().code(1);
    smartcat().args(["a", "b"]).assert().code(1);
}

#[test]
fn test_zero_scale_factor_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(dir.path(), "f", b"x");

    smartcat()
        .args(["--scale-factor", "0"])
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("usage"));
}

#[test]
fn test_help_exits_zero() {
    smartcat()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("PATH"));
}

#[test]
fn test_stats_go_to_stderr() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(dir.path(), "f.txt", b"hello\n");

    smartcat()
        .arg("--stats=json")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::eq(&b"hello\n"[..]))
        .stderr(predicate::str::contains("\"bytes_copied\": 6"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_write_failure_mid_copy() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(dir.path(), "data.bin", &pattern(1024 * 1024));
    let full = File::options().write(true).open("/dev/full").unwrap();

    smartcat()
        .arg(&path)
        .stdout(full)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("write"));
}

#[cfg(unix)]
#[test]
fn test_directory_is_read_error() {
    let dir = TempDir::new().unwrap();

    // Opening a directory read-only succeeds, reading it fails with EISDIR
    smartcat()
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("read"));
}
