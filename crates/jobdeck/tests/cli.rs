//! End-to-end tests for the jobdeck binary.
//!
//! Everything here stays on code paths that exit before the terminal is
//! touched: flag parsing, config validation, and the headless self-check.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

#[allow(deprecated)]
fn jobdeck_cmd() -> Command {
    let mut cmd = Command::cargo_bin("jobdeck").unwrap();
    // Keep the host environment out of the tests.
    cmd.env_remove("JOBDECK_URL")
        .env_remove("JOBDECK_REFRESH")
        .env_remove("JOBDECK_ROUTE")
        .env_remove("JOBDECK_CONFIG")
        .env_remove("JOBDECK_LOG")
        .env_remove("JOBDECK_LOG_LEVEL")
        .env_remove("JOBDECK_FPS")
        .env_remove("JOBDECK_PAGE_SIZE");
    cmd
}

#[test]
fn help_lists_the_flags() {
    jobdeck_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--url"))
        .stdout(predicate::str::contains("--refresh"))
        .stdout(predicate::str::contains("--self-check"));
}

#[test]
fn version_flag() {
    jobdeck_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jobdeck"));
}

#[test]
fn rejects_a_url_without_scheme() {
    jobdeck_cmd()
        .args(["--url", "queue.internal:5555"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("http://"));
}

#[test]
fn rejects_a_url_from_the_environment_too() {
    jobdeck_cmd()
        .env("JOBDECK_URL", "ftp://queue.internal")
        .assert()
        .failure()
        .stderr(predicate::str::contains("http://"));
}

#[test]
fn self_check_skips_config_resolution() {
    // The headless render uses sample data; a bad URL in the environment
    // must not get in its way.
    jobdeck_cmd()
        .env("JOBDECK_URL", "ftp://queue.internal")
        .arg("--self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok overview"));
}

#[test]
fn rejects_an_unknown_route() {
    jobdeck_cmd()
        .args(["--route", "/nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown route"));
}

#[test]
fn rejects_a_config_file_with_unknown_keys() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "refresh = 30").unwrap();

    jobdeck_cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse config file"));
}

#[test]
fn reports_a_missing_config_file() {
    jobdeck_cmd()
        .args(["--config", "/nonexistent/jobdeck.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read config file"));
}

#[test]
fn self_check_renders_every_page() {
    let assert = jobdeck_cmd().arg("--self-check").assert().success();
    let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(out.lines().count(), 11, "one line per page:\n{out}");
    for key in ["overview", "queues", "jobs", "workergroups", "agents"] {
        assert!(out.contains(&format!("ok {key}")), "missing {key}:\n{out}");
    }
}
