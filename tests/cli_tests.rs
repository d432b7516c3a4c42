//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SPOTIFY_VARS: &[&str] = &[
    "SPOTIFY_CLIENT_ID",
    "SPOTIFY_CLIENT_SECRET",
    "SPOTIFY_REFRESH_TOKEN",
    "SPOTIFY_ACCESS_TOKEN",
];

/// Binary with config isolated to `home`
fn spytorec(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("spytorec").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("NO_COLOR", "1")
        .env_remove("SPYTOREC_LOG");
    for var in SPOTIFY_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_output() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--organize"))
        .stdout(predicate::str::contains("--recording-buffer"))
        .stdout(predicate::str::contains("record"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn version_output() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("spytorec"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn config_path_command() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spytorec"))
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_help_lists_actions() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("path"));
}

#[test]
fn config_set_then_get() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .args(["config", "set", "format", "ogg"])
        .assert()
        .success();

    spytorec(&home)
        .args(["config", "get", "format"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ogg"));
}

#[test]
fn config_get_unset_key() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .args(["config", "get", "device"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(not set)"));
}

#[test]
fn config_secrets_are_masked() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .args(["config", "set", "spotify.client_secret", "0123456789abcdef"])
        .assert()
        .success();

    spytorec(&home)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0123...cdef"))
        .stdout(predicate::str::contains("0123456789abcdef").not());
}

#[test]
fn config_init_twice_fails() {
    let home = TempDir::new().unwrap();
    spytorec(&home).args(["config", "init"]).assert().success();
    spytorec(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn config_set_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .args(["config", "set", "api_key", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown key"));
}

#[test]
fn config_set_rejects_bad_value() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .args(["config", "set", "ogg_quality", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 0 and 10"));
}

#[test]
fn invalid_format_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    spytorec(&home)
        .args(["--format", "mp3"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("mp3"));
}

#[test]
fn invalid_interval_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    spytorec(&home)
        .args(["record", "--interval", "0", "--dir"])
        .arg(out.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("interval"));
}

#[test]
fn missing_credentials_exit_with_error() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    spytorec(&home)
        .arg("--dir")
        .arg(out.path().join("music"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing Spotify credentials"));

    assert!(!out.path().join("music").exists());
}
