//! Integration tests for the `netatmo-ws` CLI binary.
//!
//! Argument parsing, help output, completions, config handling and error
//! exit codes, plus discovery and a credential reload against a mocked
//! Netatmo API.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::ChildStderr;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `netatmo-ws` binary with env isolation.
///
/// Clears all `NETATMO_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn netatmo_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("netatmo-ws");
    cmd.env("HOME", NO_HOME)
        .env("XDG_CONFIG_HOME", NO_HOME)
        .env_remove("RUST_LOG");
    for var in NETATMO_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Same isolation as [`netatmo_cmd`], for a long-running child.
fn daemon_cmd() -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(env!("CARGO_BIN_EXE_netatmo-ws"));
    cmd.env("HOME", NO_HOME)
        .env("XDG_CONFIG_HOME", NO_HOME)
        .env_remove("RUST_LOG")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for var in NETATMO_VARS {
        cmd.env_remove(var);
    }
    cmd
}

const NO_HOME: &str = "/tmp/netatmo-ws-test-nonexistent";

const NETATMO_VARS: [&str; 10] = [
    "NETATMO_PROFILE",
    "NETATMO_CONFIG",
    "NETATMO_STATION",
    "NETATMO_OUTPUT",
    "NETATMO_TIMEOUT",
    "NETATMO_LOG_FILE",
    "NETATMO_USERNAME",
    "NETATMO_PASSWORD",
    "NETATMO_CLIENT_ID",
    "NETATMO_CLIENT_SECRET",
];

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

/// Read stderr until a line contains `needle`, collecting everything seen.
async fn read_until(lines: &mut Lines<BufReader<ChildStderr>>, needle: &str, seen: &mut String) -> bool {
    let scan = async {
        while let Ok(Some(line)) = lines.next_line().await {
            seen.push_str(&line);
            seen.push('\n');
            if line.contains(needle) {
                return true;
            }
        }
        false
    };
    tokio::time::timeout(Duration::from_secs(20), scan)
        .await
        .unwrap_or(false)
}

/// Token endpoint plus a station with a main module and one outdoor module.
async fn mount_station(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-1",
            "expires_in": 10800,
            "scope": ["read_station"]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/getstationsdata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "body": {
                "devices": [{
                    "_id": "70:ee:50:00:00:01",
                    "station_name": "Home",
                    "module_name": "Living Room",
                    "type": "NAMain",
                    "wifi_status": 56,
                    "dashboard_data": {
                        "time_utc": 1_700_000_000,
                        "Temperature": 21.3,
                        "CO2": 612,
                        "Humidity": 45,
                        "Noise": 38,
                        "Pressure": 1013.2,
                        "AbsolutePressure": 1001.1,
                        "min_temp": 19.8,
                        "max_temp": 22.0,
                        "temp_trend": "stable",
                        "pressure_trend": "up"
                    },
                    "modules": [{
                        "_id": "02:00:00:00:00:01",
                        "module_name": "Garden",
                        "type": "NAModule1",
                        "battery_percent": 80,
                        "rf_status": 60,
                        "dashboard_data": { "time_utc": 1_700_000_000, "Temperature": 4.2 }
                    }]
                }]
            }
        })))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = netatmo_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    netatmo_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Netatmo")
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("discover"))
            .and(predicate::str::contains("query")),
    );
}

#[test]
fn test_version_flag() {
    netatmo_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("netatmo-ws")
                .and(predicate::str::contains("kinds: main indoor outdoor wind rain")),
        );
}

#[test]
fn test_build_writes_man_pages_and_completions() {
    let out = Path::new(env!("OUT_DIR"));
    for page in ["netatmo-ws.1", "netatmo-ws-run.1", "netatmo-ws-config-set-secret.1"] {
        assert!(out.join("man").join(page).is_file(), "missing man page {page}");
    }
    for script in ["netatmo-ws.bash", "_netatmo-ws", "netatmo-ws.fish"] {
        assert!(out.join("completions").join(script).is_file(), "missing completion {script}");
    }
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    netatmo_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    netatmo_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Profile ─────────────────────────────────────────────────────────

#[test]
fn test_profile_json_lists_every_node() {
    netatmo_cmd()
        .args(["profile", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"main_netatmo\"")
                .and(predicate::str::contains("\"in_netatmo\""))
                .and(predicate::str::contains("\"out_netatmo\""))
                .and(predicate::str::contains("\"wind_netatmo\""))
                .and(predicate::str::contains("\"rain_netatmo\"")),
        );
}

#[test]
fn test_profile_plain_controller_first() {
    let output = netatmo_cmd()
        .args(["profile", "-o", "plain"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "Netatmo");
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    netatmo_cmd()
        .args(["--config", "/tmp/somewhere/netatmo.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/somewhere/netatmo.toml"));
}

#[test]
fn test_config_show_masks_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(
        dir.path(),
        r#"
default_profile = "home"

[profiles.home]
username = "me@example.com"
password = "hunter2"
client_id = "abc"
"#,
    );

    netatmo_cmd()
        .args(["--config", cfg.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.home]")
                .and(predicate::str::contains("password = \"****\""))
                .and(predicate::str::contains("hunter2").not()),
        );
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = netatmo_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_run_rejects_zero_interval() {
    netatmo_cmd()
        .args(["run", "--interval", "0s"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("interval"));
}

#[test]
fn test_query_missing_credentials_exit_code() {
    netatmo_cmd()
        .env("NETATMO_PASSWORD", "hunter2")
        .env("NETATMO_CLIENT_SECRET", "s3cret")
        .arg("query")
        .assert()
        .code(3)
        .stderr(
            predicate::str::contains("Username").and(predicate::str::contains("ClientID")),
        );
}

#[cfg(unix)]
#[test]
fn test_run_without_credentials_keeps_running() {
    let output = netatmo_cmd()
        .arg("run")
        .timeout(Duration::from_secs(3))
        .output()
        .unwrap();

    let text = combined_output(&output);
    assert_eq!(output.status.code(), None, "run exited on its own:\n{text}");
    assert!(
        text.contains("Please set the Username parameter"),
        "Expected a credential notice:\n{text}"
    );
    assert!(!text.contains("Credentials incomplete"), "Unexpected fatal error:\n{text}");
}

#[test]
fn test_unknown_profile_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(dir.path(), "[profiles.home]\nclient_id = \"abc\"\n");

    netatmo_cmd()
        .args(["--config", cfg.to_str().unwrap(), "--profile", "cabin", "query"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("cabin"));
}

// ── Against a mocked API ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_discover_against_mock_api() {
    let server = MockServer::start().await;

    mount_station(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(
        dir.path(),
        &format!(
            "[profiles.default]\nusername = \"me@example.com\"\nclient_id = \"abc\"\nbase_url = \"{}\"\n",
            server.uri()
        ),
    );

    let mut cmd = netatmo_cmd();
    cmd.env("NETATMO_PASSWORD", "hunter2")
        .env("NETATMO_CLIENT_SECRET", "s3cret")
        .args(["--config", cfg.to_str().unwrap(), "discover", "-o", "json"]);
    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();

    let text = combined_output(&output);
    assert!(output.status.success(), "discover failed:\n{text}");

    let modules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let addresses: Vec<&str> = modules
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["address"].as_str().unwrap())
        .collect();
    assert_eq!(addresses, vec!["netwsmain", "netwsout"]);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_run_picks_up_credentials_on_reload() {
    let server = MockServer::start().await;
    mount_station(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let profile = |username: &str| {
        format!(
            "[profiles.default]\n{username}client_id = \"abc\"\nbase_url = \"{}\"\n",
            server.uri()
        )
    };
    let cfg = write_config(dir.path(), &profile(""));

    let mut child = daemon_cmd()
        .env("NETATMO_PASSWORD", "hunter2")
        .env("NETATMO_CLIENT_SECRET", "s3cret")
        .args(["-v", "--config", cfg.to_str().unwrap()])
        .args(["run", "--interval", "1h", "--reload-interval", "200ms"])
        .spawn()
        .unwrap();
    let mut lines = BufReader::new(child.stderr.take().unwrap()).lines();
    let mut seen = String::new();

    assert!(
        read_until(&mut lines, "Please set the Username parameter", &mut seen).await,
        "no credential notice:\n{seen}"
    );
    assert!(server.received_requests().await.unwrap().is_empty());

    write_config(dir.path(), &profile("username = \"me@example.com\"\n"));
    assert!(
        read_until(&mut lines, "station discovered", &mut seen).await,
        "reload did not log in:\n{seen}"
    );

    child.kill().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(paths, vec!["/oauth2/token", "/api/getstationsdata"]);
}
