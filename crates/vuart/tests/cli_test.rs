//! Integration tests for the `vuart` CLI binary.
//!
//! Argument parsing, help, completions, and exit codes run without a
//! device; device-bound commands run against a wiremock device.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `vuart` binary with env isolation.
///
/// Clears all `VUART_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn vuart_cmd() -> assert_cmd::Command {
    isolated_cmd(Path::new("/tmp/vuart-cli-test-nonexistent"))
}

/// Same isolation, with config rooted at `home`.
fn isolated_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vuart");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("VUART_PROFILE")
        .env_remove("VUART_DEVICE")
        .env_remove("VUART_OUTPUT")
        .env_remove("VUART_INSECURE")
        .env_remove("VUART_TIMEOUT")
        .env_remove("VUART_DEFAULT_PROFILE")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn device_with_ports() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 0, "name": "UART0", "type": 1, "state": 2,
             "lineCoding": {"baudRate": 115200, "dataBits": 8, "stopBits": 0, "parity": 0}},
            {"id": 1, "name": "CDC0", "type": 0, "state": 1}
        ])))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = vuart_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    vuart_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("ports")
            .and(predicate::str::contains("routes"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    vuart_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vuart"));
}

#[test]
fn test_completions_bash() {
    vuart_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Usage errors ────────────────────────────────────────────────────

#[test]
fn test_no_device_configured() {
    let output = vuart_cmd().arg("system").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("No device configured"));
}

#[test]
fn test_bridge_with_two_destinations_is_rejected() {
    vuart_cmd()
        .args([
            "--device", "http://127.0.0.1:1", "routes", "create", "--type", "bridge", "--src",
            "0", "--dst", "1,2",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("bridge"));
}

#[test]
fn test_configure_without_changes_is_rejected() {
    vuart_cmd()
        .args(["--device", "http://127.0.0.1:1", "ports", "configure", "3"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_signal_name_is_a_parse_error() {
    vuart_cmd()
        .args([
            "--device",
            "http://127.0.0.1:1",
            "ports",
            "configure",
            "0",
            "--override-mask",
            "dtr,xyz",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown signal"));
}

#[test]
fn test_unreachable_device_exit_code() {
    let output = vuart_cmd()
        .args(["--device", "http://127.0.0.1:1", "ports", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

// ── Against a mock device ───────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_ports_list_json() {
    let server = device_with_ports().await;
    vuart_cmd()
        .args(["--device", &server.uri(), "-o", "json-compact", "ports", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name":"UART0""#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ports_list_plain_and_table() {
    let server = device_with_ports().await;
    vuart_cmd()
        .args(["--device", &server.uri(), "-o", "plain", "ports", "list"])
        .assert()
        .success()
        .stdout("0\n1\n");

    vuart_cmd()
        .args(["--device", &server.uri(), "ports", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("115200 8N1").and(predicate::str::contains("UART")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_system_shows_uptime() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/system"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "firmware": "vuart", "version": "1.2.0", "portCount": 6,
            "activeRoutes": 2, "freeHeap": 81920, "uptime": 3725
        })))
        .mount(&server)
        .await;

    vuart_cmd()
        .args(["--device", &server.uri(), "system"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.2.0").and(predicate::str::contains("1h 2m 5s")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_requires_confirmation_when_not_interactive() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/routes/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&server)
        .await;

    vuart_cmd()
        .args(["--device", &server.uri(), "routes", "delete", "3"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_missing_route_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/routes/3"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Route not found"))
        .mount(&server)
        .await;

    vuart_cmd()
        .args(["--device", &server.uri(), "--yes", "routes", "delete", "3"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("route '3' not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_reset_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/config/reset"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": false, "message": "busy"})),
        )
        .mount(&server)
        .await;

    vuart_cmd()
        .args(["--device", &server.uri(), "-y", "device", "reset"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("busy"));
}

// ── Profiles ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_round_trip_drives_device_commands() {
    let home = tempfile::tempdir().unwrap();
    let server = device_with_ports().await;

    isolated_cmd(home.path())
        .args(["config", "add-profile", "bench", "--url", &server.uri()])
        .assert()
        .success();

    isolated_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bench").and(predicate::str::contains(server.uri())));

    // First profile becomes the default, so no --device is needed.
    isolated_cmd(home.path())
        .args(["-o", "plain", "ports", "list"])
        .assert()
        .success()
        .stdout("0\n1\n");

    isolated_cmd(home.path())
        .args(["config", "use", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bench"));
}
