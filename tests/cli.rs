//! Binary smoke tests: no probing, no network.

use assert_cmd::Command;

fn write_fleet_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("fleet.toml");
    std::fs::write(
        &path,
        r#"
        [[hosts]]
        id = "s60"
        name = "Hub"
        ssh_aliases = ["s60-vpn"]
        "#,
    )
    .expect("write fleet config");
    path
}

#[test]
fn status_on_a_fresh_state_file_prints_a_hint() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_fleet_config(dir.path());
    let state = dir.path().join("state.json");

    let output = Command::cargo_bin("fleetwatch")
        .expect("binary")
        .arg("--status")
        .arg("--config")
        .arg(&config)
        .arg("--state")
        .arg(&state)
        .output()
        .expect("run binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("no recorded state"), "stdout: {stdout}");
}

#[test]
fn unknown_host_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_fleet_config(dir.path());
    let state = dir.path().join("state.json");

    let output = Command::cargo_bin("fleetwatch")
        .expect("binary")
        .arg("s99")
        .arg("--config")
        .arg(&config)
        .arg("--state")
        .arg(&state)
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("s99"), "stderr: {stderr}");
}

#[test]
fn log_dir_creates_a_rotated_json_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_fleet_config(dir.path());
    let state = dir.path().join("state.json");
    let logs = dir.path().join("logs");

    let output = Command::cargo_bin("fleetwatch")
        .expect("binary")
        .arg("--status")
        .arg("--config")
        .arg(&config)
        .arg("--state")
        .arg(&state)
        .arg("--log-dir")
        .arg(&logs)
        .output()
        .expect("run binary");

    assert!(output.status.success());
    let mut entries = std::fs::read_dir(&logs)
        .expect("logs dir")
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned());
    assert!(
        entries.any(|name| name.starts_with("fleetwatch.log")),
        "no rotated log file found"
    );
}

#[test]
fn missing_config_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");

    let output = Command::cargo_bin("fleetwatch")
        .expect("binary")
        .arg("--status")
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .output()
        .expect("run binary");

    assert!(!output.status.success());
}
