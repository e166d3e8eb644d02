//! End-to-end tests for the `lanekit` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn lanekit() -> Command {
    let mut cmd = Command::cargo_bin("lanekit").unwrap();
    cmd.env_remove("LANEKIT_CONFIG").env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_info_lists_bindings() {
    lanekit()
        .args(["info", "--no-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Machine:"))
        .stdout(predicate::str::contains("sum_of_poly"))
        .stdout(predicate::str::contains("deinterleave"));
}

#[test]
fn test_info_all_machines_includes_generic() {
    lanekit()
        .args(["info", "--no-config", "--all-machines"])
        .assert()
        .success()
        .stdout(predicate::str::contains("generic"))
        .stdout(predicate::str::contains("Runs here"));
}

#[test]
fn test_info_json() {
    let output = lanekit()
        .args(["info", "--no-config", "--json", "--all-machines"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["machine"].is_string());
    assert!(value["bindings"]["sum_of_poly"]["unaligned"].is_string());
    assert!(value["machines"].as_array().unwrap().len() >= 1);
}

#[test]
fn test_config_file_pins_generic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pinned.toml");
    std::fs::write(&path, "force_generic = true\n").unwrap();

    let output = lanekit()
        .args(["info", "--json", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["machine"], "generic");
    assert_eq!(value["bindings"]["deinterleave"]["aligned"], "generic");
}

#[test]
fn test_missing_config_file_fails() {
    lanekit()
        .args(["info", "--config", "does-not-exist.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_unknown_machine_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "machine = \"quantum\"\n").unwrap();

    lanekit()
        .args(["info", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("quantum"));
}

#[test]
fn test_profile_writes_report_and_config() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("results.json");
    let config = dir.path().join("lanekit.toml");

    lanekit()
        .args(["profile", "--no-config", "--iterations", "2", "--points", "257"])
        .arg("--json")
        .arg(&json)
        .arg("--write-config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("generic"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(report["options"]["iterations"], 2);
    assert_eq!(report["tests"].as_array().unwrap().len(), 2);

    let text = std::fs::read_to_string(&config).unwrap();
    assert!(text.contains("machine = "));

    // The written configuration is accepted back.
    lanekit()
        .args(["info", "--config"])
        .arg(&config)
        .assert()
        .success();
}

#[test]
fn test_machine_list_reflects_cpu_not_configuration() {
    let machines = |args: &[&str]| -> Vec<serde_json::Value> {
        let output = lanekit().args(args).output().unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        value["machines"].as_array().unwrap().clone()
    };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("generic.toml");
    std::fs::write(&path, "force_generic = true\n").unwrap();
    let path = path.to_str().unwrap();

    let unconfigured = machines(&["info", "--no-config", "--json", "--all-machines"]);
    let forced = machines(&["info", "--json", "--all-machines", "--config", path]);
    assert_eq!(unconfigured, forced);

    // The table the unconfigured run selects always runs on this CPU.
    let output = lanekit().args(["info", "--no-config", "--json"]).output().unwrap();
    let selected: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entry = unconfigured
        .iter()
        .find(|m| m["name"] == selected["machine"])
        .unwrap();
    assert_eq!(entry["runs"], true);
}
