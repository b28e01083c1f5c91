//! Integration tests for the doseguard binary.
//!
//! These tests verify end-to-end behavior including:
//! - Verdict rendering (text and JSON)
//! - The explicit override workflow and its audit log
//! - CSV rollup of the audit log
//! - Configuration defaults

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI isolated from the user's config and data directories
fn cli(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("doseguard"));
    cmd.env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .env("RUST_LOG", "off")
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"));
    cmd
}

fn override_log(temp_dir: &TempDir) -> std::path::PathBuf {
    temp_dir.path().join("data/audit/overrides.jsonl")
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Medication dosing and safety guardrails",
        ));
}

#[test]
fn test_evaluate_clean_dose() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["evaluate", "ondansetron", "--weight", "10", "--patient", "pediatric"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK TO ADMINISTER"))
        .stdout(predicate::str::contains("1.5 mg"))
        .stdout(predicate::str::contains("0.75 mL"));
}

#[test]
fn test_evaluate_ceiling_is_shown() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args([
            "evaluate",
            "epinephrine-anaphylaxis",
            "--weight",
            "80",
            "--patient",
            "adult",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK TO ADMINISTER"))
        .stdout(predicate::str::contains("0.50 mg"))
        .stdout(predicate::str::contains("Maximum dose exceeded"));
}

#[test]
fn test_blocked_verdict_exits_zero_with_banner() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args([
            "evaluate", "fentanyl", "--weight", "20", "--patient", "pediatric", "--taking",
            "maoi",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("BLOCKED"))
        .stdout(predicate::str::contains("[CRITICAL] interaction"));
}

#[test]
fn test_evaluate_json_output() {
    let temp_dir = setup_test_dir();
    let output = cli(&temp_dir)
        .args([
            "evaluate",
            "epinephrine-anaphylaxis",
            "--weight",
            "45",
            "--patient",
            "adult",
            "--condition",
            "pregnancy",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let verdict: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(verdict["can_administer"], true);
    assert_eq!(verdict["requires_override"], false);
    let alerts = verdict["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["severity"], "warning");
    assert_eq!(alerts[0]["category"], "contraindication");
}

#[test]
fn test_unknown_medication_fails() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["evaluate", "unobtainium", "--weight", "10", "--patient", "adult"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unobtainium"));
}

#[test]
fn test_invalid_weight_fails() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["evaluate", "naloxone", "--weight", "-4", "--patient", "pediatric"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidWeight"));
}

#[test]
fn test_patient_type_required_without_default() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["evaluate", "naloxone", "--weight", "12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("patient type required"));
}

#[test]
fn test_patient_type_from_config() {
    let temp_dir = setup_test_dir();
    let config_dir = temp_dir.path().join("config/doseguard");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[defaults]\npatient_type = \"pediatric\"\n",
    )
    .unwrap();

    cli(&temp_dir)
        .args(["evaluate", "naloxone", "--weight", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pediatric, 12.0 kg"));
}

#[test]
fn test_override_records_event() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args([
            "override",
            "nitroglycerin",
            "--weight",
            "80",
            "--patient",
            "adult",
            "--condition",
            "hypotension",
            "--reason",
            "Repeat BP 118 systolic after fluids",
            "--by",
            "Medic 12",
            "--confirm",
            "nitroglycerin",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("OVERRIDE RECORDED"));

    let content = fs::read_to_string(override_log(&temp_dir)).expect("Failed to read audit log");
    assert_eq!(content.lines().count(), 1);
    let event: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(event["medication_id"], "nitroglycerin");
    assert_eq!(event["authorized_by"], "Medic 12");
    assert_eq!(event["blocking_alerts"].as_array().unwrap().len(), 1);
}

#[test]
fn test_override_requires_matching_confirmation() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args([
            "override",
            "nitroglycerin",
            "--weight",
            "80",
            "--patient",
            "adult",
            "--condition",
            "hypotension",
            "--reason",
            "x",
            "--by",
            "Medic 12",
            "--confirm",
            "aspirin",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match"));

    assert!(!override_log(&temp_dir).exists());
}

#[test]
fn test_override_not_recorded_when_not_blocked() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args([
            "override",
            "aspirin",
            "--weight",
            "80",
            "--patient",
            "adult",
            "--reason",
            "x",
            "--by",
            "Medic 12",
            "--confirm",
            "aspirin",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("no override needed"));

    assert!(!override_log(&temp_dir).exists());
}

#[test]
fn test_rollup_archives_override_log() {
    let temp_dir = setup_test_dir();

    for reason in ["first", "second"] {
        cli(&temp_dir)
            .args([
                "override",
                "aspirin",
                "--weight",
                "80",
                "--patient",
                "adult",
                "--condition",
                "active_gi_bleed",
                "--reason",
                reason,
                "--by",
                "Dr. Base",
                "--confirm",
                "aspirin",
            ])
            .assert()
            .success();
    }

    cli(&temp_dir)
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 2 overrides"));

    let csv_path = temp_dir.path().join("data/overrides.csv");
    let csv_content = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    assert_eq!(csv_content.lines().count(), 3); // header + 2 rows
    assert_eq!(fs::read_to_string(override_log(&temp_dir)).unwrap(), "");
    let archived = temp_dir.path().join("data/audit/overrides.jsonl.processed");
    assert!(archived.exists());

    cli(&temp_dir)
        .args(["rollup", "--cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaned up 1 processed override logs"));
    assert!(!archived.exists());
}

#[test]
fn test_rollup_without_log() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to roll up"));
}

#[test]
fn test_list_filters() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["list", "--indication", "anaphylaxis", "--patient", "adult"])
        .assert()
        .success()
        .stdout(predicate::str::contains("epinephrine-anaphylaxis"))
        .stdout(predicate::str::contains("diphenhydramine"))
        .stdout(predicate::str::contains("naloxone").not());
}

#[test]
fn test_list_by_patient_type() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["list", "--patient", "adult"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nitroglycerin"))
        .stdout(predicate::str::contains("fentanyl-adult"))
        .stdout(predicate::str::contains("ondansetron").not());
}

#[test]
fn test_show_medication() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["show", "nitroglycerin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4 mg/tablet"))
        .stdout(predicate::str::contains("pde5_inhibitor"))
        .stdout(predicate::str::contains("Contraindications"));
}

#[test]
fn test_brackets_and_validate() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .arg("brackets")
        .assert()
        .success()
        .stdout(predicate::str::contains("newborn"))
        .stdout(predicate::str::contains("10years"));

    cli(&temp_dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Formulary valid"));
}

#[test]
fn test_config_write_default() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["config", "--write-default"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default config"));

    let path = temp_dir.path().join("config/doseguard/config.toml");
    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("[output]"));

    cli(&temp_dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("format = \"text\""));
}
