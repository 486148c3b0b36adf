use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn calexpand() -> Command {
    Command::cargo_bin("calexpand").unwrap()
}

const WEEKLY_MONDAYS: &str = r#"<recurrence><rule><firstDayOfWeek>su</firstDayOfWeek><repeat><weekly mo=\"TRUE\" weekFrequency=\"1\" /></repeat><repeatInstances>4</repeatInstances></rule></recurrence>"#;

const DAILY_FOREVER: &str = r#"<recurrence><rule><repeat><daily dayFrequency=\"1\" /></repeat><repeatForever>FALSE</repeatForever></rule></recurrence>"#;

fn master(id: i64, description: &str) -> String {
    format!(
        r#"{{"id": {id}, "start": "2026-03-02T09:00:00", "end": "2026-03-02T10:00:00",
            "is_recurring": true, "recurrence_data": "{description}"}}"#
    )
}

fn batch(masters: &[String], exceptions: &str) -> String {
    format!(
        r#"{{"masters": [{}], "exceptions": [{exceptions}]}}"#,
        masters.join(",")
    )
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("calexpand-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

// ============================================================
// Expansion
// ============================================================

#[test]
fn test_expand_stdin() {
    calexpand()
        .write_stdin(batch(&[master(1, WEEKLY_MONDAYS)], ""))
        .assert()
        .success()
        .stdout(
            "1 2026-03-02T09:00:00 2026-03-02T10:00:00\n\
             1 2026-03-09T09:00:00 2026-03-09T10:00:00\n\
             1 2026-03-16T09:00:00 2026-03-16T10:00:00\n\
             1 2026-03-23T09:00:00 2026-03-23T10:00:00\n",
        );
}

#[test]
fn test_expand_with_exceptions() {
    let exceptions = r#"
        {"master_id": 1, "original_start": "2026-03-09T09:00:00", "kind": "deleted"},
        {"master_id": 1, "original_start": "2026-03-16T09:00:00", "kind": "replaced",
         "start": "2026-03-18T14:00:00", "end": "2026-03-18T15:00:00"}"#;
    calexpand()
        .write_stdin(batch(&[master(1, WEEKLY_MONDAYS)], exceptions))
        .assert()
        .success()
        .stdout(predicate::str::contains("2026-03-09").not())
        .stdout(predicate::str::contains(
            "1 2026-03-18T14:00:00 2026-03-18T15:00:00",
        ));
}

#[test]
fn test_input_file_argument() {
    let path = temp_file("input.json", &batch(&[master(7, WEEKLY_MONDAYS)], ""));
    calexpand()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("7 2026-03-02T09:00:00"));
}

#[test]
fn test_json_output() {
    let output = calexpand()
        .arg("--json")
        .write_stdin(batch(&[master(1, WEEKLY_MONDAYS)], ""))
        .output()
        .unwrap();
    assert!(output.status.success());
    let instances: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let instances = instances.as_array().unwrap();
    assert_eq!(instances.len(), 4);
    assert_eq!(instances[1]["id"], 1);
    assert_eq!(instances[1]["start"], "2026-03-09T09:00:00");
    assert_eq!(instances[1]["original_start"], "2026-03-09T09:00:00");
}

#[test]
fn test_window_bounds_open_series() {
    calexpand()
        .args(["--from", "2026-03-05T00:00:00", "--to", "2026-03-08T00:00:00"])
        .write_stdin(batch(&[master(1, DAILY_FOREVER)], ""))
        .assert()
        .success()
        .stdout(
            "1 2026-03-05T09:00:00 2026-03-05T10:00:00\n\
             1 2026-03-06T09:00:00 2026-03-06T10:00:00\n\
             1 2026-03-07T09:00:00 2026-03-07T10:00:00\n",
        );
}

#[test]
fn test_cap_bounds_open_series() {
    let output = calexpand()
        .args(["--cap", "5"])
        .write_stdin(batch(&[master(1, DAILY_FOREVER)], ""))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 5);
}

#[test]
fn test_daylight_bias_shifts_summer_occurrences() {
    let monthly = r#"<recurrence><rule><repeat><monthly monthFrequency=\"1\" day=\"2\" /></repeat><repeatInstances>2</repeatInstances></rule></recurrence>"#;
    calexpand()
        .args(["--bias=-60", "--daylight-bias=-60"])
        .write_stdin(batch(&[master(1, monthly)], ""))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1 2026-04-02T10:00:00 2026-04-02T11:00:00",
        ));
}

#[test]
fn test_config_file() {
    let config = temp_file(
        "config.toml",
        "standard_bias = -60\n\
         daylight_bias = -60\n\
         window_start = \"2026-03-20T00:00:00\"\n\
         window_end = \"2026-03-31T00:00:00\"\n\
         workers = 2\n",
    );
    calexpand()
        .arg("--config")
        .arg(&config)
        .write_stdin(batch(&[master(1, WEEKLY_MONDAYS)], ""))
        .assert()
        .success()
        .stdout("1 2026-03-23T09:00:00 2026-03-23T10:00:00\n");
}

#[test]
fn test_config_from_env() {
    let config = temp_file("env-config.toml", "instance_cap = 2\n");
    let output = calexpand()
        .env("CALEXPAND_CONFIG", &config)
        .write_stdin(batch(&[master(1, DAILY_FOREVER)], ""))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 2);
}

// ============================================================
// Failures and warnings
// ============================================================

#[test]
fn test_failed_master_exit_code() {
    let hourly = r#"<recurrence><rule><repeat><hourly hourFrequency=\"1\" /></repeat><repeatInstances>2</repeatInstances></rule></recurrence>"#;
    calexpand()
        .write_stdin(batch(&[master(1, WEEKLY_MONDAYS), master(2, hourly)], ""))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 2026-03-02T09:00:00"))
        .stderr(predicate::str::contains(
            "master 2: unknown recurrence pattern kind 'hourly'",
        ));
}

#[test]
fn test_unbounded_without_window_fails() {
    calexpand()
        .write_stdin(batch(&[master(1, DAILY_FOREVER)], ""))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("needs a window end"));
}

#[test]
fn test_orphan_warning() {
    let exceptions =
        r#"{"master_id": 1, "original_start": "2026-03-10T09:00:00", "kind": "deleted"}"#;
    calexpand()
        .write_stdin(batch(&[master(1, WEEKLY_MONDAYS)], exceptions))
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: master 1"));
}

#[test]
fn test_invalid_input() {
    calexpand()
        .write_stdin("not json")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid input batch"));
}

#[test]
fn test_invalid_window() {
    calexpand()
        .args(["--to", "tomorrow"])
        .write_stdin(batch(&[], ""))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid --to datetime"));
}

// ============================================================
// Descriptions
// ============================================================

#[test]
fn test_check_valid() {
    calexpand()
        .args([
            "--check",
            r#"<recurrence><rule><repeat><daily dayFrequency="2"/></repeat><repeatInstances>3</repeatInstances></rule></recurrence>"#,
        ])
        .assert()
        .success()
        .stdout("valid\n");
}

#[test]
fn test_check_invalid() {
    calexpand()
        .args([
            "--check",
            r#"<recurrence><rule><repeat><daily/></repeat><repeatInstances>3</repeatInstances></rule></recurrence>"#,
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("dayFrequency"));
}

#[test]
fn test_describe() {
    calexpand()
        .args([
            "--describe",
            r#"<recurrence><rule><firstDayOfWeek>su</firstDayOfWeek><repeat><weekly mo="TRUE" we="TRUE" weekFrequency="2"/></repeat><repeatInstances>10</repeatInstances></rule></recurrence>"#,
        ])
        .assert()
        .success()
        .stdout("every 2 weeks on mon, wed (week starts sunday), 10 times\n");
}
