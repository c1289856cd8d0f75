//! Tests that run the compiled `regkeeper` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use regkeeper_test_utils::TestConfig;

const VALID: &str = r#"
settings = [
    'HKCU\Console\CursorSize|DWORD|25',
    'HKCU\Console\FaceName|REG_SZ|Consolas',
]
"#;

fn regkeeper_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("regkeeper"));
    cmd.env_remove("REGKEEPER_CONFIG").env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_output() {
    regkeeper_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("RegKeeper"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_version_output() {
    regkeeper_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_validate_accepts_good_config() {
    let config = TestConfig::with_content(VALID);
    regkeeper_cmd()
        .arg("--config")
        .arg(config.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 setting(s)"))
        .stdout(predicate::str::contains("Configuration is valid."));
}

#[test]
fn test_validate_reports_bad_lines() {
    let config = TestConfig::with_content(
        r#"settings = ['HKCU\Console\CursorSize|DWORD|25', 'HKCU\Console\CursorSize|DWORD|big']"#,
    );
    regkeeper_cmd()
        .arg("--config")
        .arg(config.path())
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("line 2"))
        .stderr(predicate::str::contains("1 setting(s) failed to parse"));
}

#[test]
fn test_validate_json() {
    let config = TestConfig::with_content(VALID);
    let output = regkeeper_cmd()
        .arg("validate")
        .arg("--json")
        .arg("--config")
        .arg(config.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["settings"].as_array().unwrap().len(), 2);
    assert!(json["errors"].as_array().unwrap().is_empty());
}

#[test]
fn test_config_from_environment() {
    let config = TestConfig::with_content(VALID);
    regkeeper_cmd()
        .env("REGKEEPER_CONFIG", config.path())
        .arg("validate")
        .assert()
        .success();
}

#[test]
fn test_missing_config_fails() {
    let config = TestConfig::new();
    regkeeper_cmd()
        .arg("--config")
        .arg(config.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration not found"));
}

#[test]
fn test_malformed_config_names_the_file() {
    let config = TestConfig::with_content("settings = [");
    regkeeper_cmd()
        .arg("--config")
        .arg(config.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("regkeeper.toml"));
}

#[cfg(not(windows))]
#[test]
fn test_check_needs_a_registry() {
    let config = TestConfig::with_content(VALID);
    regkeeper_cmd()
        .arg("--config")
        .arg(config.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not available"));
}
