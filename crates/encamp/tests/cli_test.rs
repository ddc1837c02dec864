use assert_cmd::Command;
use predicates::prelude::*;

/// A malformed invocation reports usage and exits with the fixed status.
#[test]
fn no_arguments_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("encamp").unwrap();
    cmd.assert()
        .code(22)
        .stderr(predicate::str::contains("Usage"))
        .stderr(predicate::str::contains("encamp"));
}

#[test]
fn an_unknown_mode_word_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("encamp").unwrap();
    cmd.arg("my-eg")
        .arg("destroy")
        .assert()
        .code(22)
        .stderr(predicate::str::contains("delete"));
}

#[test]
fn extra_arguments_are_a_usage_error() {
    let mut cmd = Command::cargo_bin("encamp").unwrap();
    cmd.arg("my-eg").arg("delete").arg("now").assert().code(22);
}

#[test]
fn help_names_both_modes() {
    let mut cmd = Command::cargo_bin("encamp").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("eg-id"));
}

#[test]
fn version_is_reported() {
    let mut cmd = Command::cargo_bin("encamp").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("encamp"));
}
