//! # CLI Tests / CLI 测试
//!
//! End-to-end tests of the `env-matrix` binary. Runs use `--no-provision`
//! with `sh` as the interpreter so no Python installation is needed.
//!
//! `env-matrix` 可执行文件的端到端测试。运行时使用 `--no-provision`，
//! 并以 `sh` 作为解释器，因此不需要安装 Python。

mod common;

use assert_cmd::prelude::*;
use common::{SAMPLE_TOML, write_config};
use predicates::prelude::*;
use std::process::Command;

fn env_matrix() -> Command {
    let mut cmd = Command::cargo_bin("env-matrix").unwrap();
    cmd.arg("--lang").arg("en");
    cmd
}

/// This test lists the environments a `3.10` interpreter would run and
/// checks that the selection source is reported.
///
/// 这个测试列出 `3.10` 解释器将会运行的环境，并检查选择来源是否被报告。
#[test]
fn test_list_uses_version_binding() {
    let (dir, _) = write_config("EnvMatrix.toml", SAMPLE_TOML);

    env_matrix()
        .args(["list", "--python", "3.10", "--project-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("version binding 3.10"))
        .stdout(predicate::str::contains("mypy"))
        .stdout(predicate::str::contains("py311").not());
}

#[test]
fn test_list_explicit_environment_wins() {
    let (dir, _) = write_config("EnvMatrix.toml", SAMPLE_TOML);

    env_matrix()
        .args(["list", "--python", "3.10", "-e", "lint", "--project-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("explicit request"))
        .stdout(predicate::str::contains("mypy").not());
}

#[test]
fn test_list_all_shows_bindings() {
    let (dir, path) = write_config("EnvMatrix.toml", SAMPLE_TOML);

    env_matrix()
        .args(["list", "--all", "--python", "3.11", "--config"])
        .arg(&path)
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Version bindings:"))
        .stdout(predicate::str::contains("py310, lint, mypy"));
}

#[cfg(unix)]
#[test]
fn test_successful_run_exits_zero() {
    let (dir, _) = write_config(
        "EnvMatrix.toml",
        r#"
envlist = ["unit", "lint"]
[base]
basepython = "sh"
[env.unit]
commands = ["test {posargs} = hello"]
[env.lint]
commands = ["-false", "true"]
"#,
    );

    env_matrix()
        .args(["run", "--no-provision", "--project-dir"])
        .arg(dir.path())
        .args(["--", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All environments passed."));
}

#[cfg(unix)]
#[test]
fn test_failed_environment_exits_one_and_writes_reports() {
    let (dir, _) = write_config(
        "tox.ini",
        r#"
[tox]
envlist = ok, broken

[testenv]
basepython = sh

[testenv:ok]
commands = true

[testenv:broken]
commands =
    sh -c "echo boom; exit 4"
    true
"#,
    );
    let json_path = dir.path().join("report.json");
    let html_path = dir.path().join("report.html");

    env_matrix()
        .args(["run", "--no-provision", "-q", "--project-dir"])
        .arg(dir.path())
        .arg("--json")
        .arg(&json_path)
        .arg("--html")
        .arg(&html_path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Failure details"))
        .stdout(predicate::str::contains("boom"))
        .stdout(predicate::str::contains("Some environments failed."));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["passed"], false);
    assert_eq!(json["environments"][0]["status"], "passed");
    assert_eq!(json["environments"][1]["commands"][0]["status"]["exit_code"], 4);
    assert_eq!(json["environments"][1]["commands"][1]["status"]["state"], "not_run");
    assert!(html_path.exists());
}

#[cfg(unix)]
#[test]
fn test_missing_interpreter_skipped_exits_zero() {
    let (dir, _) = write_config(
        "EnvMatrix.toml",
        r#"
envlist = ["py27", "unit"]
skip_missing_interpreters = true
[env.py27]
basepython = "python2.7-not-installed"
commands = ["true"]
[env.unit]
basepython = "sh"
commands = ["true"]
"#,
    );

    env_matrix()
        .args(["run", "--no-provision", "--project-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("SKIPPED"));
}

#[test]
fn test_undefined_environment_reference_exits_two() {
    let (dir, _) = write_config(
        "EnvMatrix.toml",
        r#"
envlist = ["unit", "docs"]
[env.unit]
commands = ["true"]
"#,
    );

    env_matrix()
        .args(["run", "--no-provision", "--project-dir"])
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown environment 'docs'"));
}

#[test]
fn test_unknown_requested_environment_exits_two() {
    let (dir, _) = write_config("EnvMatrix.toml", SAMPLE_TOML);

    env_matrix()
        .args(["run", "-e", "nope", "--python", "3.10", "--project-dir"])
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_missing_config_exits_two() {
    let dir = tempfile::tempdir().unwrap();

    env_matrix()
        .args(["list", "--project-dir"])
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no configuration file found"));
}

#[test]
fn test_init_writes_loadable_matrix() {
    for (format, file) in [("toml", "EnvMatrix.toml"), ("ini", "tox.ini")] {
        let dir = tempfile::tempdir().unwrap();

        env_matrix()
            .args(["init", "--non-interactive", "--format", format])
            .current_dir(dir.path())
            .assert()
            .success();
        assert!(dir.path().join(file).exists(), "{file} was not written");

        env_matrix()
            .args(["list", "--python", "3.12", "--project-dir"])
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("py312"))
            .stdout(predicate::str::contains("lint"));
    }
}

#[test]
fn test_init_never_overwrites_non_interactively() {
    let (dir, path) = write_config("EnvMatrix.toml", SAMPLE_TOML);

    env_matrix()
        .args(["init", "--non-interactive"])
        .current_dir(dir.path())
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(path).unwrap(), SAMPLE_TOML);
}

#[test]
fn test_chinese_output() {
    let (dir, _) = write_config("EnvMatrix.toml", SAMPLE_TOML);

    Command::cargo_bin("env-matrix")
        .unwrap()
        .args(["--lang", "zh-CN", "list", "--python", "3.11", "--project-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("选中的环境"));
}
