// Shared test helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use env_matrix::config;
use env_matrix::core::execution::ExecOptions;
use env_matrix::core::models::{DependencySource, Matrix};
use env_matrix::core::provision::{IsolatedContext, ProvisionRequest, Provisioner};
use env_matrix::error::ProvisionError;
use tempfile::{TempDir, tempdir};

/// The matrix used throughout the resolver tests: a `3.10` binding selects
/// `py310`, `lint` and `mypy`; the default envlist is `py310`, `py311`.
pub const SAMPLE_TOML: &str = r#"
envlist = ["py310", "py311"]
skip_missing_interpreters = false

[versions]
"3.10" = ["py310", "lint", "mypy"]
"3.11" = ["py311"]

[base]
deps = ["pytest"]
commands = ["pytest {posargs}"]

[env.py310]
basepython = "python3.10"

[env.py311]
basepython = "python3.11"

[env.lint]
deps = ["ruff"]
commands = ["ruff check ."]

[env.mypy]
deps = ["mypy"]
commands = ["mypy src"]
"#;

/// The same matrix as [`SAMPLE_TOML`], in the INI format.
pub const SAMPLE_INI: &str = r#"
[tox]
envlist = py310, py311
skip_missing_interpreters = false

[gh-actions]
python =
    3.10: py310, lint, mypy
    3.11: py311

[testenv]
deps = pytest
commands = pytest {posargs}

[testenv:py310]
basepython = python3.10

[testenv:py311]
basepython = python3.11

[testenv:lint]
deps = ruff
commands = ruff check .

[testenv:mypy]
deps = mypy
commands = mypy src
"#;

/// Writes `content` as `name` into a fresh temporary directory.
pub fn write_config(name: &str, content: &str) -> (TempDir, PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let path = temp_dir.path().join(name);
    fs::write(&path, content).expect("Failed to write config");
    (temp_dir, path)
}

/// Loads a TOML matrix; the returned `TempDir` is its config directory.
pub fn load_toml(content: &str) -> (TempDir, Matrix) {
    let (dir, path) = write_config("EnvMatrix.toml", content);
    let matrix = config::load_matrix(&path).expect("matrix should load");
    (dir, matrix)
}

/// Loads an INI matrix; the returned `TempDir` is its config directory.
pub fn load_ini(content: &str) -> (TempDir, Matrix) {
    let (dir, path) = write_config("tox.ini", content);
    let matrix = config::load_matrix(&path).expect("matrix should load");
    (dir, matrix)
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write file");
    path
}

/// Options for tests: sequential, no console echo.
pub fn quiet_options() -> ExecOptions {
    ExecOptions {
        echo_output: false,
        ..ExecOptions::default()
    }
}

/// A provisioner that never touches the network: interpreters are "found"
/// unless listed in `missing`, and installs are recorded instead of run.
/// With `fail_install`, every install that has dependencies fails.
#[derive(Default)]
pub struct StubProvisioner {
    pub missing: Vec<String>,
    pub fail_install: bool,
    pub installs: Mutex<Vec<(String, Vec<DependencySource>)>>,
}

impl StubProvisioner {
    pub fn missing(selectors: &[&str]) -> Self {
        Self {
            missing: selectors.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_install() -> Self {
        Self {
            fail_install: true,
            ..Self::default()
        }
    }

    pub fn installed(&self) -> Vec<(String, Vec<DependencySource>)> {
        self.installs.lock().unwrap().clone()
    }
}

impl Provisioner for StubProvisioner {
    async fn locate_interpreter(&self, selector: &str) -> Option<PathBuf> {
        if self.missing.iter().any(|m| m == selector) {
            None
        } else {
            Some(PathBuf::from(format!("/stub/bin/{selector}")))
        }
    }

    async fn install(
        &self,
        request: &ProvisionRequest<'_>,
        _ctx: &mut IsolatedContext,
    ) -> Result<Option<String>, ProvisionError> {
        self.installs
            .lock()
            .unwrap()
            .push((request.env.name.clone(), request.deps.to_vec()));
        if self.fail_install && !request.deps.is_empty() {
            return Err(ProvisionError::Install {
                code: Some(1),
                output: "ERROR: No matching distribution found".to_string(),
            });
        }
        Ok(Some(format!("installed {} packages", request.deps.len())))
    }
}
