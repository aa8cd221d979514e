//! # CLI Commands / CLI 命令
//!
//! Implementations of the `run`, `list` and `init` subcommands, plus the
//! matrix loading they share.

pub mod init;
pub mod list;
pub mod run;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{config, models::Matrix, provision::detect_interpreter_label};
use crate::infra::t;

/// Locates and loads the matrix: `config` when given, otherwise the first
/// known config file in `project_dir`.
pub fn load_matrix(config: Option<&Path>, project_dir: &Path) -> Result<(Matrix, PathBuf)> {
    let config_path = match config {
        Some(path) => path.to_path_buf(),
        None => config::discover(project_dir)?,
    };
    // Absolute, so `{configdir}` and relative paths do not depend on the caller's cwd.
    let config_path = fs::canonicalize(&config_path).unwrap_or(config_path);

    let matrix = config::load_matrix(&config_path)
        .with_context(|| t!("config_parse_failed", path = config_path.display()).to_string())?;
    Ok((matrix, config_path))
}

/// The interpreter label for the invocation context: the explicit value,
/// or the host's `python3` version when the matrix has bindings to match.
pub async fn interpreter_label(explicit: Option<String>, matrix: &Matrix) -> Option<String> {
    if explicit.is_some() || matrix.bindings.is_empty() {
        return explicit;
    }
    let detected = detect_interpreter_label().await;
    tracing::debug!(?detected, "detected host interpreter version");
    detected
}
