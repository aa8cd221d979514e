//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides utilities for file system operations, such as
//! creating isolated environment directories and locating executables.
//!
//! 此模块提供文件系统操作的实用功能，如创建隔离的环境目录和查找可执行文件。

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a unique, temporary directory for an environment.
///
/// The directory lives under `work_dir` when given (created if missing),
/// otherwise under the system temporary directory. It is removed when the
/// returned `TempDir` is dropped.
pub fn create_env_dir(work_dir: Option<&Path>, env_name: &str) -> std::io::Result<TempDir> {
    let sanitized_name = env_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    let prefix = format!("env_matrix_{sanitized_name}_");

    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix);
    match work_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            builder.tempdir_in(dir)
        }
        None => builder.tempdir(),
    }
}

/// Locates `name` as an executable.
///
/// A name containing a path separator is checked as-is. Otherwise each of
/// `extra_dirs` is searched first, then the directories of `PATH`.
pub fn find_executable(name: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path_dirs = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    extra_dirs
        .iter()
        .chain(path_dirs.iter())
        .flat_map(|dir| executable_names(name).into_iter().map(move |n| dir.join(n)))
        .find(|path| is_executable(path))
}

/// Builds a `PATH` value with `dirs` in front of the current `PATH`.
pub fn prepend_path(dirs: &[PathBuf]) -> Option<OsString> {
    let current = env::var_os("PATH").unwrap_or_default();
    let combined = dirs
        .iter()
        .cloned()
        .chain(env::split_paths(&current))
        .collect::<Vec<_>>();
    env::join_paths(combined).ok()
}

#[cfg(windows)]
fn executable_names(name: &str) -> Vec<String> {
    if Path::new(name).extension().is_some() {
        return vec![name.to_string()];
    }
    vec![format!("{name}.exe"), format!("{name}.cmd"), format!("{name}.bat"), name.to_string()]
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
