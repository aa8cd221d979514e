//! # File System Utilities Unit Tests / 文件系统工具单元测试
//!
//! Tests for isolated environment directories and executable lookup.
//!
//! 测试隔离环境目录和可执行文件查找。

use env_matrix::infra::fs::{create_env_dir, find_executable, prepend_path};
use std::path::PathBuf;

#[cfg(test)]
mod create_env_dir_tests {
    use super::*;

    #[test]
    fn test_create_env_dir_sanitizes_name() {
        let dir = create_env_dir(None, "py310-lint@v2").unwrap();
        let name = dir.path().file_name().unwrap().to_string_lossy().to_string();

        assert!(dir.path().is_dir());
        assert!(name.starts_with("env_matrix_py310_lint_v2_"));
    }

    #[test]
    fn test_create_env_dir_unique_directories() {
        let first = create_env_dir(None, "unit").unwrap();
        let second = create_env_dir(None, "unit").unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_create_env_dir_under_missing_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = root.path().join("nested").join("work");

        let dir = create_env_dir(Some(&work_dir), "docs").unwrap();
        assert!(dir.path().starts_with(&work_dir));
    }

    #[test]
    fn test_create_env_dir_cleanup_on_drop() {
        let path = {
            let dir = create_env_dir(None, "cleanup").unwrap();
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}

#[cfg(all(test, unix))]
mod find_executable_tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_find_executable_on_path() {
        let sh = find_executable("sh", &[]).expect("sh should be on PATH");
        assert!(sh.is_absolute());
    }

    #[test]
    fn test_extra_dirs_are_searched_first() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("sh");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(find_executable("sh", &[dir.path().to_path_buf()]), Some(tool));
    }

    #[test]
    fn test_non_executable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("not-a-tool"), "data").unwrap();

        assert_eq!(find_executable("not-a-tool", &[dir.path().to_path_buf()]), None);
        assert_eq!(find_executable(&dir.path().join("not-a-tool").display().to_string(), &[]), None);
    }

    #[test]
    fn test_prepend_path_puts_dirs_first() {
        let extra = PathBuf::from("/opt/env/bin");
        let joined = prepend_path(std::slice::from_ref(&extra)).unwrap();
        let first = std::env::split_paths(&joined).next().unwrap();
        assert_eq!(first, extra);
    }
}
