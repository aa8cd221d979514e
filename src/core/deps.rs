//! # Dependency Resolution / 依赖解析
//!
//! Expands an environment's dependency sources into one flat, deduplicated
//! list. Requirement files are read (following nested `-r` includes) and
//! their entries merged with the literal specifiers; nothing replaces
//! anything, the first occurrence of an entry wins. Constraint files and
//! other pip options found along the way are kept and forwarded to pip.
//!
//! 将环境的依赖来源展开为一个扁平、去重的列表。

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::models::DependencySource;
use crate::error::ProvisionError;

/// Resolves `sources` into pip entries (never `File`), relative to
/// `base_dir`. Constraint paths are made relative to `base_dir` or the
/// requirements file that named them.
pub fn resolve_dependencies(
    sources: &[DependencySource],
    base_dir: &Path,
) -> Result<Vec<DependencySource>, ProvisionError> {
    let mut resolved = Vec::new();
    let mut seen = HashSet::new();
    let mut visited_files = HashSet::new();

    for source in sources {
        collect(source, base_dir, &mut resolved, &mut seen, &mut visited_files)?;
    }
    Ok(resolved)
}

fn collect(
    source: &DependencySource,
    base_dir: &Path,
    resolved: &mut Vec<DependencySource>,
    seen: &mut HashSet<DependencySource>,
    visited_files: &mut HashSet<PathBuf>,
) -> Result<(), ProvisionError> {
    match source {
        DependencySource::File(relative) => {
            let path = base_dir.join(relative);
            if !visited_files.insert(path.clone()) {
                return Ok(());
            }
            let text = fs::read_to_string(&path).map_err(|source| ProvisionError::DependencyFile {
                path: path.clone(),
                source,
            })?;
            let file_dir = path.parent().unwrap_or(base_dir).to_path_buf();
            for entry in requirement_entries(&text) {
                collect(&entry, &file_dir, resolved, seen, visited_files)?;
            }
        }
        DependencySource::Constraint(relative) => {
            let constraint = DependencySource::Constraint(base_dir.join(relative));
            if seen.insert(constraint.clone()) {
                resolved.push(constraint);
            }
        }
        other => {
            if seen.insert(other.clone()) {
                resolved.push(other.clone());
            }
        }
    }
    Ok(())
}

/// Parses the entries of a requirements file. Lines that are not valid
/// entries are skipped with a warning.
fn requirement_entries(text: &str) -> Vec<DependencySource> {
    text.lines()
        .map(strip_comment)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match DependencySource::parse("requirements", line) {
            Ok(source) => Some(source),
            Err(_) => {
                tracing::warn!(line, "skipping malformed requirements line");
                None
            }
        })
        .collect()
}

fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Arguments for `pip install` covering `deps`.
pub fn pip_args(deps: &[DependencySource]) -> Vec<String> {
    deps.iter()
        .flat_map(|dep| match dep {
            DependencySource::File(path) => vec!["-r".to_string(), path.display().to_string()],
            DependencySource::Editable(target) => vec!["-e".to_string(), target.clone()],
            DependencySource::Package(spec) => vec![spec.clone()],
            DependencySource::Constraint(path) => vec!["-c".to_string(), path.display().to_string()],
            DependencySource::PipOption(args) => args.clone(),
        })
        .collect()
}
