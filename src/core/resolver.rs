//! # Environment Matrix Resolver / 环境矩阵解析器
//!
//! Decides which environments run for an invocation. The decision is an
//! explicit tagged value ([`SelectionSource`]) so the fallback chain can be
//! inspected and tested on its own:
//!
//! 1. An explicit request (`-e`) wins.
//! 2. Otherwise a version binding matching the interpreter label.
//! 3. Otherwise the default `envlist`.
//!
//! 决定一次调用中运行哪些环境。选择结果是一个显式的带标签值，
//! 以便单独检查和测试回退链。

use serde::Serialize;
use std::collections::HashSet;

use crate::core::models::{Matrix, VersionBinding};
use crate::error::ConfigError;

/// What the caller knows about the invocation.
/// 调用方对本次调用的已知信息。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// Interpreter-version label available on this host (e.g. `3.10`).
    pub interpreter: Option<String>,
    /// Environments requested explicitly, in order. Empty means none.
    pub requested: Vec<String>,
}

impl InvocationContext {
    pub fn new(interpreter: Option<String>, requested: Vec<String>) -> Self {
        Self {
            interpreter,
            requested,
        }
    }
}

/// How a selection was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SelectionSource {
    /// Requested explicitly on the command line.
    Configured,
    /// Taken from the version binding for `label`.
    InheritedFromVersion { label: String },
    /// The matrix's default `envlist`.
    DefaultFallback,
}

impl std::fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionSource::Configured => f.write_str("explicit request"),
            SelectionSource::InheritedFromVersion { label } => {
                write!(f, "version binding {label}")
            }
            SelectionSource::DefaultFallback => f.write_str("default envlist"),
        }
    }
}

/// The ordered, deduplicated environments to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    #[serde(flatten)]
    pub source: SelectionSource,
    pub environments: Vec<String>,
}

/// Resolves the selection for `ctx` against `matrix`.
///
/// # Errors
/// `ConfigError::UnknownEnvironment` for an explicitly requested id the
/// matrix does not define, and `ConfigError::EmptySelection` when nothing
/// would run.
pub fn resolve(matrix: &Matrix, ctx: &InvocationContext) -> Result<Selection, ConfigError> {
    let (source, candidates) = if !ctx.requested.is_empty() {
        for id in &ctx.requested {
            matrix.require(id, "the command line")?;
        }
        (SelectionSource::Configured, ctx.requested.clone())
    } else if let Some(binding) = ctx
        .interpreter
        .as_deref()
        .and_then(|label| match_binding(matrix, label))
    {
        (
            SelectionSource::InheritedFromVersion {
                label: binding.label.clone(),
            },
            binding.environments.clone(),
        )
    } else {
        (SelectionSource::DefaultFallback, matrix.envlist.clone())
    };

    let environments = dedup(candidates);
    if environments.is_empty() {
        return Err(ConfigError::EmptySelection {
            label: ctx.interpreter.clone(),
        });
    }

    tracing::debug!(%source, ?environments, "resolved environment selection");
    Ok(Selection {
        source,
        environments,
    })
}

/// Finds the binding for `label`: exact match first, then the
/// `major.minor` prefix, then with a `python`/`py` prefix removed.
pub fn match_binding<'m>(matrix: &'m Matrix, label: &str) -> Option<&'m VersionBinding> {
    let label = label.trim();
    let stripped = label
        .strip_prefix("python")
        .or_else(|| label.strip_prefix("py"))
        .unwrap_or(label);

    [label, stripped]
        .into_iter()
        .flat_map(|l| [l.to_string(), major_minor(l)])
        .find_map(|candidate| matrix.binding(&candidate))
}

fn major_minor(label: &str) -> String {
    label.splitn(3, '.').take(2).collect::<Vec<_>>().join(".")
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_minor_truncates_patch() {
        assert_eq!(major_minor("3.10.12"), "3.10");
        assert_eq!(major_minor("3.10"), "3.10");
        assert_eq!(major_minor("3"), "3");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let ids = vec!["a", "b", "a", "c", "b"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedup(ids), vec!["a", "b", "c"]);
    }
}
