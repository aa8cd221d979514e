//! # Error Types / 错误类型
//!
//! Domain errors for matrix loading, environment provisioning and the
//! per-environment state machine. Application code wraps these in
//! `anyhow::Error` with additional context; the CLI downcasts to
//! [`ConfigError`] to pick the process exit code.
//!
//! 矩阵加载、环境准备以及环境状态机的领域错误。

use std::path::PathBuf;
use thiserror::Error;

use crate::core::models::EnvStatus;

/// A fatal problem with the matrix definition. Raised before any environment
/// runs; a run that hits one of these executes nothing.
/// 矩阵定义中的致命问题。在任何环境运行之前抛出。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("invalid boolean for '{key}': {value}")]
    InvalidBool { key: String, value: String },

    #[error("unknown environment '{id}' referenced by {origin}")]
    UnknownEnvironment { id: String, origin: String },

    #[error("invalid factor list '{value}': {reason}")]
    FactorList { value: String, reason: String },

    #[error("malformed version binding '{entry}': {reason}")]
    MalformedBinding { entry: String, reason: String },

    #[error("malformed command in environment '{env}': {command}")]
    MalformedCommand { env: String, command: String },

    #[error("malformed dependency in environment '{env}': {entry}")]
    MalformedDependency { env: String, entry: String },

    /// No explicit request, no matching binding and an empty default list.
    #[error("no environments selected (interpreter: {}); define an envlist or a matching version binding", label.as_deref().unwrap_or("none"))]
    EmptySelection { label: Option<String> },

    #[error("no configuration file found in {dir} (looked for {candidates})")]
    NotFound { dir: PathBuf, candidates: String },
}

/// Failure to prepare the isolated execution context of one environment.
/// 无法为单个环境准备隔离的执行上下文。
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("interpreter '{selector}' could not be found")]
    InterpreterNotFound { selector: String },

    #[error("dependency file {path} could not be read: {source}")]
    DependencyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create isolated context: {0}")]
    Context(#[from] std::io::Error),

    #[error("dependency installation failed with exit code {code:?}")]
    Install { code: Option<i32>, output: String },
}

impl ProvisionError {
    /// Whether this is the missing-interpreter case that
    /// `skip_missing_interpreters` downgrades to a skip.
    pub fn is_missing_interpreter(&self) -> bool {
        matches!(self, ProvisionError::InterpreterNotFound { .. })
    }

    /// Captured tool output associated with the failure, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            ProvisionError::Install { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// An environment was asked to move between states the lifecycle forbids.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal state transition for '{env}': {from:?} -> {to:?}")]
pub struct StateError {
    pub env: String,
    pub from: EnvStatus,
    pub to: EnvStatus,
}
