//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout env-matrix:
//! the validated [`Matrix`] and its [`Environment`]s, and the per-invocation
//! execution records ([`CommandRecord`], [`EnvReport`], [`RunReport`]).
//!
//! 此模块定义了 env-matrix 中使用的核心数据结构：经过验证的 [`Matrix`]
//! 及其 [`Environment`]，以及每次调用的执行记录。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::resolver::Selection;
use crate::error::{ConfigError, StateError};

/// A single declared command, already split into an argument vector.
/// 单条已声明的命令，已拆分为参数向量。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    /// The command text as declared, without the leading `-` marker.
    pub raw: String,
    pub argv: Vec<String>,
    /// Set by a leading `-`: a non-zero exit is recorded but never fails
    /// the environment.
    pub ignore_exit: bool,
}

impl CommandLine {
    /// Parses one command line of environment `env`.
    ///
    /// Unbalanced quotes or an empty command are configuration errors.
    pub fn parse(env: &str, line: &str) -> Result<Self, ConfigError> {
        let trimmed = line.trim();
        let (ignore_exit, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };

        let malformed = || ConfigError::MalformedCommand {
            env: env.to_string(),
            command: line.to_string(),
        };
        let argv = shlex::split(body).ok_or_else(malformed)?;
        if argv.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            raw: body.to_string(),
            argv,
            ignore_exit,
        })
    }
}

/// Where an environment's dependencies come from.
/// 环境依赖的来源。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DependencySource {
    /// `-r <path>`: a requirements file, relative to the config directory.
    File(PathBuf),
    /// `-e <path>`: an editable install.
    Editable(String),
    /// A literal package specifier such as `black>=23`.
    Package(String),
    /// `-c <path>`: a constraints file, forwarded to pip as is.
    Constraint(PathBuf),
    /// Any other pip option (`--index-url URL`, `--pre`, `-f DIR`), split
    /// into arguments and forwarded in place.
    PipOption(Vec<String>),
}

impl DependencySource {
    /// Parses one `deps` entry of environment `env`.
    pub fn parse(env: &str, entry: &str) -> Result<Self, ConfigError> {
        let entry = entry.trim();
        let malformed = || ConfigError::MalformedDependency {
            env: env.to_string(),
            entry: entry.to_string(),
        };

        let option_value = |flag_short: &str, flag_long: &str| -> Option<String> {
            entry
                .strip_prefix(flag_long)
                .filter(|rest| rest.is_empty() || rest.starts_with([' ', '=']))
                .map(|rest| rest.trim_start_matches('=').trim().to_string())
                .or_else(|| entry.strip_prefix(flag_short).map(|rest| rest.trim().to_string()))
        };

        if entry.starts_with('-') {
            if let Some(path) = option_value("-r", "--requirement") {
                if path.is_empty() {
                    return Err(malformed());
                }
                return Ok(DependencySource::File(PathBuf::from(path)));
            }
            if let Some(target) = option_value("-e", "--editable") {
                if target.is_empty() {
                    return Err(malformed());
                }
                return Ok(DependencySource::Editable(target));
            }
            if let Some(path) = option_value("-c", "--constraint") {
                if path.is_empty() {
                    return Err(malformed());
                }
                return Ok(DependencySource::Constraint(PathBuf::from(path)));
            }
            if !entry.trim_start_matches('-').starts_with(|c: char| c.is_ascii_alphabetic()) {
                return Err(malformed());
            }
            let args = shlex::split(entry).ok_or_else(malformed)?;
            return Ok(DependencySource::PipOption(args));
        }

        if entry.is_empty() {
            return Err(malformed());
        }
        Ok(DependencySource::Package(entry.to_string()))
    }
}

impl DependencySource {
    /// Whether pip installs something for this entry. Constraints and
    /// options only shape how other entries are installed.
    pub fn is_requirement(&self) -> bool {
        matches!(self, DependencySource::Editable(_) | DependencySource::Package(_))
    }
}

impl std::fmt::Display for DependencySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencySource::File(path) => write!(f, "-r {}", path.display()),
            DependencySource::Editable(target) => write!(f, "-e {target}"),
            DependencySource::Package(spec) => f.write_str(spec),
            DependencySource::Constraint(path) => write!(f, "-c {}", path.display()),
            DependencySource::PipOption(args) => f.write_str(&args.join(" ")),
        }
    }
}

/// A named, isolated execution unit.
/// 一个具名的、隔离的执行单元。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    pub description: Option<String>,
    /// Interpreter selector; advisory.
    pub basepython: Option<String>,
    pub commands: Vec<CommandLine>,
    /// Deduplicated union of the base section's and the environment's sources.
    pub deps: Vec<DependencySource>,
    pub ignore_errors: bool,
    pub setenv: BTreeMap<String, String>,
    /// Working directory for commands, relative to the config directory.
    pub changedir: Option<PathBuf>,
    /// Per-command timeout.
    pub timeout: Option<Duration>,
}

impl Environment {
    /// The interpreter this environment asks for: `basepython` when set,
    /// otherwise derived from a `pyXY` factor of the name (`py310` gives
    /// `python3.10`, `py3` gives `python3`), otherwise `python3`.
    pub fn interpreter_selector(&self) -> String {
        if let Some(base) = &self.basepython {
            return base.clone();
        }
        self.name
            .split('-')
            .find_map(interpreter_from_factor)
            .unwrap_or_else(|| "python3".to_string())
    }
}

fn interpreter_from_factor(factor: &str) -> Option<String> {
    if let Some(digits) = factor.strip_prefix("pypy") {
        if digits.chars().all(|c| c.is_ascii_digit()) {
            return Some(match digits.len() {
                0 => "pypy".to_string(),
                1 => format!("pypy{digits}"),
                _ => format!("pypy{}.{}", &digits[..1], &digits[1..]),
            });
        }
        return None;
    }
    let digits = factor.strip_prefix("py")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(match digits.len() {
        1 => format!("python{digits}"),
        _ => format!("python{}.{}", &digits[..1], &digits[1..]),
    })
}

/// Maps an interpreter-version label to the environments it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionBinding {
    pub label: String,
    pub environments: Vec<String>,
}

/// The validated, immutable matrix definition.
/// 经过验证的不可变矩阵定义。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    /// Default selection, in declared order.
    pub envlist: Vec<String>,
    pub bindings: Vec<VersionBinding>,
    pub skip_missing_interpreters: bool,
    pub environments: BTreeMap<String, Environment>,
    /// Directory of the configuration file; base for relative paths.
    pub config_dir: PathBuf,
}

impl Matrix {
    /// Checks that every id named by `envlist` or a binding is defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for id in &self.envlist {
            self.require(id, "envlist")?;
        }
        for binding in &self.bindings {
            for id in &binding.environments {
                self.require(id, &format!("version binding '{}'", binding.label))?;
            }
        }
        Ok(())
    }

    /// Looks up an environment, failing with a configuration error that
    /// names `origin` when it is not defined.
    pub fn require(&self, id: &str, origin: &str) -> Result<&Environment, ConfigError> {
        self.environments
            .get(id)
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                id: id.to_string(),
                origin: origin.to_string(),
            })
    }

    /// Returns the binding for exactly `label`.
    pub fn binding(&self, label: &str) -> Option<&VersionBinding> {
        self.bindings.iter().find(|b| b.label == label)
    }
}

/// Lifecycle of one environment within a run.
/// 运行中单个环境的生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl EnvStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, EnvStatus::Passed | EnvStatus::Failed | EnvStatus::Skipped)
    }

    /// `Pending -> Running -> {Passed, Failed}` and `Pending -> Skipped`.
    pub fn can_transition_to(self, next: EnvStatus) -> bool {
        matches!(
            (self, next),
            (EnvStatus::Pending, EnvStatus::Running)
                | (EnvStatus::Pending, EnvStatus::Skipped)
                | (EnvStatus::Running, EnvStatus::Passed)
                | (EnvStatus::Running, EnvStatus::Failed)
        )
    }
}

/// Outcome of a single command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommandStatus {
    Succeeded,
    Failed { exit_code: Option<i32> },
    TimedOut,
    /// The command could not be started or its arguments not expanded.
    Error { message: String },
    /// An earlier command aborted the environment.
    NotRun,
}

/// Execution record of one command.
/// 单条命令的执行记录。
#[derive(Debug, Clone, Serialize)]
pub struct CommandRecord {
    pub command: String,
    pub status: CommandStatus,
    /// A failure that did not count against the environment.
    pub ignored: bool,
    pub output: String,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl CommandRecord {
    pub fn not_run(command: &CommandLine) -> Self {
        Self {
            command: command.raw.clone(),
            status: CommandStatus::NotRun,
            ignored: false,
            output: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// Whether the command ran (or tried to) and did not succeed.
    pub fn is_failure(&self) -> bool {
        !matches!(self.status, CommandStatus::Succeeded | CommandStatus::NotRun)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            CommandStatus::Succeeded => Some(0),
            CommandStatus::Failed { exit_code } => exit_code,
            _ => None,
        }
    }
}

/// Execution record of one environment.
/// 单个环境的执行记录。
#[derive(Debug, Clone, Serialize)]
pub struct EnvReport {
    pub name: String,
    pub status: EnvStatus,
    pub interpreter: Option<PathBuf>,
    /// Why the environment was skipped or failed before running commands.
    pub note: Option<String>,
    /// Output captured while installing dependencies.
    pub provision_output: Option<String>,
    pub commands: Vec<CommandRecord>,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl EnvReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: EnvStatus::Pending,
            interpreter: None,
            note: None,
            provision_output: None,
            commands: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Moves to `next`, rejecting transitions the lifecycle forbids.
    pub fn transition(&mut self, next: EnvStatus) -> Result<(), StateError> {
        if !self.status.can_transition_to(next) {
            return Err(StateError {
                env: self.name.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Commands whose failure counts against the environment.
    pub fn failed_commands(&self) -> impl Iterator<Item = &CommandRecord> {
        self.commands.iter().filter(|c| c.is_failure() && !c.ignored)
    }
}

/// The full result of one invocation.
/// 一次调用的完整结果。
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub selection: Selection,
    pub environments: Vec<EnvReport>,
    pub started_at: DateTime<Local>,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl RunReport {
    /// Passed only if every non-skipped environment passed.
    pub fn passed(&self) -> bool {
        self.environments
            .iter()
            .all(|e| matches!(e.status, EnvStatus::Passed | EnvStatus::Skipped))
    }

    /// Process exit code for this run: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }

    pub fn count(&self, status: EnvStatus) -> usize {
        self.environments.iter().filter(|e| e.status == status).count()
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
