//! # Configuration Module / 配置模块
//!
//! Loads the matrix definition. Two surface formats are accepted: the
//! tox-style INI dialect and TOML. Both are read into the same raw
//! [`MatrixConfig`] which [`build_matrix`] then validates into an immutable
//! [`Matrix`].
//!
//! 加载矩阵定义。支持两种格式：tox 风格的 INI 方言和 TOML。
//! 两者都被读入相同的 [`MatrixConfig`]，然后由 [`build_matrix`] 验证为不可变的 [`Matrix`]。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::ini::{self, IniDocument, Section};
use crate::core::models::{CommandLine, DependencySource, Environment, Matrix, VersionBinding};
use crate::error::ConfigError;

/// File names searched, in order, when no config path is given.
pub const CONFIG_CANDIDATES: [&str; 2] = ["EnvMatrix.toml", "tox.ini"];

/// Settings for one environment, or for the base section all environments
/// inherit from. Every field is optional so inheritance can tell "unset"
/// apart from "set to the default".
/// 单个环境（或所有环境继承的基础部分）的设置。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basepython: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_errors: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub setenv: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changedir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// The matrix exactly as written, before validation.
/// 验证前按原样书写的矩阵。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixConfig {
    #[serde(default)]
    pub envlist: Vec<String>,
    #[serde(default)]
    pub skip_missing_interpreters: bool,
    /// Interpreter-version label to environment ids.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub versions: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<EnvConfig>,
    #[serde(default, rename = "env")]
    pub envs: BTreeMap<String, EnvConfig>,
}

/// Finds the configuration file in `dir`.
pub fn discover(dir: &Path) -> Result<PathBuf, ConfigError> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| ConfigError::NotFound {
            dir: dir.to_path_buf(),
            candidates: CONFIG_CANDIDATES.join(", "),
        })
}

/// Reads and validates the matrix at `path`. The format follows the file
/// extension: `.toml` is TOML, anything else is INI.
pub fn load_matrix(path: &Path) -> Result<Matrix, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config = if path.extension().is_some_and(|ext| ext == "toml") {
        parse_toml(&text).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?
    } else {
        parse_ini(&text)?
    };

    let config_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!(path = %path.display(), envs = config.envs.len(), "loaded matrix configuration");
    build_matrix(config, config_dir)
}

/// Parses the TOML format.
pub fn parse_toml(text: &str) -> Result<MatrixConfig, String> {
    toml::from_str(text).map_err(|e| e.to_string())
}

/// Parses the tox-style INI format.
///
/// Recognised sections: `[tox]` (alias `[matrix]`) for globals,
/// `[gh-actions]` for version bindings, `[testenv]` for the base section and
/// `[testenv:<id>]` for each environment. Other sections are ignored.
pub fn parse_ini(text: &str) -> Result<MatrixConfig, ConfigError> {
    let doc = IniDocument::parse(text)?;
    let mut config = MatrixConfig::default();

    if let Some(globals) = doc.section("tox").or_else(|| doc.section("matrix")) {
        if let Some(list) = globals.get("envlist") {
            config.envlist = ini::split_list(list);
        }
        if let Some(flag) = globals.get("skip_missing_interpreters") {
            config.skip_missing_interpreters = ini::parse_bool("skip_missing_interpreters", flag)?;
        }
    }

    if let Some(bindings) = doc.section("gh-actions").and_then(|s| s.get("python")) {
        for line in ini::split_lines(bindings) {
            let (label, envs) = parse_binding_line(&line)?;
            if config.versions.insert(label.clone(), envs).is_some() {
                return Err(ConfigError::MalformedBinding {
                    entry: line,
                    reason: format!("label '{label}' is bound more than once"),
                });
            }
        }
    }

    for section in &doc.sections {
        if section.name == "testenv" {
            config.base = Some(env_from_section(section)?);
        } else if let Some(id) = section.name.strip_prefix("testenv:") {
            let id = id.trim();
            if id.is_empty() {
                return Err(ConfigError::Syntax {
                    line: section.line,
                    message: "environment section without a name".to_string(),
                });
            }
            config.envs.insert(id.to_string(), env_from_section(section)?);
        }
    }

    Ok(config)
}

/// Parses one `label: env, env` binding line.
fn parse_binding_line(line: &str) -> Result<(String, Vec<String>), ConfigError> {
    let malformed = |reason: &str| ConfigError::MalformedBinding {
        entry: line.to_string(),
        reason: reason.to_string(),
    };
    let (label, envs) = line
        .split_once(':')
        .ok_or_else(|| malformed("expected 'label: env, env'"))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(malformed("empty interpreter label"));
    }
    let envs = ini::split_list(envs);
    if envs.is_empty() {
        return Err(malformed("no environments listed"));
    }
    Ok((label.to_string(), envs))
}

fn env_from_section(section: &Section) -> Result<EnvConfig, ConfigError> {
    let mut env = EnvConfig {
        description: section.get("description").map(str::to_string),
        basepython: section.get("basepython").map(str::to_string),
        commands: section.get("commands").map(ini::split_lines),
        deps: section.get("deps").map(ini::split_lines).unwrap_or_default(),
        changedir: section.get("changedir").map(PathBuf::from),
        ..EnvConfig::default()
    };

    if let Some(flag) = section.get("ignore_errors") {
        env.ignore_errors = Some(ini::parse_bool("ignore_errors", flag)?);
    }

    if let Some(entry) = section.entry("timeout") {
        let secs = entry.value.parse::<u64>().map_err(|_| ConfigError::Syntax {
            line: entry.line,
            message: format!("timeout must be a whole number of seconds, found '{}'", entry.value),
        })?;
        env.timeout_secs = Some(secs);
    }

    if let Some(entry) = section.entry("setenv") {
        for line in ini::split_lines(&entry.value) {
            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Syntax {
                line: entry.line,
                message: format!("setenv entries must be KEY=VALUE, found '{line}'"),
            })?;
            env.setenv.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok(env)
}

/// Writes `config` in the INI format. [`parse_ini`] reads the output back
/// into an equal [`MatrixConfig`].
pub fn render_ini(config: &MatrixConfig) -> String {
    let mut out = String::new();

    out.push_str("[tox]\n");
    out.push_str(&format!("envlist = {}\n", config.envlist.join(", ")));
    out.push_str(&format!(
        "skip_missing_interpreters = {}\n",
        config.skip_missing_interpreters
    ));

    if !config.versions.is_empty() {
        out.push_str("\n[gh-actions]\npython =\n");
        for (label, envs) in &config.versions {
            out.push_str(&format!("    {label}: {}\n", envs.join(", ")));
        }
    }

    if let Some(base) = &config.base {
        out.push_str("\n[testenv]\n");
        write_env_section(&mut out, base);
    }

    for (id, env) in &config.envs {
        out.push_str(&format!("\n[testenv:{id}]\n"));
        write_env_section(&mut out, env);
    }

    out
}

fn write_env_section(out: &mut String, env: &EnvConfig) {
    let multi = |out: &mut String, key: &str, lines: &[String]| {
        out.push_str(&format!("{key} =\n"));
        for line in lines {
            out.push_str(&format!("    {line}\n"));
        }
    };

    if let Some(description) = &env.description {
        out.push_str(&format!("description = {description}\n"));
    }
    if let Some(basepython) = &env.basepython {
        out.push_str(&format!("basepython = {basepython}\n"));
    }
    if let Some(flag) = env.ignore_errors {
        out.push_str(&format!("ignore_errors = {flag}\n"));
    }
    if let Some(dir) = &env.changedir {
        out.push_str(&format!("changedir = {}\n", dir.display()));
    }
    if let Some(secs) = env.timeout_secs {
        out.push_str(&format!("timeout = {secs}\n"));
    }
    if !env.deps.is_empty() {
        multi(out, "deps", &env.deps);
    }
    if !env.setenv.is_empty() {
        let lines: Vec<String> = env.setenv.iter().map(|(k, v)| format!("{k}={v}")).collect();
        multi(out, "setenv", &lines);
    }
    if let Some(commands) = &env.commands {
        multi(out, "commands", commands);
    }
}

/// Validates a raw configuration into a [`Matrix`].
///
/// Applies base-section inheritance, parses commands and dependency entries,
/// and checks that every referenced environment is defined.
pub fn build_matrix(config: MatrixConfig, config_dir: PathBuf) -> Result<Matrix, ConfigError> {
    let base = config.base.unwrap_or_default();

    let mut environments = BTreeMap::new();
    for (name, env) in config.envs {
        let environment = build_environment(&name, &base, env)?;
        environments.insert(name, environment);
    }

    let bindings = config
        .versions
        .into_iter()
        .map(|(label, environments)| {
            if label.trim().is_empty() {
                return Err(ConfigError::MalformedBinding {
                    entry: format!("{label:?}"),
                    reason: "empty interpreter label".to_string(),
                });
            }
            if environments.is_empty() {
                return Err(ConfigError::MalformedBinding {
                    entry: label,
                    reason: "no environments listed".to_string(),
                });
            }
            Ok(VersionBinding {
                label,
                environments: expand_ids(&environments)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let matrix = Matrix {
        envlist: expand_ids(&config.envlist)?,
        bindings,
        skip_missing_interpreters: config.skip_missing_interpreters,
        environments,
        config_dir,
    };
    matrix.validate()?;
    Ok(matrix)
}

/// Expands factor groups in a list of environment ids, keeping order.
fn expand_ids(ids: &[String]) -> Result<Vec<String>, ConfigError> {
    let mut expanded = Vec::with_capacity(ids.len());
    for id in ids {
        expanded.extend(ini::expand_factors(id)?);
    }
    Ok(expanded)
}

fn build_environment(name: &str, base: &EnvConfig, env: EnvConfig) -> Result<Environment, ConfigError> {
    let commands = env
        .commands
        .as_ref()
        .or(base.commands.as_ref())
        .map(|lines| {
            lines
                .iter()
                .map(|line| CommandLine::parse(name, line))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let mut deps: Vec<DependencySource> = Vec::new();
    for entry in base.deps.iter().chain(env.deps.iter()) {
        let source = DependencySource::parse(name, entry)?;
        if !deps.contains(&source) {
            deps.push(source);
        }
    }

    let mut setenv = base.setenv.clone();
    setenv.extend(env.setenv);

    Ok(Environment {
        name: name.to_string(),
        description: env.description.or_else(|| base.description.clone()),
        basepython: env.basepython.or_else(|| base.basepython.clone()),
        commands,
        deps,
        ignore_errors: env.ignore_errors.or(base.ignore_errors).unwrap_or(false),
        setenv,
        changedir: env.changedir.or_else(|| base.changedir.clone()),
        timeout: env
            .timeout_secs
            .or(base.timeout_secs)
            .map(Duration::from_secs),
    })
}
