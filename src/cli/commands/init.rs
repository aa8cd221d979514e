//! # Matrix Initialization Module / 矩阵初始化模块
//!
//! This module provides the `init` command: an interactive wizard that writes
//! a starter matrix, either `EnvMatrix.toml` or a tox-style `tox.ini`.
//!
//! 此模块提供 `init` 命令：一个交互式向导，用于写入初始矩阵配置，
//! 可以是 `EnvMatrix.toml` 或 tox 风格的 `tox.ini`。
//!
//! ## Features / 功能特性
//!
//! - **Interactive Wizard**: pick interpreter versions and tool environments
//! - **Version Bindings**: each version label runs its own test environment
//! - **Overwrite Protection**: confirmation before replacing an existing file
//!
//! - **交互式向导**: 选择解释器版本和工具环境
//! - **版本绑定**: 每个版本标签运行其对应的测试环境
//! - **覆盖保护**: 替换现有文件前进行确认

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, theme::ColorfulTheme};
use std::fs;
use std::path::Path;

use crate::core::config::{self, EnvConfig, MatrixConfig};
use crate::infra::t;

/// Interpreter versions offered by the wizard.
pub const PYTHON_VERSIONS: [&str; 5] = ["3.9", "3.10", "3.11", "3.12", "3.13"];

const DEFAULT_TEST_COMMAND: &str = "pytest {posargs}";

/// Output format of the generated configuration.
/// 生成配置的输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitFormat {
    Toml,
    Ini,
}

impl InitFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            InitFormat::Toml => config::CONFIG_CANDIDATES[0],
            InitFormat::Ini => config::CONFIG_CANDIDATES[1],
        }
    }
}

/// Tool environments the wizard can add next to the test environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolEnv {
    Lint,
    Type,
}

impl ToolEnv {
    const ALL: [ToolEnv; 2] = [ToolEnv::Lint, ToolEnv::Type];

    fn id(self) -> &'static str {
        match self {
            ToolEnv::Lint => "lint",
            ToolEnv::Type => "type",
        }
    }

    fn label(self) -> String {
        match self {
            ToolEnv::Lint => t!("init.tool_lint").to_string(),
            ToolEnv::Type => t!("init.tool_type").to_string(),
        }
    }

    fn config(self) -> EnvConfig {
        let (description, dep, command) = match self {
            ToolEnv::Lint => ("Run linters", "ruff", "ruff check {posargs:.}"),
            ToolEnv::Type => ("Run the type checker", "mypy", "mypy {posargs:.}"),
        };
        EnvConfig {
            description: Some(description.to_string()),
            deps: vec![dep.to_string()],
            commands: Some(vec![command.to_string()]),
            ..EnvConfig::default()
        }
    }
}

/// Answers collected by the wizard.
#[derive(Debug, Clone)]
pub struct InitAnswers {
    pub versions: Vec<String>,
    pub tools: Vec<ToolEnv>,
    pub test_command: String,
    pub skip_missing_interpreters: bool,
}

impl Default for InitAnswers {
    fn default() -> Self {
        Self {
            versions: vec!["3.11".to_string(), "3.12".to_string()],
            tools: vec![ToolEnv::Lint],
            test_command: DEFAULT_TEST_COMMAND.to_string(),
            skip_missing_interpreters: true,
        }
    }
}

/// `3.12` becomes `py312`.
fn env_id_for(version: &str) -> String {
    format!("py{}", version.replace('.', ""))
}

/// Builds the matrix described by `answers`.
///
/// Every version gets a `pyXY` environment bound to its label; tool
/// environments run under the newest selected version.
pub fn build_template(answers: &InitAnswers) -> MatrixConfig {
    let mut config = MatrixConfig {
        skip_missing_interpreters: answers.skip_missing_interpreters,
        base: Some(EnvConfig {
            deps: vec!["pytest".to_string()],
            commands: Some(vec![answers.test_command.clone()]),
            ..EnvConfig::default()
        }),
        ..MatrixConfig::default()
    };

    for version in &answers.versions {
        let id = env_id_for(version);
        config.envlist.push(id.clone());
        config.versions.insert(version.clone(), vec![id.clone()]);
        config.envs.insert(
            id,
            EnvConfig {
                description: Some(format!("Run tests on Python {version}")),
                basepython: Some(format!("python{version}")),
                ..EnvConfig::default()
            },
        );
    }

    for tool in &answers.tools {
        config.envlist.push(tool.id().to_string());
        config.envs.insert(tool.id().to_string(), tool.config());
    }

    if let Some(newest) = answers.versions.last() {
        if let Some(bound) = config.versions.get_mut(newest) {
            bound.extend(answers.tools.iter().map(|tool| tool.id().to_string()));
        }
    }

    config
}

/// Serializes `config` in the requested format.
pub fn render(config: &MatrixConfig, format: InitFormat) -> Result<String> {
    match format {
        InitFormat::Toml => {
            let body = toml::to_string_pretty(config).context(t!("init.serialize_failed").to_string())?;
            Ok(format!("# {}\n\n{body}", t!("init.file_header")))
        }
        InitFormat::Ini => Ok(format!("# {}\n\n{}", t!("init.file_header"), config::render_ini(config))),
    }
}

/// Runs the wizard and writes the configuration file into the current
/// directory. With `non_interactive` the defaults are used and an existing
/// file is left untouched.
///
/// 运行向导并将配置文件写入当前目录。
/// 使用 `non_interactive` 时采用默认值，且不会覆盖已有文件。
pub fn run_init_wizard(non_interactive: bool, format: InitFormat) -> Result<()> {
    let file_name = format.file_name();
    let theme = ColorfulTheme::default();

    println!("\n{}", t!("init.welcome").bold().cyan());
    println!("{}\n", t!("init.description"));

    if Path::new(file_name).exists() {
        let overwrite = if non_interactive {
            false
        } else {
            Confirm::with_theme(&theme)
                .with_prompt(t!("init.overwrite_prompt", path = file_name).to_string())
                .default(false)
                .interact()
                .context(t!("init.confirmation_failed").to_string())?
        };
        if !overwrite {
            println!("{}", t!("init.aborted", path = file_name).yellow());
            return Ok(());
        }
    }

    let answers = if non_interactive {
        InitAnswers::default()
    } else {
        prompt_for_answers(&theme)?
    };

    let text = render(&build_template(&answers), format)?;
    fs::write(file_name, text).with_context(|| t!("init.write_failed", path = file_name).to_string())?;

    println!("\n{} {}", "✔".green(), t!("init.success", path = file_name).bold());
    println!("{}", t!("init.next_steps"));
    Ok(())
}

fn prompt_for_answers(theme: &ColorfulTheme) -> Result<InitAnswers> {
    let defaults = InitAnswers::default();

    let version_defaults: Vec<bool> = PYTHON_VERSIONS
        .iter()
        .map(|v| defaults.versions.iter().any(|d| d == v))
        .collect();
    let picked = MultiSelect::with_theme(theme)
        .with_prompt(t!("init.versions_prompt").to_string())
        .items(&PYTHON_VERSIONS)
        .defaults(&version_defaults)
        .interact()?;
    if picked.is_empty() {
        println!("{}", t!("init.no_versions").yellow());
    }
    let versions = picked.into_iter().map(|i| PYTHON_VERSIONS[i].to_string()).collect();

    let tool_labels: Vec<String> = ToolEnv::ALL
        .iter()
        .map(|tool| tool.label())
        .collect();
    let tool_defaults: Vec<bool> = ToolEnv::ALL.iter().map(|tool| defaults.tools.contains(tool)).collect();
    let tools = MultiSelect::with_theme(theme)
        .with_prompt(t!("init.tools_prompt").to_string())
        .items(&tool_labels)
        .defaults(&tool_defaults)
        .interact()?
        .into_iter()
        .map(|i| ToolEnv::ALL[i])
        .collect();

    let test_command: String = Input::with_theme(theme)
        .with_prompt(t!("init.test_command_prompt").to_string())
        .default(defaults.test_command.clone())
        .interact_text()?;

    let skip_missing_interpreters = Confirm::with_theme(theme)
        .with_prompt(t!("init.skip_missing_prompt").to_string())
        .default(defaults.skip_missing_interpreters)
        .interact()?;

    Ok(InitAnswers {
        versions,
        tools,
        test_command,
        skip_missing_interpreters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn template_binds_tools_to_newest_version() {
        let config = build_template(&InitAnswers {
            versions: vec!["3.11".into(), "3.12".into()],
            tools: vec![ToolEnv::Lint, ToolEnv::Type],
            ..InitAnswers::default()
        });
        assert_eq!(config.envlist, vec!["py311", "py312", "lint", "type"]);
        assert_eq!(config.versions["3.11"], vec!["py311"]);
        assert_eq!(config.versions["3.12"], vec!["py312", "lint", "type"]);
        assert_eq!(config.envs["py311"].basepython.as_deref(), Some("python3.11"));
    }

    #[test]
    fn both_formats_build_the_same_matrix() {
        let config = build_template(&InitAnswers::default());
        let toml_text = render(&config, InitFormat::Toml).unwrap();
        let ini_text = render(&config, InitFormat::Ini).unwrap();

        let from_toml = config::parse_toml(&toml_text).unwrap();
        let from_ini = config::parse_ini(&ini_text).unwrap();
        assert_eq!(from_toml, from_ini);

        let matrix = config::build_matrix(from_toml, PathBuf::from(".")).unwrap();
        assert_eq!(matrix.envlist, vec!["py311", "py312", "lint"]);
    }

    #[test]
    fn no_versions_still_yields_a_valid_matrix() {
        let config = build_template(&InitAnswers {
            versions: vec![],
            ..InitAnswers::default()
        });
        assert!(config.versions.is_empty());
        assert!(config::build_matrix(config, PathBuf::from(".")).is_ok());
    }
}
