//! # Command-Line Interface / 命令行接口
//!
//! Builds the `clap` command tree with localized help text and dispatches to
//! the `run`, `list` and `init` commands.
//!
//! 构建带有本地化帮助文本的 `clap` 命令树，并分派到 `run`、`list` 和 `init` 命令。

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf, process::ExitCode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::infra::t;

pub mod commands;

use commands::{init::InitFormat, list::ListArgs, run::RunArgs};

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|arg| arg == "--lang")
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}

/// Initialize the tracing subscriber for logging.
///
/// `--verbose` enables debug events for this crate; otherwise `RUST_LOG`
/// applies, defaulting to warnings only so console output stays clean.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("env_matrix=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("env_matrix=warn"))
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("arg_config").to_string())
        .value_name("CONFIG")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn project_dir_arg() -> Arg {
    Arg::new("project-dir")
        .long("project-dir")
        .help(t!("arg_project_dir").to_string())
        .value_name("PROJECT_DIR")
        .default_value(".")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn env_arg() -> Arg {
    Arg::new("env")
        .short('e')
        .long("env")
        .help(t!("arg_env").to_string())
        .value_name("ENV")
        .value_delimiter(',')
        .action(ArgAction::Append)
}

fn python_arg() -> Arg {
    Arg::new("python")
        .long("python")
        .help(t!("arg_python").to_string())
        .value_name("LABEL")
        .action(ArgAction::Set)
}

pub fn build_cli() -> Command {
    Command::new("env-matrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about").to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang").to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("arg_verbose").to_string())
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cmd_run_about").to_string())
                .arg(config_arg())
                .arg(project_dir_arg())
                .arg(env_arg())
                .arg(python_arg())
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help(t!("arg_jobs").to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("no-provision")
                        .long("no-provision")
                        .help(t!("arg_no_provision").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("work-dir")
                        .long("work-dir")
                        .help(t!("arg_work_dir").to_string())
                        .value_name("DIR")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("arg_html").to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help(t!("arg_json").to_string())
                        .value_name("JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("quiet")
                        .short('q')
                        .long("quiet")
                        .help(t!("arg_quiet").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("posargs")
                        .help(t!("arg_posargs").to_string())
                        .value_name("POSARGS")
                        .num_args(0..)
                        .last(true)
                        .allow_hyphen_values(true)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("list")
                .about(t!("cmd_list_about").to_string())
                .arg(config_arg())
                .arg(project_dir_arg())
                .arg(env_arg())
                .arg(python_arg())
                .arg(
                    Arg::new("all")
                        .short('a')
                        .long("all")
                        .help(t!("arg_all").to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about").to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg_non_interactive").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .help(t!("arg_format").to_string())
                        .value_parser(["toml", "ini"])
                        .default_value("toml")
                        .action(ArgAction::Set),
                ),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect())
        .unwrap_or_default()
}

fn path(matches: &ArgMatches, id: &str) -> Option<PathBuf> {
    matches.get_one::<PathBuf>(id).cloned()
}

/// Parses the command line and runs the chosen command, returning the
/// process exit code for commands that complete.
pub async fn run() -> Result<ExitCode> {
    crate::init_locale(pre_parse_language().as_deref());

    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("verbose"));
    tracing::debug!(locale = &*rust_i18n::locale(), "starting env-matrix");

    match matches.subcommand() {
        Some(("run", m)) => {
            let args = RunArgs {
                config: path(m, "config"),
                project_dir: path(m, "project-dir").unwrap_or_else(|| PathBuf::from(".")),
                envs: strings(m, "env"),
                python: m.get_one::<String>("python").cloned(),
                jobs: m.get_one::<usize>("jobs").copied(),
                no_provision: m.get_flag("no-provision"),
                work_dir: path(m, "work-dir"),
                html: path(m, "html"),
                json: path(m, "json"),
                quiet: m.get_flag("quiet"),
                posargs: m
                    .get_many::<String>("posargs")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
            };
            commands::run::execute(args).await
        }
        Some(("list", m)) => {
            let args = ListArgs {
                config: path(m, "config"),
                project_dir: path(m, "project-dir").unwrap_or_else(|| PathBuf::from(".")),
                envs: strings(m, "env"),
                python: m.get_one::<String>("python").cloned(),
                all: m.get_flag("all"),
            };
            commands::list::execute(args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("init", m)) => {
            let format = match m.get_one::<String>("format").map(String::as_str) {
                Some("ini") => InitFormat::Ini,
                _ => InitFormat::Toml,
            };
            commands::init::run_init_wizard(m.get_flag("non-interactive"), format)?;
            Ok(ExitCode::SUCCESS)
        }
        // `subcommand_required` makes clap print help and exit before this.
        _ => Ok(ExitCode::SUCCESS),
    }
}
