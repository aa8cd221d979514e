//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command of the env-matrix CLI,
//! which resolves the selection and executes it.
//!
//! 此模块实现了 env-matrix CLI 的 `run` 命令，解析环境选择并执行。

use anyhow::Result;
use colored::*;
use std::{path::PathBuf, process::ExitCode};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        execution::{ExecOptions, Executor},
        models::{Matrix, RunReport},
        provision::{HostProvisioner, Provisioner, VenvProvisioner},
        resolver::{self, InvocationContext, Selection},
    },
    infra::t,
    reporting::{generate_html_report, generate_json_report, print_failure_details, print_summary},
};

/// Arguments of `env-matrix run`.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub project_dir: PathBuf,
    pub envs: Vec<String>,
    pub python: Option<String>,
    pub jobs: Option<usize>,
    pub no_provision: bool,
    pub work_dir: Option<PathBuf>,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub quiet: bool,
    pub posargs: Vec<String>,
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// The process exit code: success when every selected environment passed or
/// was skipped. Configuration errors are returned as `Err` before anything
/// runs.
pub async fn execute(args: RunArgs) -> Result<ExitCode> {
    let (matrix, config_path) = super::load_matrix(args.config.as_deref(), &args.project_dir)?;
    println!("{}", t!("loading_matrix", path = config_path.display()));

    let label = super::interpreter_label(args.python.clone(), &matrix).await;
    let ctx = InvocationContext::new(label, args.envs.clone());
    let selection = resolver::resolve(&matrix, &ctx)?;

    println!(
        "{}",
        t!(
            "selection_resolved",
            count = selection.environments.len(),
            source = &selection.source,
            envs = selection.environments.join(", ")
        )
        .cyan()
    );
    if let Some(label) = &ctx.interpreter {
        println!("{}", t!("interpreter_label", label = label).cyan());
    }

    let jobs = args.jobs.unwrap_or(1).clamp(1, num_cpus::get().max(1) * 4);
    if jobs > 1 {
        println!("{}", t!("running_parallel", jobs = jobs).bold());
    }

    let options = ExecOptions {
        work_dir: args.work_dir.clone(),
        posargs: args.posargs.clone(),
        jobs,
        stop_token: setup_signal_handler(),
        echo_output: !args.quiet,
    };

    let report = if args.no_provision {
        run_selection(&matrix, HostProvisioner, options, &selection).await?
    } else {
        run_selection(&matrix, VenvProvisioner::default(), options, &selection).await?
    };

    print_summary(&report);

    if let Some(path) = &args.html {
        println!("\n{}", t!("generating_html", path = path.display()));
        if let Err(e) = generate_html_report(&report, path) {
            eprintln!("{} {:#}", t!("report_write_failed").red(), e);
        }
    }
    if let Some(path) = &args.json {
        println!("\n{}", t!("generating_json", path = path.display()));
        if let Err(e) = generate_json_report(&report, path) {
            eprintln!("{} {:#}", t!("report_write_failed").red(), e);
        }
    }

    if report.passed() {
        println!("\n{}", t!("all_envs_passed").green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        print_failure_details(&report);
        println!("\n{}", t!("run_failed").red().bold());
        Ok(ExitCode::from(report.exit_code() as u8))
    }
}

async fn run_selection<P: Provisioner>(
    matrix: &Matrix,
    provisioner: P,
    options: ExecOptions,
    selection: &Selection,
) -> Result<RunReport> {
    let executor = Executor::new(matrix, provisioner, options);
    Ok(executor.run(selection).await?)
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("shutdown_signal").yellow());
            token_clone.cancel();
        }
    });

    token
}
