//! # Environment Execution Engine Module / 环境执行引擎模块
//!
//! This module runs a resolved [`Selection`]: for every environment it
//! locates the interpreter, scoped-acquires an isolated context, installs
//! the dependency union and runs the commands in order, producing a
//! [`RunReport`].
//!
//! Environments never affect each other: a provisioning or command failure
//! in one is recorded and the next one still runs.
//!
//! 此模块运行已解析的 [`Selection`]：为每个环境查找解释器、获取隔离上下文、
//! 安装依赖并按顺序运行命令，最终生成 [`RunReport`]。

use chrono::Local;
use colored::*;
use futures::{stream, StreamExt};
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        deps::resolve_dependencies,
        models::{
            CommandLine, CommandRecord, CommandStatus, EnvReport, EnvStatus, Environment, Matrix,
            RunReport,
        },
        provision::{IsolatedContext, ProvisionRequest, Provisioner},
        resolver::Selection,
        substitution::{expand_argv, SubstitutionContext},
    },
    error::{ProvisionError, StateError},
    infra::{command, command::Completion, fs, t},
};

/// Knobs for one run.
/// 单次运行的选项。
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Parent directory for isolated contexts; system temp when `None`.
    pub work_dir: Option<PathBuf>,
    /// Arguments substituted for `{posargs}`.
    pub posargs: Vec<String>,
    /// Environments run concurrently; 1 means sequential.
    pub jobs: usize,
    /// Cancelled on interrupt.
    pub stop_token: CancellationToken,
    /// Echo captured command output to the console.
    pub echo_output: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            work_dir: None,
            posargs: Vec::new(),
            jobs: 1,
            stop_token: CancellationToken::new(),
            echo_output: true,
        }
    }
}

/// Runs selections of one matrix through a provisioner.
pub struct Executor<'m, P> {
    matrix: &'m Matrix,
    provisioner: P,
    options: ExecOptions,
}

impl<'m, P: Provisioner> Executor<'m, P> {
    pub fn new(matrix: &'m Matrix, provisioner: P, options: ExecOptions) -> Self {
        Self {
            matrix,
            provisioner,
            options,
        }
    }

    /// Runs every environment of `selection`. Reports keep the selection's
    /// order even when environments run concurrently.
    pub async fn run(&self, selection: &Selection) -> Result<RunReport, StateError> {
        let started_at = Local::now();
        let start = Instant::now();

        let environments = stream::iter(selection.environments.iter())
            .map(|id| self.run_environment(id))
            .buffered(self.options.jobs.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RunReport {
            selection: selection.clone(),
            environments,
            started_at,
            duration: start.elapsed(),
        })
    }

    /// Runs a single environment through its whole lifecycle.
    pub async fn run_environment(&self, id: &str) -> Result<EnvReport, StateError> {
        let start = Instant::now();
        let mut report = EnvReport::new(id);

        let Some(env) = self.matrix.environments.get(id) else {
            report.transition(EnvStatus::Running)?;
            return finish(report, EnvStatus::Failed, Some(format!("environment '{id}' is not defined")), start);
        };

        if self.options.stop_token.is_cancelled() {
            report.transition(EnvStatus::Running)?;
            return finish(report, EnvStatus::Failed, Some(t!("run.interrupted").to_string()), start);
        }

        let selector = env.interpreter_selector();
        let located = self
            .provisioner
            .locate_interpreter(&selector)
            .await
            .ok_or(ProvisionError::InterpreterNotFound { selector });
        let interpreter = match located {
            Ok(interpreter) => interpreter,
            Err(err) => return self.interpreter_unavailable(report, err, start),
        };

        report.transition(EnvStatus::Running)?;
        report.interpreter = Some(interpreter.clone());
        println!(
            "{}",
            t!("run.env_start", name = id, interpreter = interpreter.display()).blue().bold()
        );

        let ctx = match self.provision(env, &interpreter).await {
            Ok((ctx, output)) => {
                report.provision_output = output;
                ctx
            }
            Err(e) => {
                println!("{}", t!("run.provision_failed", name = id, error = &e).red());
                report.provision_output = e.output().map(str::to_string);
                return finish(report, EnvStatus::Failed, Some(e.to_string()), start);
            }
        };

        let mut aborted = false;
        let mut interrupted = false;
        for command in &env.commands {
            if aborted || interrupted {
                report.commands.push(CommandRecord::not_run(command));
                continue;
            }

            let mut record = self.run_command(env, command, &ctx).await;
            if record.is_failure() {
                if command.ignore_exit || env.ignore_errors {
                    record.ignored = true;
                    println!("{}", t!("run.command_ignored", name = id).yellow());
                } else {
                    aborted = true;
                }
            }
            report.commands.push(record);
            interrupted = self.options.stop_token.is_cancelled();
        }
        drop(ctx);

        let (status, note) = if interrupted {
            (EnvStatus::Failed, Some(t!("run.interrupted").to_string()))
        } else if report.failed_commands().next().is_some() {
            (EnvStatus::Failed, None)
        } else {
            (EnvStatus::Passed, None)
        };
        let secs = format!("{:.2}", start.elapsed().as_secs_f64());
        match status {
            EnvStatus::Passed => println!("{}", t!("run.env_passed", name = id, duration = &secs).green()),
            _ => println!("{}", t!("run.env_failed", name = id, duration = &secs).red()),
        }
        finish(report, status, note, start)
    }

    /// Skips the environment when the interpreter is missing and
    /// `skip_missing_interpreters` is set; fails it otherwise.
    fn interpreter_unavailable(
        &self,
        mut report: EnvReport,
        err: ProvisionError,
        start: Instant,
    ) -> Result<EnvReport, StateError> {
        let reason = err.to_string();
        if err.is_missing_interpreter() && self.matrix.skip_missing_interpreters {
            println!("{}", t!("run.env_skipped", name = &report.name, reason = &reason).yellow());
            report.transition(EnvStatus::Skipped)?;
            report.note = Some(reason);
            report.duration = start.elapsed();
            return Ok(report);
        }
        println!("{}", t!("run.provision_failed", name = &report.name, error = &reason).red());
        report.transition(EnvStatus::Running)?;
        finish(report, EnvStatus::Failed, Some(reason), start)
    }

    /// Scoped-acquires the isolated context and installs dependencies.
    async fn provision(
        &self,
        env: &Environment,
        interpreter: &std::path::Path,
    ) -> Result<(IsolatedContext, Option<String>), ProvisionError> {
        let deps = resolve_dependencies(&env.deps, &self.matrix.config_dir)?;
        let mut ctx = IsolatedContext::create(self.options.work_dir.as_deref(), &env.name)?;
        if !deps.is_empty() {
            println!(
                "{}",
                t!("run.provisioning", name = &env.name, count = deps.len()).cyan()
            );
        }
        let request = ProvisionRequest {
            env,
            interpreter,
            deps: &deps,
            config_dir: &self.matrix.config_dir,
        };
        let output = self.provisioner.install(&request, &mut ctx).await?;
        tracing::debug!(env = %env.name, root = %ctx.root.display(), "isolated context ready");
        Ok((ctx, output))
    }

    async fn run_command(
        &self,
        env: &Environment,
        command: &CommandLine,
        ctx: &IsolatedContext,
    ) -> CommandRecord {
        let start = Instant::now();
        let mut record = CommandRecord {
            command: command.raw.clone(),
            status: CommandStatus::Succeeded,
            ignored: false,
            output: String::new(),
            duration: Default::default(),
        };

        let substitution = SubstitutionContext {
            envname: &env.name,
            envdir: &ctx.root,
            configdir: &self.matrix.config_dir,
            posargs: &self.options.posargs,
            setenv: &env.setenv,
        };
        let argv = expand_argv(&command.argv, &substitution);
        if argv.is_empty() {
            record.status = CommandStatus::Error {
                message: "command expanded to nothing".to_string(),
            };
            return record;
        }

        println!("{}", t!("run.command", name = &env.name, command = argv.join(" ")).blue());

        let program = fs::find_executable(&argv[0], &ctx.bin_dirs).unwrap_or_else(|| PathBuf::from(&argv[0]));
        let workdir = env
            .changedir
            .as_ref()
            .map(|dir| self.matrix.config_dir.join(dir))
            .unwrap_or_else(|| self.matrix.config_dir.clone());

        let mut cmd = tokio::process::Command::new(&program);
        cmd.args(&argv[1..])
            .current_dir(&workdir)
            .envs(&env.setenv)
            .envs(&ctx.vars)
            .env("ENV_MATRIX_ENV_NAME", &env.name);
        if let Some(path) = ctx.path_var() {
            cmd.env("PATH", path);
        }

        tracing::debug!(env = %env.name, program = %program.display(), workdir = %workdir.display(), "spawning command");
        let (completion, output) =
            command::spawn_and_capture(cmd, Some(&self.options.stop_token), env.timeout).await;
        record.duration = start.elapsed();

        record.status = match completion {
            Ok(Completion::Exited(status)) if status.success() => CommandStatus::Succeeded,
            Ok(Completion::Exited(status)) => CommandStatus::Failed {
                exit_code: status.code(),
            },
            Ok(Completion::TimedOut) => CommandStatus::TimedOut,
            Ok(Completion::Cancelled) => CommandStatus::Error {
                message: t!("run.interrupted").to_string(),
            },
            Err(e) => CommandStatus::Error {
                message: format!("failed to start '{}': {e}", argv[0]),
            },
        };

        if self.options.echo_output && !output.trim().is_empty() {
            for line in output.trim_end().lines() {
                println!("{} {}", format!("[{}]", env.name).dimmed(), line);
            }
        }
        record.output = output;

        if record.is_failure() {
            println!(
                "{}",
                t!("run.command_failed", name = &env.name, status = describe(&record.status)).red()
            );
        }
        record
    }
}

fn finish(
    mut report: EnvReport,
    status: EnvStatus,
    note: Option<String>,
    start: Instant,
) -> Result<EnvReport, StateError> {
    report.transition(status)?;
    if note.is_some() {
        report.note = note;
    }
    report.duration = start.elapsed();
    Ok(report)
}

/// Short human description of a command status.
pub fn describe(status: &CommandStatus) -> String {
    match status {
        CommandStatus::Succeeded => "exit code 0".to_string(),
        CommandStatus::Failed {
            exit_code: Some(code),
        } => format!("exit code {code}"),
        CommandStatus::Failed { exit_code: None } => "terminated by signal".to_string(),
        CommandStatus::TimedOut => "timed out".to_string(),
        CommandStatus::Error { message } => message.clone(),
        CommandStatus::NotRun => "not run".to_string(),
    }
}
