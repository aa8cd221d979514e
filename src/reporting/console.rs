//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints the end-of-run summary and the details of failed
//! environments, with color coding and localized labels.
//!
//! 此模块打印运行结束时的摘要和失败环境的详细信息，支持颜色编码和本地化标签。

use colored::*;

use crate::core::execution::describe;
use crate::core::models::{CommandStatus, EnvReport, EnvStatus, RunReport};
use crate::infra::t;

/// Localized label for an environment status.
/// 环境状态的本地化标签。
pub fn status_label(status: EnvStatus) -> String {
    let label = match status {
        EnvStatus::Pending => t!("report.status_pending"),
        EnvStatus::Running => t!("report.status_running"),
        EnvStatus::Passed => t!("report.status_passed"),
        EnvStatus::Failed => t!("report.status_failed"),
        EnvStatus::Skipped => t!("report.status_skipped"),
    };
    label.to_string()
}

/// CSS class used for a status in the HTML report.
pub fn status_class(status: EnvStatus) -> &'static str {
    match status {
        EnvStatus::Passed => "status-passed",
        EnvStatus::Failed => "status-failed",
        EnvStatus::Skipped => "status-skipped",
        EnvStatus::Pending | EnvStatus::Running => "status-pending",
    }
}

/// Prints a formatted summary of the run to the console.
///
/// 在控制台打印格式化的运行摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Environment Summary (default envlist) ---
///   - Passed   | py310                          |      4.12s  3/3 commands
///   - Failed   | lint                           |      0.45s  1/2 commands
///   - Skipped  | py39                           |        N/A
/// ```
pub fn print_summary(report: &RunReport) {
    println!(
        "\n{}",
        t!("summary_banner", source = &report.selection.source).bold()
    );

    for env in &report.environments {
        let label = status_label(env.status);
        let status_colored = match env.status {
            EnvStatus::Passed => label.green(),
            EnvStatus::Failed => label.red(),
            _ => label.dimmed(),
        };
        let duration_str = if env.status == EnvStatus::Skipped {
            "N/A".to_string()
        } else {
            format!("{:.2}s", env.duration.as_secs_f64())
        };
        let commands_str = if env.commands.is_empty() {
            String::new()
        } else {
            let ok = env
                .commands
                .iter()
                .filter(|c| c.status == CommandStatus::Succeeded)
                .count();
            t!("commands_ok", ok = ok, total = env.commands.len()).to_string()
        };

        println!(
            "  - {:<10} | {:<30} | {:>10}  {}",
            status_colored, env.name, duration_str, commands_str
        );
    }
}

/// Prints details of every failed environment: the provisioning note and
/// each command with its status, with captured output for failures.
///
/// 打印每个失败环境的详细信息。
pub fn print_failure_details(report: &RunReport) {
    let failures: Vec<&EnvReport> = report
        .environments
        .iter()
        .filter(|e| e.status == EnvStatus::Failed)
        .collect();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("failure_banner").red().bold());
    println!("{}", "-".repeat(80));

    for (i, env) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("report_header_failure").red(),
            env.name.cyan()
        );
        if let Some(note) = &env.note {
            println!("  {}", note.yellow());
        }
        if let Some(output) = env.provision_output.as_deref().filter(|o| !o.trim().is_empty()) {
            println!("\n--- {} ---\n", t!("provision_log").yellow());
            println!("{}", output.trim_end());
        }
        for record in &env.commands {
            let line = format!("  $ {}  ({})", record.command, describe(&record.status));
            if record.is_failure() && !record.ignored {
                println!("{}", line.red());
            } else {
                println!("{}", line.dimmed());
            }
        }
        for record in env.failed_commands().filter(|r| !r.output.trim().is_empty()) {
            println!("\n--- {}: {} ---\n", t!("command_log").yellow(), record.command);
            println!("{}", record.output.trim_end());
        }
        println!("\n{}", "-".repeat(80));
    }
}
