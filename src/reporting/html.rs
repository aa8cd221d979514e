//! # HTML Reporting Module / HTML 报告模块
//!
//! This module renders a self-contained HTML report of a run: summary
//! counters, one row per environment and a collapsible command log for each.
//!
//! 此模块渲染一次运行的独立 HTML 报告：汇总计数、每个环境一行，
//! 以及每个环境可折叠的命令日志。

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use crate::core::execution::describe;
use crate::core::models::{EnvReport, EnvStatus, RunReport};
use crate::infra::t;
use crate::reporting::console::{status_class, status_label};

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292f; }
h1 { font-size: 1.6em; }
.meta { color: #57606a; margin-bottom: 1.5em; }
.summary-container { display: flex; gap: 1.5em; margin-bottom: 2em; }
.summary-item { display: flex; flex-direction: column; align-items: center; padding: 0.8em 1.4em; border: 1px solid #d0d7de; border-radius: 6px; }
.summary-item .count { font-size: 1.8em; font-weight: 600; }
.summary-item .label { color: #57606a; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.5em 0.8em; border-bottom: 1px solid #d0d7de; vertical-align: top; }
.status-passed { color: #1a7f37; font-weight: 600; }
.status-failed { color: #cf222e; font-weight: 600; }
.status-skipped, .status-pending { color: #6e7781; font-weight: 600; }
details pre { background: #f6f8fa; padding: 0.8em; overflow-x: auto; white-space: pre-wrap; }
.command-failed { color: #cf222e; }
.command-ignored { color: #9a6700; }
"#;

/// Renders the report as an HTML document.
pub fn render_html_report(report: &RunReport) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title")) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header")) }
                p.meta {
                    (t!("html_report.started_at", time = report.started_at.format("%Y-%m-%d %H:%M:%S")))
                    " · "
                    (report.selection.source.to_string())
                }
                div.summary-container {
                    (summary_item(report.environments.len(), &t!("html_report.summary.total"), ""))
                    (summary_item(report.count(EnvStatus::Passed), &t!("html_report.summary.passed"), "status-passed"))
                    (summary_item(report.count(EnvStatus::Failed), &t!("html_report.summary.failed"), "status-failed"))
                    (summary_item(report.count(EnvStatus::Skipped), &t!("html_report.summary.skipped"), "status-skipped"))
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.header.name")) }
                            th { (t!("html_report.table.header.status")) }
                            th { (t!("html_report.table.header.duration")) }
                            th { (t!("html_report.table.header.commands")) }
                        }
                    }
                    tbody {
                        @for env in &report.environments {
                            (environment_row(env))
                        }
                    }
                }
            }
        }
    }
}

fn summary_item(count: usize, label: &str, class: &str) -> Markup {
    let count_class = format!("count {class}");
    html! {
        div.summary-item {
            span class=(count_class.trim_end()) { (count) }
            span.label { (label) }
        }
    }
}

fn environment_row(env: &EnvReport) -> Markup {
    html! {
        tr {
            td { (env.name) }
            td class=(status_class(env.status)) {
                (status_label(env.status))
                @if let Some(note) = &env.note {
                    br;
                    small { (note) }
                }
            }
            td { (format!("{:.2}s", env.duration.as_secs_f64())) }
            td {
                @if let Some(output) = env.provision_output.as_deref().filter(|o| !o.trim().is_empty()) {
                    details {
                        summary { (t!("provision_log")) }
                        pre { (output) }
                    }
                }
                @for record in &env.commands {
                    details {
                        summary class=(command_class(record.is_failure(), record.ignored)) {
                            code { (record.command) }
                            " (" (describe(&record.status)) ")"
                        }
                        pre { (record.output) }
                    }
                }
            }
        }
    }
}

fn command_class(failed: bool, ignored: bool) -> &'static str {
    match (failed, ignored) {
        (true, false) => "command-failed",
        (true, true) => "command-ignored",
        _ => "",
    }
}

/// Writes the HTML report to `output_path`.
///
/// # Errors
/// Fails when the file cannot be written.
pub fn generate_html_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let markup = render_html_report(report);
    fs::write(output_path, markup.into_string())
        .with_context(|| format!("failed to write HTML report to {}", output_path.display()))?;
    Ok(())
}
