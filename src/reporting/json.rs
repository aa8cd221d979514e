//! # JSON Reporting Module / JSON 报告模块
//!
//! Machine-readable report of a run, for CI systems.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::core::models::RunReport;

/// Serializes `report` to pretty-printed JSON.
pub fn render_json_report(report: &RunReport) -> Result<String> {
    let mut value = serde_json::to_value(report).context("failed to serialize run report")?;
    if let Some(object) = value.as_object_mut() {
        object.insert("passed".to_string(), serde_json::Value::Bool(report.passed()));
    }
    serde_json::to_string_pretty(&value).context("failed to serialize run report")
}

/// Writes the JSON report to `output_path`.
pub fn generate_json_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json = render_json_report(report)?;
    fs::write(output_path, json)
        .with_context(|| format!("failed to write JSON report to {}", output_path.display()))?;
    Ok(())
}
