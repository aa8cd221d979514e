//! # List Command Module / 列表命令模块
//!
//! Shows which environments a `run` with the same arguments would select,
//! without provisioning or executing anything.
//!
//! 显示使用相同参数的 `run` 将会选择哪些环境，但不进行准备或执行。

use anyhow::Result;
use colored::*;
use std::path::PathBuf;

use crate::core::models::{Environment, Matrix};
use crate::core::resolver::{self, InvocationContext};
use crate::infra::t;

/// Arguments of `env-matrix list`.
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    pub config: Option<PathBuf>,
    pub project_dir: PathBuf,
    pub envs: Vec<String>,
    pub python: Option<String>,
    pub all: bool,
}

pub async fn execute(args: ListArgs) -> Result<()> {
    let (matrix, config_path) = super::load_matrix(args.config.as_deref(), &args.project_dir)?;
    println!("{}", t!("loading_matrix", path = config_path.display()));

    let label = super::interpreter_label(args.python.clone(), &matrix).await;
    let ctx = InvocationContext::new(label, args.envs.clone());
    let selection = resolver::resolve(&matrix, &ctx)?;

    println!(
        "{}",
        t!("list.selected_header", source = &selection.source).bold()
    );
    for id in &selection.environments {
        if let Some(env) = matrix.environments.get(id) {
            println!("{}", describe(env));
        }
    }

    if args.all {
        print_all(&matrix);
    }
    Ok(())
}

fn print_all(matrix: &Matrix) {
    println!("\n{}", t!("list.all_header").bold());
    for env in matrix.environments.values() {
        println!("{}", describe(env));
    }

    if !matrix.bindings.is_empty() {
        println!("\n{}", t!("list.bindings_header").bold());
        for binding in &matrix.bindings {
            println!("  {:<8} {}", binding.label.cyan(), binding.environments.join(", "));
        }
    }
}

fn describe(env: &Environment) -> String {
    let mut line = format!("  {:<16} {}", env.name.green(), env.interpreter_selector().dimmed());
    if let Some(description) = &env.description {
        line.push_str(&format!("  {description}"));
    }
    line
}
