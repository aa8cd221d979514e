//! # Core Module / 核心模块
//!
//! This module contains the core functionality of env-matrix:
//! configuration loading, selection, provisioning and execution.
//!
//! 此模块包含 env-matrix 的核心功能：
//! 配置加载、环境选择、环境准备和执行。

pub mod config;
pub mod deps;
pub mod execution;
pub mod ini;
pub mod models;
pub mod provision;
pub mod resolver;
pub mod substitution;

// Re-exports
pub use config::load_matrix;
pub use execution::Executor;
pub use models::{Matrix, RunReport};
pub use resolver::{resolve, InvocationContext, Selection, SelectionSource};
