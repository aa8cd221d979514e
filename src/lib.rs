//! # Env Matrix Library / Env Matrix 库
//!
//! This library provides the core functionality of env-matrix, a
//! configuration-driven runner for multi-environment test, lint and
//! type-check workflows.
//!
//! 此库为 env-matrix 提供核心功能，
//! 这是一个配置驱动的多环境测试、lint 和类型检查运行器。
//!
//! ## Modules / 模块
//!
//! - `core` - Matrix model, configuration loading, resolution and execution
//! - `infra` - Infrastructure services like process execution and file system helpers
//! - `reporting` - Console, HTML and JSON run reports
//! - `cli` - Command-line interface and commands
//! - `error` - Typed configuration, provisioning and state errors
//!
//! - `core` - 矩阵模型、配置加载、解析和执行
//! - `infra` - 基础设施服务，如进程执行和文件系统辅助函数
//! - `reporting` - 控制台、HTML 和 JSON 运行报告
//! - `cli` - 命令行接口和命令
//! - `error` - 类型化的配置、准备和状态错误

pub mod cli;
pub mod core;
pub mod error;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::{config, execution, models};
pub use error::{ConfigError, ProvisionError, StateError};

/// Initializes the application's internationalization (i18n).
///
/// `preferred` (from `--lang`) wins when it names an available locale;
/// otherwise the system locale is used. Full locales (e.g. "zh-CN") are
/// matched first, then the language part, and finally "en".
pub fn init_locale(preferred: Option<&str>) {
    let locale = preferred
        .map(str::to_string)
        .or_else(sys_locale::get_locale)
        .unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    let lang = if available_locales.contains(&locale.as_str()) {
        locale.as_str()
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .or_else(|| {
                // "zh" alone maps to the one Chinese locale we ship.
                available_locales
                    .iter()
                    .copied()
                    .find(|available| available.split('-').next() == locale.split('-').next())
            })
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
