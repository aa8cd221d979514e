//! # Resolver Unit Tests / 解析器单元测试
//!
//! Tests for the selection fallback chain: explicit request, then version
//! binding, then the default envlist.
//!
//! 测试选择回退链：显式请求，然后是版本绑定，最后是默认 envlist。

mod common;

use common::{SAMPLE_TOML, load_toml};
use env_matrix::core::resolver::{InvocationContext, SelectionSource, match_binding, resolve};
use env_matrix::error::ConfigError;

fn ctx(label: Option<&str>, requested: &[&str]) -> InvocationContext {
    InvocationContext::new(
        label.map(str::to_string),
        requested.iter().map(|s| s.to_string()).collect(),
    )
}

#[test]
fn test_explicit_request_overrides_version_binding() {
    let (_dir, matrix) = load_toml(SAMPLE_TOML);
    let selection = resolve(&matrix, &ctx(Some("3.10"), &["lint"])).unwrap();
    assert_eq!(selection.environments, vec!["lint"]);
    assert_eq!(selection.source, SelectionSource::Configured);
}

#[test]
fn test_version_binding_selects_declared_order() {
    let (_dir, matrix) = load_toml(SAMPLE_TOML);
    let selection = resolve(&matrix, &ctx(Some("3.10"), &[])).unwrap();
    assert_eq!(selection.environments, vec!["py310", "lint", "mypy"]);
    assert_eq!(
        selection.source,
        SelectionSource::InheritedFromVersion {
            label: "3.10".to_string()
        }
    );
}

#[test]
fn test_full_version_and_prefixed_labels_match_binding() {
    let (_dir, matrix) = load_toml(SAMPLE_TOML);
    for label in ["3.10.12", "py3.10", "python3.10"] {
        let binding = match_binding(&matrix, label).unwrap_or_else(|| panic!("{label} should match"));
        assert_eq!(binding.label, "3.10");
    }
    assert!(match_binding(&matrix, "3.1").is_none());
}

#[test]
fn test_unmatched_label_falls_back_to_envlist() {
    let (_dir, matrix) = load_toml(SAMPLE_TOML);
    let selection = resolve(&matrix, &ctx(Some("3.13"), &[])).unwrap();
    assert_eq!(selection.environments, vec!["py310", "py311"]);
    assert_eq!(selection.source, SelectionSource::DefaultFallback);

    let selection = resolve(&matrix, &ctx(None, &[])).unwrap();
    assert_eq!(selection.source, SelectionSource::DefaultFallback);
}

#[test]
fn test_explicit_request_is_deduplicated_in_order() {
    let (_dir, matrix) = load_toml(SAMPLE_TOML);
    let selection = resolve(&matrix, &ctx(None, &["mypy", "lint", "mypy"])).unwrap();
    assert_eq!(selection.environments, vec!["mypy", "lint"]);
}

#[test]
fn test_unknown_explicit_environment_is_a_config_error() {
    let (_dir, matrix) = load_toml(SAMPLE_TOML);
    let err = resolve(&matrix, &ctx(Some("3.10"), &["lint", "docs"])).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownEnvironment { ref id, .. } if id == "docs"));
}

#[test]
fn test_resolution_is_deterministic() {
    let (_dir, matrix) = load_toml(SAMPLE_TOML);
    let context = ctx(Some("3.10"), &[]);
    let first = resolve(&matrix, &context).unwrap();
    let second = resolve(&matrix, &context).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_empty_default_without_binding_is_an_error() {
    let (_dir, matrix) = load_toml(
        r#"
[versions]
"3.12" = ["lint"]
[env.lint]
commands = ["ruff check ."]
"#,
    );
    assert!(resolve(&matrix, &ctx(Some("3.12"), &[])).is_ok());

    let err = resolve(&matrix, &ctx(Some("3.11"), &[])).unwrap_err();
    assert!(matches!(err, ConfigError::EmptySelection { label: Some(ref l) } if l == "3.11"));
}

#[test]
fn test_selection_serializes_with_source_tag() {
    let (_dir, matrix) = load_toml(SAMPLE_TOML);
    let selection = resolve(&matrix, &ctx(Some("3.11"), &[])).unwrap();
    let json = serde_json::to_value(&selection).unwrap();
    assert_eq!(json["source"], "inherited_from_version");
    assert_eq!(json["label"], "3.11");
    assert_eq!(json["environments"], serde_json::json!(["py311"]));
}
