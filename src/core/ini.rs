//! # INI Reader / INI 读取器
//!
//! A small reader for the tox-style INI dialect: `[section]` headers,
//! `key = value` pairs, `#`/`;` comment lines and indented continuation lines
//! that extend the previous value with a newline.
//!
//! tox 风格 INI 方言的小型读取器：`[section]` 头、`key = value` 键值对、
//! `#`/`;` 注释行，以及用换行符延续上一个值的缩进续行。

use crate::error::ConfigError;

/// One `[section]` with its entries in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    /// 1-based line of the header.
    pub line: usize,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub line: usize,
}

impl Section {
    /// Returns the value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Returns the entry for `key`, if present.
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

/// A parsed INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    pub sections: Vec<Section>,
}

impl IniDocument {
    /// Parses INI text. Duplicate sections and duplicate keys within a
    /// section are syntax errors.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut sections: Vec<Section> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = raw.starts_with(' ') || raw.starts_with('\t');

            if indented {
                let entry = sections
                    .last_mut()
                    .and_then(|s| s.entries.last_mut())
                    .ok_or_else(|| ConfigError::Syntax {
                        line: line_no,
                        message: "continuation line without a preceding key".to_string(),
                    })?;
                if !entry.value.is_empty() {
                    entry.value.push('\n');
                }
                entry.value.push_str(trimmed);
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| ConfigError::Syntax {
                    line: line_no,
                    message: format!("unterminated section header: {trimmed}"),
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(ConfigError::Syntax {
                        line: line_no,
                        message: "empty section name".to_string(),
                    });
                }
                if sections.iter().any(|s| s.name == name) {
                    return Err(ConfigError::Syntax {
                        line: line_no,
                        message: format!("duplicate section [{name}]"),
                    });
                }
                sections.push(Section {
                    name: name.to_string(),
                    line: line_no,
                    entries: Vec::new(),
                });
                continue;
            }

            let (key, value) = trimmed.split_once('=').ok_or_else(|| ConfigError::Syntax {
                line: line_no,
                message: format!("expected 'key = value', found: {trimmed}"),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    message: "empty key".to_string(),
                });
            }

            let section = sections.last_mut().ok_or_else(|| ConfigError::Syntax {
                line: line_no,
                message: format!("key '{key}' appears before any section"),
            })?;
            if section.entries.iter().any(|e| e.key == key) {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    message: format!("duplicate key '{key}' in [{}]", section.name),
                });
            }
            section.entries.push(Entry {
                key: key.to_string(),
                value: value.trim().to_string(),
                line: line_no,
            });
        }

        Ok(Self { sections })
    }

    /// Returns the section called `name`.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// Parses an INI boolean (`true/false`, `yes/no`, `on/off`, `1/0`).
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Splits a list value on commas and whitespace, dropping empty items.
/// Separators inside `{...}` factor groups do not split, so
/// `py{310, 311}, lint` yields `py{310,311}` and `lint`.
pub fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in value.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if c == ',' || c.is_whitespace() {
            if depth == 0 {
                if !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

/// Expands the factor groups of one environment id: `py{310,311}-{a,b}`
/// becomes `py310-a`, `py310-b`, `py311-a`, `py311-b`. Ids without braces
/// are returned unchanged.
pub fn expand_factors(item: &str) -> Result<Vec<String>, ConfigError> {
    let invalid = |reason: &str| ConfigError::FactorList {
        value: item.to_string(),
        reason: reason.to_string(),
    };

    let mut results = vec![String::new()];
    let mut rest = item;
    while let Some(open) = rest.find(['{', '}']) {
        if rest[open..].starts_with('}') {
            return Err(invalid("unmatched '}'"));
        }
        let close = rest[open + 1..]
            .find(['{', '}'])
            .map(|offset| open + 1 + offset)
            .ok_or_else(|| invalid("unmatched '{'"))?;
        if rest[close..].starts_with('{') {
            return Err(invalid("nested factor groups are not supported"));
        }

        let prefix = &rest[..open];
        let factors: Vec<&str> = rest[open + 1..close].split(',').map(str::trim).collect();
        if factors.iter().any(|f| f.is_empty()) {
            return Err(invalid("empty factor"));
        }
        results = results
            .iter()
            .flat_map(|head| factors.iter().map(move |factor| format!("{head}{prefix}{factor}")))
            .collect();
        rest = &rest[close + 1..];
    }

    for result in &mut results {
        result.push_str(rest);
    }
    Ok(results)
}

/// Splits a multi-line value into its non-empty lines.
pub fn split_lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_lines_extend_previous_value() {
        let doc = IniDocument::parse(
            "[testenv]\n; comment\ncommands =\n    pytest\n\n    # skipped\n    coverage report\n",
        )
        .unwrap();
        let section = doc.section("testenv").unwrap();
        assert_eq!(section.get("commands"), Some("pytest\ncoverage report"));
        assert_eq!(split_lines(section.get("commands").unwrap()), vec!["pytest", "coverage report"]);
    }

    #[test]
    fn values_keep_inner_equals_signs() {
        let doc = IniDocument::parse("[a]\nsetenv = A=1\n").unwrap();
        assert_eq!(doc.section("a").unwrap().get("setenv"), Some("A=1"));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(
            IniDocument::parse("[a]\nx = 1\nx = 2\n"),
            Err(ConfigError::Syntax { line: 3, .. })
        ));
        assert!(matches!(
            IniDocument::parse("    orphan\n"),
            Err(ConfigError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            IniDocument::parse("[a\n"),
            Err(ConfigError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            IniDocument::parse("[a]\njust words\n"),
            Err(ConfigError::Syntax { line: 2, .. })
        ));
    }

    #[test]
    fn lists_and_booleans() {
        assert_eq!(split_list("py310, py311\n  lint"), vec!["py310", "py311", "lint"]);
        assert_eq!(split_list("py{310, 311}, lint"), vec!["py{310,311}", "lint"]);
        assert!(parse_bool("k", "Yes").unwrap());
        assert!(!parse_bool("k", "0").unwrap());
        assert!(parse_bool("k", "sometimes").is_err());
    }

    #[test]
    fn factor_groups_expand_to_every_combination() {
        assert_eq!(expand_factors("lint").unwrap(), vec!["lint"]);
        assert_eq!(expand_factors("py{310,311}").unwrap(), vec!["py310", "py311"]);
        assert_eq!(
            expand_factors("py{310,311}-django{42,50}").unwrap(),
            vec!["py310-django42", "py310-django50", "py311-django42", "py311-django50"]
        );
    }

    #[test]
    fn malformed_factor_groups() {
        for item in ["py{310", "py310}", "py{{310}}", "py{310,}"] {
            assert!(
                matches!(expand_factors(item), Err(ConfigError::FactorList { .. })),
                "{item}"
            );
        }
    }
}
