//! # Command Substitution / 命令替换
//!
//! Expands placeholders in a command's argument vector just before it runs:
//! `{envname}`, `{envdir}`, `{configdir}` (alias `{toxinidir}`) and
//! `{posargs}` / `{posargs:default}`, followed by `~` and `$VAR` expansion.
//! Variables come from the environment's `setenv` first, then the process
//! environment; unknown ones (`$1`, `$?`, awk fields) are left verbatim for
//! the command's own shell.

use std::collections::BTreeMap;
use std::path::Path;

/// Values placeholders expand to.
#[derive(Debug, Clone, Copy)]
pub struct SubstitutionContext<'a> {
    pub envname: &'a str,
    pub envdir: &'a Path,
    pub configdir: &'a Path,
    /// Extra arguments passed after `--` on the command line.
    pub posargs: &'a [String],
    /// The environment's `setenv` entries.
    pub setenv: &'a BTreeMap<String, String>,
}

/// Expands `argv`. A token that is exactly `{posargs}` (or
/// `{posargs:default}`) is replaced by the positional arguments as separate
/// tokens; embedded occurrences are replaced by the arguments joined with
/// spaces.
pub fn expand_argv(argv: &[String], ctx: &SubstitutionContext<'_>) -> Vec<String> {
    let mut expanded = Vec::with_capacity(argv.len());

    for token in argv {
        if let Some(default) = posargs_token(token) {
            if !ctx.posargs.is_empty() {
                expanded.extend(ctx.posargs.iter().cloned());
            } else if let Some(default) = default {
                expanded.push(default.to_string());
            }
            continue;
        }

        let replaced = token
            .replace("{envname}", ctx.envname)
            .replace("{envdir}", &ctx.envdir.display().to_string())
            .replace("{configdir}", &ctx.configdir.display().to_string())
            .replace("{toxinidir}", &ctx.configdir.display().to_string())
            .replace("{posargs}", &ctx.posargs.join(" "));

        let home_expanded = shellexpand::tilde(&replaced);
        let value =
            shellexpand::env_with_context_no_errors(&home_expanded, |name: &str| lookup_var(ctx, name))
                .into_owned();
        expanded.push(value);
    }

    expanded
}

fn lookup_var(ctx: &SubstitutionContext<'_>, name: &str) -> Option<String> {
    ctx.setenv
        .get(name)
        .cloned()
        .or_else(|| std::env::var(name).ok())
}

/// `Some(default)` when `token` is a whole posargs placeholder.
fn posargs_token(token: &str) -> Option<Option<&str>> {
    let inner = token.strip_prefix('{')?.strip_suffix('}')?;
    if inner == "posargs" {
        return Some(None);
    }
    inner
        .strip_prefix("posargs:")
        .map(|default| Some(default).filter(|d| !d.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn posargs_splice_and_default() {
        let envdir = PathBuf::from("/tmp/env");
        let configdir = PathBuf::from("/project");
        let posargs = argv(&["-k", "slow"]);
        let ctx = SubstitutionContext {
            envname: "py310",
            envdir: &envdir,
            configdir: &configdir,
            posargs: &posargs,
            setenv: &BTreeMap::new(),
        };
        assert_eq!(
            expand_argv(&argv(&["pytest", "{posargs}"]), &ctx),
            argv(&["pytest", "-k", "slow"])
        );

        let empty: Vec<String> = Vec::new();
        let ctx = SubstitutionContext { posargs: &empty, ..ctx };
        assert_eq!(
            expand_argv(&argv(&["pytest", "{posargs:tests}"]), &ctx),
            argv(&["pytest", "tests"])
        );
        assert_eq!(
            expand_argv(&argv(&["pytest", "{posargs}"]), &ctx),
            argv(&["pytest"])
        );
    }

    #[test]
    fn named_placeholders() {
        let envdir = PathBuf::from("/tmp/env");
        let configdir = PathBuf::from("/project");
        let ctx = SubstitutionContext {
            envname: "lint",
            envdir: &envdir,
            configdir: &configdir,
            posargs: &[],
            setenv: &BTreeMap::new(),
        };
        assert_eq!(
            expand_argv(&argv(&["echo", "{envname}:{envdir}", "{toxinidir}/src"]), &ctx),
            argv(&["echo", "lint:/tmp/env", "/project/src"])
        );
    }

    #[test]
    fn shell_variables_pass_through_untouched() {
        let envdir = PathBuf::from("/tmp/env");
        let configdir = PathBuf::from("/project");
        let setenv = BTreeMap::from([("COVERAGE_FILE".to_string(), "/tmp/cov".to_string())]);
        let ctx = SubstitutionContext {
            envname: "unit",
            envdir: &envdir,
            configdir: &configdir,
            posargs: &[],
            setenv: &setenv,
        };
        assert_eq!(
            expand_argv(
                &argv(&["sh", "-c", "test -z \"$1\" && exit $?", "x", "awk '{print $2}'"]),
                &ctx
            ),
            argv(&["sh", "-c", "test -z \"$1\" && exit $?", "x", "awk '{print $2}'"])
        );
        assert_eq!(
            expand_argv(&argv(&["coverage", "--data-file=$COVERAGE_FILE", "${ENV_MATRIX_UNSET_VAR}"]), &ctx),
            argv(&["coverage", "--data-file=/tmp/cov", "${ENV_MATRIX_UNSET_VAR}"])
        );
    }
}
