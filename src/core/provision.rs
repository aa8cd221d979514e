//! # Provisioning Module / 环境准备模块
//!
//! Prepares the isolated execution context of an environment: finding the
//! interpreter it asks for and installing its dependencies. The
//! [`Provisioner`] trait is the seam between the executor and the host;
//! [`VenvProvisioner`] builds a virtualenv per environment, while
//! [`HostProvisioner`] only checks that the interpreter exists and runs
//! commands against the host as-is.
//!
//! 准备环境的隔离执行上下文：查找所需的解释器并安装其依赖。

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use crate::core::deps::pip_args;
use crate::core::models::{DependencySource, Environment};
use crate::error::ProvisionError;
use crate::infra::{command, fs};

/// Scoped isolated context of one environment. The backing directory is
/// deleted when this value is dropped.
/// 单个环境的作用域隔离上下文。当此值被丢弃时，其目录会被删除。
pub struct IsolatedContext {
    _temp_root: TempDir,
    /// Root directory of the context (`{envdir}`).
    pub root: PathBuf,
    /// Directories searched for programs before the host `PATH`.
    pub bin_dirs: Vec<PathBuf>,
    /// Extra variables exported to every command.
    pub vars: BTreeMap<String, String>,
}

impl IsolatedContext {
    pub fn create(work_dir: Option<&Path>, env_name: &str) -> Result<Self, ProvisionError> {
        let temp_dir = fs::create_env_dir(work_dir, env_name)?;
        let root = temp_dir.path().to_path_buf();
        Ok(Self {
            _temp_root: temp_dir,
            root,
            bin_dirs: Vec::new(),
            vars: BTreeMap::new(),
        })
    }

    /// `PATH` for commands of this context, if it adds any directories.
    pub fn path_var(&self) -> Option<OsString> {
        if self.bin_dirs.is_empty() {
            return None;
        }
        fs::prepend_path(&self.bin_dirs)
    }
}

impl std::fmt::Debug for IsolatedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolatedContext")
            .field("root", &self.root)
            .field("bin_dirs", &self.bin_dirs)
            .finish_non_exhaustive()
    }
}

/// Everything a provisioner needs to install one environment.
#[derive(Debug)]
pub struct ProvisionRequest<'a> {
    pub env: &'a Environment,
    pub interpreter: &'a Path,
    /// The resolved dependency union; never contains `File` entries.
    pub deps: &'a [DependencySource],
    /// Directory installs run from, so relative paths resolve.
    pub config_dir: &'a Path,
}

/// Prepares isolated execution contexts.
#[allow(async_fn_in_trait)]
pub trait Provisioner {
    /// Finds the interpreter for `selector`, or `None` when the host cannot
    /// provide it.
    async fn locate_interpreter(&self, selector: &str) -> Option<PathBuf>;

    /// Installs `request` into `ctx`, returning any output worth keeping.
    async fn install(
        &self,
        request: &ProvisionRequest<'_>,
        ctx: &mut IsolatedContext,
    ) -> Result<Option<String>, ProvisionError>;
}

impl<P: Provisioner> Provisioner for &P {
    async fn locate_interpreter(&self, selector: &str) -> Option<PathBuf> {
        (**self).locate_interpreter(selector).await
    }

    async fn install(
        &self,
        request: &ProvisionRequest<'_>,
        ctx: &mut IsolatedContext,
    ) -> Result<Option<String>, ProvisionError> {
        (**self).install(request, ctx).await
    }
}

/// Creates a virtualenv inside the context and `pip install`s the
/// dependency union into it.
#[derive(Debug, Clone, Default)]
pub struct VenvProvisioner {
    /// Limit for each `venv`/`pip` invocation.
    pub install_timeout: Option<Duration>,
}

impl Provisioner for VenvProvisioner {
    async fn locate_interpreter(&self, selector: &str) -> Option<PathBuf> {
        fs::find_executable(selector, &[])
    }

    async fn install(
        &self,
        request: &ProvisionRequest<'_>,
        ctx: &mut IsolatedContext,
    ) -> Result<Option<String>, ProvisionError> {
        let venv_dir = ctx.root.join("venv");
        let mut log = String::new();

        let mut create = tokio::process::Command::new(request.interpreter);
        create.arg("-m").arg("venv").arg(&venv_dir);
        log.push_str(&self.run_step(create).await?);

        let bin_dir = venv_bin_dir(&venv_dir);
        ctx.vars.insert(
            "VIRTUAL_ENV".to_string(),
            venv_dir.display().to_string(),
        );
        ctx.bin_dirs.insert(0, bin_dir.clone());

        if request.deps.iter().any(DependencySource::is_requirement) {
            tracing::debug!(env = %request.env.name, deps = request.deps.len(), "installing dependencies");
            let mut pip = tokio::process::Command::new(bin_dir.join("python"));
            pip.args(["-m", "pip", "install"])
                .args(pip_args(request.deps))
                .current_dir(request.config_dir);
            log.push_str(&self.run_step(pip).await?);
        }

        Ok(Some(log))
    }
}

impl VenvProvisioner {
    async fn run_step(&self, cmd: tokio::process::Command) -> Result<String, ProvisionError> {
        let (completion, output) = command::spawn_and_capture(cmd, None, self.install_timeout).await;
        match completion? {
            command::Completion::Exited(status) if status.success() => Ok(output),
            command::Completion::Exited(status) => Err(ProvisionError::Install {
                code: status.code(),
                output,
            }),
            _ => Err(ProvisionError::Install { code: None, output }),
        }
    }
}

#[cfg(windows)]
fn venv_bin_dir(venv: &Path) -> PathBuf {
    venv.join("Scripts")
}

#[cfg(not(windows))]
fn venv_bin_dir(venv: &Path) -> PathBuf {
    venv.join("bin")
}

/// Runs environments directly on the host: the interpreter must exist on
/// `PATH`, and nothing is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProvisioner;

impl Provisioner for HostProvisioner {
    async fn locate_interpreter(&self, selector: &str) -> Option<PathBuf> {
        fs::find_executable(selector, &[])
    }

    async fn install(
        &self,
        request: &ProvisionRequest<'_>,
        _ctx: &mut IsolatedContext,
    ) -> Result<Option<String>, ProvisionError> {
        if !request.deps.is_empty() {
            tracing::warn!(
                env = %request.env.name,
                deps = request.deps.len(),
                "provisioning disabled; dependencies are not installed"
            );
        }
        Ok(None)
    }
}

/// Asks `python3` for its version, e.g. `3.11.4`.
pub async fn detect_interpreter_label() -> Option<String> {
    let program = fs::find_executable("python3", &[])?;
    let mut cmd = tokio::process::Command::new(program);
    cmd.arg("--version");
    let (completion, output) =
        command::spawn_and_capture(cmd, None, Some(Duration::from_secs(10))).await;
    if !completion.ok()?.success() {
        return None;
    }
    parse_version_output(&output)
}

/// Extracts the version from `Python 3.11.4` style output.
pub fn parse_version_output(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .find(|word| word.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .map(str::to_string)
}
