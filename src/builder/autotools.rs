//! Autotools adapter: runs x264's `configure`, `make` and `make install`.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use thiserror::Error;

use crate::builder::plan::{EnvOverrides, ResolvedPlan};
use crate::builder::subsystem::{shell_quote, Subsystem};
use crate::util::process::{find_make, ProcessBuilder};

/// One step of the native build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Configure,
    Make,
    Install,
}

impl BuildStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStep::Configure => "configure",
            BuildStep::Make => "make",
            BuildStep::Install => "make install",
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A native build step exited unsuccessfully.
///
/// The exit code is the tool's own, passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("`{step}` failed with exit code {code}")]
    Failed { step: BuildStep, code: i32 },

    #[error("`{step}` was terminated by a signal")]
    Terminated { step: BuildStep },
}

impl StepError {
    /// Exit code to report to our own caller.
    pub fn exit_code(&self) -> i32 {
        match self {
            StepError::Failed { code, .. } => *code,
            StepError::Terminated { .. } => 1,
        }
    }
}

/// POSIX shell layer the steps run under on Windows hosts.
#[derive(Debug, Clone)]
pub struct ShellLayer {
    pub bash: PathBuf,
    pub subsystem: Subsystem,
}

/// Autotools build adapter.
pub struct AutotoolsBuilder<'a> {
    plan: &'a ResolvedPlan,
    source_dir: PathBuf,
    prefix: PathBuf,
    extra_env: EnvOverrides,
    shell: Option<ShellLayer>,
    make: Option<PathBuf>,
    jobs: Option<usize>,
}

impl<'a> AutotoolsBuilder<'a> {
    /// Create a builder for sources in `source_dir` installing into `prefix`.
    pub fn new(plan: &'a ResolvedPlan, source_dir: PathBuf, prefix: PathBuf) -> Self {
        AutotoolsBuilder {
            plan,
            source_dir,
            prefix,
            extra_env: EnvOverrides::default(),
            shell: None,
            make: None,
            jobs: None,
        }
    }

    /// Environment added on top of the plan's overrides.
    pub fn extra_env(mut self, env: EnvOverrides) -> Self {
        self.extra_env = env;
        self
    }

    /// Run every step through a POSIX shell layer.
    pub fn shell(mut self, shell: ShellLayer) -> Self {
        self.shell = Some(shell);
        self
    }

    /// Use a specific make program instead of searching PATH.
    pub fn make_program(mut self, make: impl Into<PathBuf>) -> Self {
        self.make = Some(make.into());
        self
    }

    /// Number of parallel make jobs.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// The `--prefix` value, translated for the shell layer if one is used.
    pub fn prefix_arg(&self) -> String {
        let prefix = match &self.shell {
            Some(layer) => layer.subsystem.unix_path(&self.prefix),
            None => self.prefix.display().to_string(),
        };
        format!("--prefix={}", prefix)
    }

    /// Full argument list passed to `configure`.
    pub fn configure_args(&self) -> Vec<String> {
        let mut args = vec![self.prefix_arg()];
        args.extend(self.plan.configure_args().iter().cloned());
        args
    }

    /// The steps this build runs, in order.
    pub fn steps(&self) -> Vec<BuildStep> {
        let mut steps = vec![BuildStep::Configure, BuildStep::Make];
        if !self.plan.skip_install_step() {
            steps.push(BuildStep::Install);
        }
        steps
    }

    /// Build the process for one step without running it.
    pub fn command(&self, step: BuildStep) -> Result<ProcessBuilder> {
        let words: Vec<String> = match step {
            BuildStep::Configure => {
                let mut words = vec!["./configure".to_string()];
                words.extend(self.configure_args());
                words
            }
            BuildStep::Make => {
                let mut words = vec![self.make_name()?];
                if let Some(jobs) = self.jobs {
                    words.push(format!("-j{}", jobs));
                }
                words
            }
            BuildStep::Install => vec![self.make_name()?, "install".to_string()],
        };

        let cmd = match &self.shell {
            Some(layer) => {
                let line = words
                    .iter()
                    .map(|w| shell_quote(w))
                    .collect::<Vec<_>>()
                    .join(" ");
                ProcessBuilder::new(&layer.bash).args(["-c".to_string(), line])
            }
            None => ProcessBuilder::new(&words[0]).args(&words[1..]),
        };

        Ok(cmd.cwd(&self.source_dir).envs(self.rendered_env()))
    }

    /// Configure, build and (unless skipped) install.
    pub fn build(&self) -> Result<()> {
        self.build_with(|_| {})
    }

    /// Like [`build`](Self::build), calling `on_step` before each step runs.
    pub fn build_with<F>(&self, mut on_step: F) -> Result<()>
    where
        F: FnMut(BuildStep),
    {
        if !self.source_dir.join("configure").exists() {
            bail!(
                "no configure script in {}\n\
                 \n\
                 Run the `source` step first to fetch the x264 snapshot.",
                self.source_dir.display()
            );
        }

        for step in self.steps() {
            on_step(step);
            self.run(step)?;
        }

        if self.plan.skip_install_step() {
            tracing::info!("Skipping `make install` for this target/host combination");
        }

        Ok(())
    }

    /// Run a single step, failing with its exit code.
    pub fn run(&self, step: BuildStep) -> Result<()> {
        let cmd = self.command(step)?;
        tracing::info!("Running {}", step);
        tracing::debug!("{}", cmd.display_command());

        let status = cmd.status()?;
        if status.success() {
            return Ok(());
        }

        let err = match status.code() {
            Some(code) => StepError::Failed { step, code },
            None => StepError::Terminated { step },
        };
        Err(err.into())
    }

    fn make_name(&self) -> Result<String> {
        if let Some(make) = &self.make {
            return Ok(make.display().to_string());
        }
        // Under a shell layer the subsystem's own make is on PATH.
        if self.shell.is_some() {
            return Ok("make".to_string());
        }
        match find_make() {
            Some(path) => Ok(path.display().to_string()),
            None => bail!(
                "make not found\n\
                 \n\
                 GNU make is required to build x264.\n\
                 Install make and ensure it's in your PATH."
            ),
        }
    }

    pub(crate) fn rendered_env(&self) -> Vec<(String, String)> {
        let mut env = self.plan.env().clone();
        env.extend(self.extra_env.clone());
        let sep = if cfg!(windows) { ';' } else { ':' };
        env.render_with(sep, |key| std::env::var(key).ok())
    }
}

/// Check if a directory contains an autotools-style configure script.
pub fn is_configure_project(dir: &Path) -> bool {
    dir.join("configure").is_file()
}
