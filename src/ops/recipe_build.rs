//! The `build` step: resolve the plan and drive configure/make/install.

use anyhow::{bail, Result};

use crate::builder::autotools::{AutotoolsBuilder, BuildStep, ShellLayer};
use crate::builder::plan::{resolve, EnvOverrides, ResolvedPlan};
use crate::builder::subsystem::locate_bash;
use crate::builder::vcvars::developer_env;
use crate::core::settings::BuildRequest;
use crate::util::fs::ensure_dir;
use crate::util::shell::{Shell, Status};
use crate::util::RecipeContext;

/// Options for the build step.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Number of parallel make jobs (None = config, then CPU count)
    pub jobs: Option<usize>,
    /// Resolve and report, but do not run anything.
    pub dry_run: bool,
}

/// Outcome of the build step.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub plan: ResolvedPlan,
    pub installed: bool,
}

/// Environment the Windows targets need on top of the resolved plan.
///
/// The Cygwin `bin` directory goes on PATH and the bash inside it is
/// exported for scripts that look for it.
pub fn platform_env(req: &BuildRequest, ctx: &RecipeContext) -> EnvOverrides {
    let mut env = EnvOverrides::default();
    if !req.platform.is_windows() {
        return env;
    }

    if let Some(bin) = &ctx.config().build.cygwin_bin {
        env.prepend_path(bin.display().to_string());
        env.set(
            "RECIPE_BASH_PATH",
            bin.join("bash.exe").display().to_string(),
        );
    }
    env
}

/// Combine the MSVC developer environment with the platform environment.
///
/// Developer tool directories go first on PATH so MSVC's `link` wins over
/// the coreutils `link` in Cygwin's `bin`.
pub fn merge_developer_env(developer: EnvOverrides, platform: EnvOverrides) -> EnvOverrides {
    let mut env = developer;
    env.extend(platform);
    env
}

/// MSVC builds on a Windows host need `vcvarsall.bat` loaded first.
fn needs_developer_env(req: &BuildRequest) -> bool {
    req.compiler.is_msvc() && req.host.is_windows()
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Run the build for `req`.
pub fn build(
    ctx: &RecipeContext,
    req: &BuildRequest,
    opts: &BuildOptions,
    shell: &Shell,
) -> Result<BuildResult> {
    let plan = resolve(req);
    let jobs = opts
        .jobs
        .or(ctx.config().build.jobs)
        .unwrap_or_else(default_jobs);

    let mut builder = AutotoolsBuilder::new(
        &plan,
        ctx.source_dir(),
        ctx.package_dir().to_path_buf(),
    )
    .extra_env(platform_env(req, ctx))
    .jobs(jobs);

    if plan.needs_shell_emulation() {
        let cygwin_bin = ctx.config().build.cygwin_bin.as_deref();
        let Some(bash) = locate_bash(cygwin_bin) else {
            bail!(
                "bash not found\n\
                 \n\
                 Building x264 with {} on this host needs a POSIX shell.\n\
                 Install Cygwin or MSYS2 and set `build.cygwin_bin` in the config.",
                req.compiler
            );
        };
        let subsystem = ctx.config().build.subsystem.unwrap_or_default();
        tracing::debug!("Using {} bash at {}", subsystem, bash.display());
        builder = builder.shell(ShellLayer { bash, subsystem });
    }

    shell.note(format!(
        "x264 for {} ({}, {}, {})",
        req.platform, req.arch, req.compiler, req.build_type
    ));

    if opts.dry_run {
        for step in builder.steps() {
            let cmd = builder.command(step)?;
            shell.note(cmd.display_command());
        }
        return Ok(BuildResult {
            installed: false,
            plan,
        });
    }

    if needs_developer_env(req) {
        let developer = developer_env(&req.arch)?;
        builder = builder.extra_env(merge_developer_env(developer, platform_env(req, ctx)));
    }

    ensure_dir(ctx.package_dir())?;
    builder.build_with(|step| {
        let status = match step {
            BuildStep::Configure => Status::Configuring,
            BuildStep::Make => Status::Building,
            BuildStep::Install => Status::Installing,
        };
        shell.status(status, step);
    })?;

    let installed = !plan.skip_install_step();
    if !installed {
        shell.status(Status::Skipped, "make install (Android target on a Windows host)");
    }
    shell.status(Status::Finished, "x264 build");

    Ok(BuildResult { plan, installed })
}
