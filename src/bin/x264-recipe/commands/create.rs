//! `x264-recipe create` command
//!
//! source -> build -> package, stopping at the first failure.

use anyhow::Result;

use super::Dirs;
use crate::cli::CreateArgs;
use x264_recipe::ops::{build, build_request, package, source, BuildOptions, SourceOptions};
use x264_recipe::util::shell::{Shell, Status};

pub fn execute(args: CreateArgs, dirs: &Dirs, shell: &Shell) -> Result<()> {
    let ctx = dirs.context()?;
    let req = build_request(&ctx, &args.settings.to_options())?;

    let source_opts = SourceOptions {
        force: args.force,
        ..SourceOptions::default()
    };
    source(&ctx, &source_opts, shell)?;

    let build_opts = BuildOptions {
        jobs: args.jobs,
        dry_run: false,
    };
    build(&ctx, &req, &build_opts, shell)?;

    let result = package(&ctx, &req, shell)?;
    if let Some(info) = &result.info {
        shell.status(
            Status::Finished,
            format!("{} {} ({})", info.name, info.version, info.libs.join(" ")),
        );
    }
    Ok(())
}
