//! `x264-recipe build` command

use anyhow::Result;

use super::Dirs;
use crate::cli::BuildArgs;
use x264_recipe::ops::{build, build_request, BuildOptions};
use x264_recipe::util::shell::Shell;

pub fn execute(args: BuildArgs, dirs: &Dirs, shell: &Shell) -> Result<()> {
    let ctx = dirs.context()?;
    let req = build_request(&ctx, &args.settings.to_options())?;

    let opts = BuildOptions {
        jobs: args.jobs,
        dry_run: args.dry_run,
    };
    let result = build(&ctx, &req, &opts, shell)?;

    shell.json_event(&serde_json::json!({
        "reason": "build-finished",
        "installed": result.installed,
        "dry_run": args.dry_run,
        "prefix": ctx.package_dir(),
    }));
    Ok(())
}
