//! `x264-recipe package` command

use anyhow::Result;

use super::Dirs;
use crate::cli::PackageArgs;
use x264_recipe::ops::{build_request, package};
use x264_recipe::util::shell::Shell;

pub fn execute(args: PackageArgs, dirs: &Dirs, shell: &Shell) -> Result<()> {
    let ctx = dirs.context()?;
    let req = build_request(&ctx, &args.settings.to_options())?;

    let result = package(&ctx, &req, shell)?;

    shell.json_event(&serde_json::json!({
        "reason": "package-finished",
        "path": ctx.package_dir(),
        "license": result.license,
        "headers": result.headers,
        "libraries": result.libraries,
    }));
    Ok(())
}
