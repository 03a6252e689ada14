//! `x264-recipe info` command
//!
//! Prints what a consumer links against for the given settings. Nothing
//! needs to be built for this.

use anyhow::{Context, Result};

use super::Dirs;
use crate::cli::InfoArgs;
use x264_recipe::core::recipe::{DESCRIPTION, HOMEPAGE};
use x264_recipe::ops::{build_request, PackageInfo};
use x264_recipe::util::shell::Shell;

pub fn execute(args: InfoArgs, dirs: &Dirs, shell: &Shell) -> Result<()> {
    let ctx = dirs.context()?;
    let req = build_request(&ctx, &args.settings.to_options())?;
    let info = PackageInfo::for_request(&req, &ctx.recipe());

    if shell.is_json() {
        let text = serde_json::to_string_pretty(&info).context("failed to serialize package info")?;
        println!("{}", text);
        return Ok(());
    }

    println!("{} {}", info.name, info.version);
    println!("{}", DESCRIPTION);
    println!("{}", HOMEPAGE);
    println!();
    println!("libs:         {}", info.libs.join(" "));
    if !info.system_libs.is_empty() {
        println!("system libs:  {}", info.system_libs.join(" "));
    }
    println!("include dirs: {}", info.include_dirs.join(" "));
    println!("lib dirs:     {}", info.lib_dirs.join(" "));
    if !info.bin_dirs.is_empty() {
        println!("bin dirs:     {}", info.bin_dirs.join(" "));
    }
    Ok(())
}
