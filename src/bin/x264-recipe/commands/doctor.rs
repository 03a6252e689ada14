//! `x264-recipe doctor` command

use anyhow::Result;

use super::Dirs;
use crate::cli::DoctorArgs;
use x264_recipe::ops::{doctor, format_report, DoctorOptions};

pub fn execute(args: DoctorArgs, dirs: &Dirs, verbose: bool) -> Result<()> {
    let ctx = dirs.context()?;
    let options = DoctorOptions {
        verbose,
        host: args.host,
    };

    let report = doctor(&ctx, &options)?;
    print!("{}", format_report(&report, options.verbose));

    if !report.all_required_passed() {
        std::process::exit(1);
    }

    Ok(())
}
