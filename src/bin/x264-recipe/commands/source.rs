//! `x264-recipe source` command

use anyhow::Result;

use super::Dirs;
use crate::cli::SourceArgs;
use x264_recipe::ops::{source, SourceOptions};
use x264_recipe::util::shell::{Shell, Status};

pub fn execute(args: SourceArgs, dirs: &Dirs, shell: &Shell) -> Result<()> {
    let ctx = dirs.context()?;
    let opts = SourceOptions {
        force: args.force,
        no_cache: args.no_cache,
    };

    let dir = source(&ctx, &opts, shell)?;
    shell.status(Status::Finished, format!("sources at {}", dir.display()));
    shell.json_event(&serde_json::json!({
        "reason": "source-ready",
        "path": dir,
    }));
    Ok(())
}
