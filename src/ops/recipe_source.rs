//! The `source` step: put the x264 snapshot at `<recipe dir>/sources`.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::autotools::is_configure_project;
use crate::core::recipe::SOURCE_SUBFOLDER;
use crate::sources::SnapshotSource;
use crate::util::shell::{Shell, Status};
use crate::util::RecipeContext;

/// Options for the source step.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Re-download and re-extract even if sources are present.
    pub force: bool,
    /// Do not keep the archive in the download cache.
    pub no_cache: bool,
}

/// Fetch and extract the snapshot. Returns the source directory.
pub fn source(ctx: &RecipeContext, opts: &SourceOptions, shell: &Shell) -> Result<PathBuf> {
    let dest = ctx.source_dir();

    if !opts.force && is_configure_project(&dest) {
        shell.status(
            Status::Skipped,
            format!("sources already present at {}", dest.display()),
        );
        return Ok(dest);
    }

    let recipe = ctx.recipe();
    tracing::info!(
        "Fetching x264 snapshot {}-{}",
        recipe.version,
        recipe.snapshot_build
    );

    let mut snapshot = SnapshotSource::new(&recipe);
    if !opts.no_cache {
        snapshot = snapshot.with_cache_dir(ctx.cache_dir().join("archives"));
    }

    snapshot.fetch(ctx.recipe_dir(), SOURCE_SUBFOLDER, shell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::shell::ColorChoice;
    use tempfile::TempDir;

    #[test]
    fn test_existing_sources_are_kept() {
        let tmp = TempDir::new().unwrap();
        let sources = tmp.path().join("sources");
        std::fs::create_dir_all(&sources).unwrap();
        std::fs::write(sources.join("configure"), "#!/bin/sh\n").unwrap();

        let ctx = RecipeContext::with_recipe_dir(tmp.path().to_path_buf()).unwrap();
        let shell = Shell::from_flags(true, false, ColorChoice::Never, false);

        let dir = source(&ctx, &SourceOptions::default(), &shell).unwrap();
        assert_eq!(dir, sources);
        assert!(sources.join("configure").is_file());
    }
}
