//! Command implementations

use std::path::PathBuf;

use anyhow::Result;

use x264_recipe::util::RecipeContext;

pub mod build;
pub mod completions;
pub mod create;
pub mod doctor;
pub mod info;
pub mod package;
pub mod plan;
pub mod source;

/// Directory overrides from the global flags.
pub struct Dirs {
    pub recipe_dir: Option<PathBuf>,
    pub package_dir: Option<PathBuf>,
}

impl Dirs {
    pub fn context(&self) -> Result<RecipeContext> {
        let ctx = match &self.recipe_dir {
            Some(dir) => RecipeContext::with_recipe_dir(dir.clone())?,
            None => RecipeContext::new()?,
        };
        Ok(match &self.package_dir {
            Some(dir) => ctx.with_package_dir(dir.clone()),
            None => ctx,
        })
    }
}
