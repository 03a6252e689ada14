//! Recipe context: the directories one recipe invocation works in, plus
//! its merged configuration.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::recipe::Recipe;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "x264-recipe", "x264-recipe"));

/// Directories and configuration for one recipe run.
#[derive(Debug, Clone)]
pub struct RecipeContext {
    /// The recipe's own working directory
    recipe_dir: PathBuf,

    /// Where packaged artifacts are staged
    package_dir: PathBuf,

    /// Download cache for snapshot archives
    cache_dir: PathBuf,

    config: Config,
}

impl RecipeContext {
    /// Create a context rooted at the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Self::with_recipe_dir(cwd)
    }

    /// Create a context rooted at `recipe_dir`, loading global and project config.
    pub fn with_recipe_dir(recipe_dir: PathBuf) -> Result<Self> {
        let recipe_dir = if recipe_dir.is_absolute() {
            recipe_dir
        } else {
            std::env::current_dir()
                .context("failed to get current directory")?
                .join(recipe_dir)
        };

        let global = global_config_path();
        let config = load_config(global.as_deref(), &project_config_path(&recipe_dir));

        let cache_dir = match PROJECT_DIRS.as_ref() {
            Some(dirs) => dirs.cache_dir().to_path_buf(),
            None => recipe_dir.join(".x264-recipe").join("cache"),
        };

        Ok(RecipeContext {
            package_dir: recipe_dir.join("package"),
            recipe_dir,
            cache_dir,
            config,
        })
    }

    /// Replace the loaded configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Stage the package somewhere other than `<recipe dir>/package`.
    pub fn with_package_dir(mut self, package_dir: PathBuf) -> Self {
        self.package_dir = if package_dir.is_absolute() {
            package_dir
        } else {
            self.recipe_dir.join(package_dir)
        };
        self
    }

    /// Put the download cache somewhere specific.
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub fn recipe_dir(&self) -> &Path {
        &self.recipe_dir
    }

    /// The extracted x264 sources (`<recipe dir>/sources`).
    pub fn source_dir(&self) -> PathBuf {
        Recipe::source_dir(&self.recipe_dir)
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The snapshot selected by configuration.
    pub fn recipe(&self) -> Recipe {
        self.config.recipe()
    }
}
