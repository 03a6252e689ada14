//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.x264-recipe/config.toml` - User-wide defaults
//! - Project: `<recipe dir>/.x264-recipe/config.toml` - Per-checkout overrides
//!
//! Project config takes precedence over global config. CLI flags take
//! precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::subsystem::Subsystem;
use crate::core::recipe::Recipe;
use crate::core::settings::{BitDepth, BuildType, MsvcRuntime};

/// Name of the per-user and per-project config directory.
pub const CONFIG_DIR_NAME: &str = ".x264-recipe";

/// Recipe configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which snapshot to fetch
    pub source: SourceConfig,

    /// Package options
    pub options: OptionsConfig,

    /// Build settings
    pub build: BuildConfig,

    /// Settings overriding host detection
    pub settings: SettingsConfig,
}

/// Snapshot selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Snapshot date (e.g. "20171211")
    pub version: Option<String>,

    /// Snapshot build number (e.g. "2245")
    pub build: Option<String>,

    /// URL template with `{version}` and `{build}` placeholders
    pub url: Option<String>,

    /// Expected SHA-256 of the archive
    pub sha256: Option<String>,
}

/// Package options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub shared: Option<bool>,

    /// Ignored for Windows targets and shared builds
    pub fpic: Option<bool>,

    pub bit_depth: Option<BitDepth>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Number of parallel make jobs (None = number of CPUs)
    pub jobs: Option<usize>,

    pub build_type: Option<BuildType>,

    /// POSIX layer for Windows hosts
    pub subsystem: Option<Subsystem>,

    /// Cygwin `bin` directory prepended to PATH for Windows targets
    pub cygwin_bin: Option<PathBuf>,
}

/// Settings that normally come from host detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub os: Option<String>,
    pub arch: Option<String>,
    pub compiler: Option<String>,
    pub compiler_version: Option<String>,
    pub runtime: Option<MsvcRuntime>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }

        let contents =
            toml::to_string_pretty(self).with_context(|| "failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config file: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        fn take<T>(slot: &mut Option<T>, other: Option<T>) {
            if other.is_some() {
                *slot = other;
            }
        }

        take(&mut self.source.version, other.source.version);
        take(&mut self.source.build, other.source.build);
        take(&mut self.source.url, other.source.url);
        take(&mut self.source.sha256, other.source.sha256);

        take(&mut self.options.shared, other.options.shared);
        take(&mut self.options.fpic, other.options.fpic);
        take(&mut self.options.bit_depth, other.options.bit_depth);

        take(&mut self.build.jobs, other.build.jobs);
        take(&mut self.build.build_type, other.build.build_type);
        take(&mut self.build.subsystem, other.build.subsystem);
        take(&mut self.build.cygwin_bin, other.build.cygwin_bin);

        take(&mut self.settings.os, other.settings.os);
        take(&mut self.settings.arch, other.settings.arch);
        take(&mut self.settings.compiler, other.settings.compiler);
        take(&mut self.settings.compiler_version, other.settings.compiler_version);
        take(&mut self.settings.runtime, other.settings.runtime);
    }

    /// The snapshot described by this config, defaults filled in.
    pub fn recipe(&self) -> Recipe {
        let defaults = Recipe::default();
        Recipe {
            version: self.source.version.clone().unwrap_or(defaults.version),
            snapshot_build: self.source.build.clone().unwrap_or(defaults.snapshot_build),
            url_template: self.source.url.clone().unwrap_or(defaults.url_template),
            sha256: self.source.sha256.clone(),
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global config directory (~/.x264-recipe).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME))
}

/// Get the global config path (~/.x264-recipe/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<recipe dir>/.x264-recipe/config.toml).
pub fn project_config_path(recipe_dir: &Path) -> PathBuf {
    recipe_dir.join(CONFIG_DIR_NAME).join("config.toml")
}
