//! Recipe metadata for the wrapped x264 snapshot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use url::Url;

/// Package name the recipe produces.
pub const PACKAGE_NAME: &str = "libx264";

/// Default snapshot date.
pub const DEFAULT_VERSION: &str = "20171211";

/// Snapshot build number paired with [`DEFAULT_VERSION`].
pub const DEFAULT_SNAPSHOT_BUILD: &str = "2245";

/// Download location of nightly snapshots. `{version}` and `{build}` are substituted.
pub const DEFAULT_URL_TEMPLATE: &str =
    "http://download.videolan.org/pub/videolan/x264/snapshots/x264-snapshot-{version}-{build}.tar.bz2";

/// Canonical name of the extracted source folder.
pub const SOURCE_SUBFOLDER: &str = "sources";

/// License file shipped by x264.
pub const LICENSE_FILE: &str = "COPYING";

/// Public headers installed by x264.
pub const HEADERS: &[&str] = &["x264.h", "x264_config.h"];

/// Minimum nasm required to assemble x264's x86 code.
pub const NASM_MIN_VERSION: &str = "2.13.2";

pub const DESCRIPTION: &str = "x264 is a free software library and application for encoding \
                               video streams into the H.264/MPEG-4 AVC compression format";

pub const HOMEPAGE: &str = "https://www.videolan.org/developers/x264.html";

/// Identifies one x264 snapshot and where to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub version: String,
    pub snapshot_build: String,
    pub url_template: String,
    /// Expected SHA-256 of the archive, if pinned.
    pub sha256: Option<String>,
}

impl Default for Recipe {
    fn default() -> Self {
        Recipe {
            version: DEFAULT_VERSION.to_string(),
            snapshot_build: DEFAULT_SNAPSHOT_BUILD.to_string(),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            sha256: None,
        }
    }
}

impl Recipe {
    /// Directory name the archive extracts to.
    pub fn extracted_dir_name(&self) -> String {
        format!("x264-snapshot-{}-{}", self.version, self.snapshot_build)
    }

    /// Fully substituted download URL.
    pub fn source_url(&self) -> Result<Url> {
        let raw = self
            .url_template
            .replace("{version}", &self.version)
            .replace("{build}", &self.snapshot_build);
        Url::parse(&raw).with_context(|| format!("invalid source URL: {}", raw))
    }

    /// Where the renamed sources live under a recipe directory.
    pub fn source_dir(recipe_dir: &Path) -> PathBuf {
        recipe_dir.join(SOURCE_SUBFOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_source_url() {
        let recipe = Recipe::default();
        assert_eq!(
            recipe.source_url().unwrap().as_str(),
            "http://download.videolan.org/pub/videolan/x264/snapshots/x264-snapshot-20171211-2245.tar.bz2"
        );
        assert_eq!(recipe.extracted_dir_name(), "x264-snapshot-20171211-2245");
    }

    #[test]
    fn test_custom_version() {
        let recipe = Recipe {
            version: "20180101".to_string(),
            snapshot_build: "2300".to_string(),
            ..Recipe::default()
        };
        assert!(recipe
            .source_url()
            .unwrap()
            .as_str()
            .ends_with("x264-snapshot-20180101-2300.tar.bz2"));
    }

    #[test]
    fn test_invalid_template() {
        let recipe = Recipe {
            url_template: "not a url/{version}".to_string(),
            ..Recipe::default()
        };
        assert!(recipe.source_url().is_err());
    }
}
