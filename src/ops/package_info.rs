//! Consumer-facing description of a packaged x264 build.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::recipe::{Recipe, PACKAGE_NAME};
use crate::core::settings::BuildRequest;
use crate::util::fs::write_string;

/// File written next to the packaged artifacts.
pub const PACKAGE_INFO_FILE: &str = "package_info.json";

/// What a consumer needs to link against the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub libs: Vec<String>,
    pub system_libs: Vec<String>,
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
}

/// Name of the library a consumer links.
///
/// MSVC shared builds link the import library, MinGW shared builds the
/// DLL itself; everything else uses the plain `x264` name.
pub fn library_name(req: &BuildRequest) -> &'static str {
    if req.shared && req.compiler.is_msvc() {
        "libx264.dll.lib"
    } else if req.shared && req.is_mingw() {
        "x264.dll"
    } else {
        "x264"
    }
}

/// Extra libraries the platform needs when linking x264 statically or dynamically.
pub fn system_libs(req: &BuildRequest) -> Vec<String> {
    if req.platform.is_linux() {
        vec!["dl".to_string(), "pthread".to_string()]
    } else {
        Vec::new()
    }
}

impl PackageInfo {
    pub fn for_request(req: &BuildRequest, recipe: &Recipe) -> Self {
        let mut bin_dirs = Vec::new();
        if req.shared && req.platform.is_windows() {
            bin_dirs.push("bin".to_string());
        }

        PackageInfo {
            name: PACKAGE_NAME.to_string(),
            version: recipe.version.clone(),
            libs: vec![library_name(req).to_string()],
            system_libs: system_libs(req),
            include_dirs: vec!["include".to_string()],
            lib_dirs: vec!["lib".to_string()],
            bin_dirs,
        }
    }

    /// Write as pretty JSON into `package_dir`.
    pub fn write(&self, package_dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize package info")?;
        write_string(&package_dir.join(PACKAGE_INFO_FILE), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{Compiler, MsvcRuntime, Platform, UnixOs};

    fn msvc() -> Compiler {
        Compiler::Msvc {
            version: "15".into(),
            runtime: MsvcRuntime::MD,
        }
    }

    fn gcc() -> Compiler {
        Compiler::Gcc {
            version: "7".into(),
        }
    }

    fn linux() -> Platform {
        Platform::Unix {
            os: UnixOs::Linux,
            fpic: true,
        }
    }

    #[test]
    fn test_library_names() {
        let r = |p: Platform, c: Compiler, shared: bool| {
            library_name(&BuildRequest::new(p, c, "/r").with_shared(shared))
        };

        assert_eq!(r(Platform::Windows, msvc(), true), "libx264.dll.lib");
        assert_eq!(r(Platform::Windows, msvc(), false), "x264");
        assert_eq!(r(Platform::Windows, gcc(), true), "x264.dll");
        assert_eq!(r(Platform::Windows, gcc(), false), "x264");
        assert_eq!(r(linux(), gcc(), true), "x264");
    }

    #[test]
    fn test_linux_system_libs() {
        let req = BuildRequest::new(linux(), gcc(), "/r");
        assert_eq!(system_libs(&req), vec!["dl", "pthread"]);

        let android = BuildRequest::new(
            Platform::Unix {
                os: UnixOs::Android,
                fpic: true,
            },
            gcc(),
            "/r",
        );
        assert!(system_libs(&android).is_empty());
    }

    #[test]
    fn test_write_package_info() {
        let tmp = tempfile::TempDir::new().unwrap();
        let req = BuildRequest::new(Platform::Windows, msvc(), "/r").with_shared(true);
        let info = PackageInfo::for_request(&req, &Recipe::default());
        assert_eq!(info.bin_dirs, vec!["bin"]);

        info.write(tmp.path()).unwrap();
        let text = std::fs::read_to_string(tmp.path().join(PACKAGE_INFO_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["name"], "libx264");
        assert_eq!(value["version"], "20171211");
        assert_eq!(value["libs"][0], "libx264.dll.lib");
    }
}
