//! The `package` step: stage license, headers and libraries.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::builder::plan::resolve;
use crate::core::recipe::{HEADERS, LICENSE_FILE};
use crate::core::settings::BuildRequest;
use crate::ops::package_info::PackageInfo;
use crate::util::fs::{copy_into, find_files, glob_files};
use crate::util::shell::{Shell, Status};
use crate::util::RecipeContext;

/// Files staged by the package step.
#[derive(Debug, Clone, Default)]
pub struct PackageResult {
    pub license: Option<PathBuf>,
    pub headers: Vec<PathBuf>,
    pub libraries: Vec<PathBuf>,
    pub info: Option<PackageInfo>,
}

fn is_x264_library(name: &str) -> bool {
    let lib_like = name.ends_with(".a")
        || name.ends_with(".lib")
        || name.ends_with(".dll")
        || name.ends_with(".dylib")
        || name.contains(".so");
    lib_like && (name.starts_with("libx264") || name.starts_with("x264"))
}

/// Stage the package for `req` into the context's package directory.
///
/// When `make install` did not run, headers and libraries are copied
/// straight out of the build tree instead.
pub fn package(ctx: &RecipeContext, req: &BuildRequest, shell: &Shell) -> Result<PackageResult> {
    let sources = ctx.source_dir();
    let package_dir = ctx.package_dir();
    let mut result = PackageResult::default();

    shell.status(Status::Packaging, package_dir.display());

    let license = sources.join(LICENSE_FILE);
    if license.is_file() {
        result.license = Some(copy_into(&license, &package_dir.join("licenses"))?);
    } else {
        shell.warn(format!("license file not found: {}", license.display()));
    }

    if resolve(req).skip_install_step() {
        tracing::debug!("Install was skipped, collecting artifacts from {}", sources.display());

        let include = package_dir.join("include");
        for header in glob_files(&sources, HEADERS)? {
            result.headers.push(copy_into(&header, &include)?);
        }

        let lib_dir = package_dir.join("lib");
        for lib in find_files(&sources, &[".git"], is_x264_library) {
            result.libraries.push(copy_into(&lib, &lib_dir)?);
        }

        if result.libraries.is_empty() {
            bail!(
                "no x264 library found in {}\n\
                 \n\
                 Run the `build` step before packaging.",
                sources.display()
            );
        }
    }

    let info = PackageInfo::for_request(req, &ctx.recipe());
    info.write(package_dir)?;
    result.info = Some(info);

    shell.status(Status::Packaged, format!("libx264 into {}", package_dir.display()));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{Compiler, HostOs, Platform, UnixOs};
    use crate::ops::package_info::PACKAGE_INFO_FILE;
    use crate::util::shell::ColorChoice;
    use crate::util::Config;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RecipeContext) {
        let tmp = TempDir::new().unwrap();
        let sources = tmp.path().join("sources");
        std::fs::create_dir_all(&sources).unwrap();
        std::fs::write(sources.join("COPYING"), "GPL").unwrap();
        std::fs::write(sources.join("x264.h"), "").unwrap();
        std::fs::write(sources.join("x264_config.h"), "").unwrap();
        std::fs::write(sources.join("libx264.a"), "").unwrap();
        std::fs::write(sources.join("x264.c"), "").unwrap();

        let ctx = RecipeContext::with_recipe_dir(tmp.path().to_path_buf())
            .unwrap()
            .with_config(Config::default());
        (tmp, ctx)
    }

    fn quiet() -> Shell {
        Shell::from_flags(true, false, ColorChoice::Never, false)
    }

    #[test]
    fn test_library_filter() {
        assert!(is_x264_library("libx264.a"));
        assert!(is_x264_library("libx264.so.152"));
        assert!(is_x264_library("libx264.dll.lib"));
        assert!(!is_x264_library("x264.c"));
        assert!(!is_x264_library("libfoo.a"));
    }

    #[test]
    fn test_installed_build_only_adds_license() {
        let (_tmp, ctx) = setup();
        let req = BuildRequest::new(
            Platform::Unix {
                os: UnixOs::Linux,
                fpic: true,
            },
            Compiler::Gcc {
                version: "9".into(),
            },
            ctx.recipe_dir(),
        )
        .with_host(HostOs::Unix);

        let result = package(&ctx, &req, &quiet()).unwrap();
        assert!(ctx.package_dir().join("licenses/COPYING").is_file());
        assert!(result.headers.is_empty());
        assert!(result.libraries.is_empty());
        assert!(ctx.package_dir().join(PACKAGE_INFO_FILE).is_file());
        assert_eq!(result.info.unwrap().system_libs, vec!["dl", "pthread"]);
    }

    #[test]
    fn test_skipped_install_copies_from_tree() {
        let (_tmp, ctx) = setup();
        let req = BuildRequest::new(
            Platform::Unix {
                os: UnixOs::Android,
                fpic: true,
            },
            Compiler::Other {
                name: "clang".into(),
                version: "8".into(),
            },
            ctx.recipe_dir(),
        )
        .with_host(HostOs::Windows);

        let result = package(&ctx, &req, &quiet()).unwrap();
        assert_eq!(result.headers.len(), 2);
        assert_eq!(result.libraries.len(), 1);
        assert!(ctx.package_dir().join("include/x264.h").is_file());
        assert!(ctx.package_dir().join("lib/libx264.a").is_file());
    }
}
