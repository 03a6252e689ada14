//! Assemble a [`BuildRequest`] from CLI values, configuration and host detection.
//!
//! Precedence for every field: explicit value > config file > detection/default.

use anyhow::{Context, Result};

use crate::builder::toolchain::detect_compiler;
use crate::core::settings::{
    BitDepth, BuildRequest, BuildType, Compiler, HostOs, MsvcRuntime, Platform,
};
use crate::util::RecipeContext;

/// Settings given explicitly for one invocation. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub os: Option<String>,
    pub arch: Option<String>,
    pub compiler: Option<String>,
    pub compiler_version: Option<String>,
    pub runtime: Option<MsvcRuntime>,
    pub build_type: Option<BuildType>,
    pub shared: Option<bool>,
    pub fpic: Option<bool>,
    pub bit_depth: Option<BitDepth>,
    pub host: Option<HostOs>,
}

/// Host OS name in the form `Platform::from_os_name` accepts.
fn host_os_name() -> &'static str {
    std::env::consts::OS
}

/// Build the request for this invocation.
pub fn build_request(ctx: &RecipeContext, opts: &RequestOptions) -> Result<BuildRequest> {
    let cfg = ctx.config();
    let host = opts.host.unwrap_or_else(HostOs::current);

    let build_type = opts
        .build_type
        .or(cfg.build.build_type)
        .unwrap_or_default();

    let os = opts
        .os
        .clone()
        .or_else(|| cfg.settings.os.clone())
        .unwrap_or_else(|| host_os_name().to_string());

    let fpic = opts.fpic.or(cfg.options.fpic).unwrap_or(true);
    let platform = Platform::from_os_name(&os, fpic).context("invalid target OS")?;

    let runtime = opts.runtime.or(cfg.settings.runtime);
    let explicit_name = opts.compiler.clone().or_else(|| cfg.settings.compiler.clone());
    let explicit_version = opts
        .compiler_version
        .clone()
        .or_else(|| cfg.settings.compiler_version.clone());

    let compiler = match explicit_name {
        Some(name) => Compiler::from_parts(
            &name,
            explicit_version.as_deref().unwrap_or(""),
            runtime,
            build_type,
        )?,
        None => match detect_compiler(host) {
            Some(found) => {
                tracing::debug!("Detected {} {} at {}", found.family, found.version, found.path.display());
                Compiler::from_parts(
                    &found.family,
                    explicit_version.as_deref().unwrap_or(&found.version),
                    runtime,
                    build_type,
                )?
            }
            None => {
                let fallback = if platform.is_windows() && host.is_windows() {
                    "msvc"
                } else {
                    "gcc"
                };
                tracing::warn!("No C compiler detected, assuming {}", fallback);
                Compiler::from_parts(
                    fallback,
                    explicit_version.as_deref().unwrap_or(""),
                    runtime,
                    build_type,
                )?
            }
        },
    };

    let arch = opts
        .arch
        .clone()
        .or_else(|| cfg.settings.arch.clone())
        .unwrap_or_else(|| std::env::consts::ARCH.to_string());

    let request = BuildRequest::new(platform, compiler, ctx.recipe_dir())
        .with_arch(arch)
        .with_build_type(build_type)
        .with_shared(opts.shared.or(cfg.options.shared).unwrap_or(false))
        .with_bit_depth(opts.bit_depth.or(cfg.options.bit_depth).unwrap_or_default())
        .with_host(host);

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::UnixOs;
    use crate::util::Config;
    use tempfile::TempDir;

    fn ctx_with(config: Config) -> (TempDir, RecipeContext) {
        let tmp = TempDir::new().unwrap();
        let ctx = RecipeContext::with_recipe_dir(tmp.path().to_path_buf())
            .unwrap()
            .with_config(config);
        (tmp, ctx)
    }

    #[test]
    fn test_explicit_options_win() {
        let mut config = Config::default();
        config.options.shared = Some(true);
        config.options.bit_depth = Some(BitDepth::Ten);
        let (_tmp, ctx) = ctx_with(config);

        let opts = RequestOptions {
            os: Some("Android".into()),
            arch: Some("armv7".into()),
            compiler: Some("clang".into()),
            compiler_version: Some("8".into()),
            shared: Some(false),
            host: Some(HostOs::Unix),
            ..RequestOptions::default()
        };
        let req = build_request(&ctx, &opts).unwrap();

        assert_eq!(
            req.platform,
            Platform::Unix {
                os: UnixOs::Android,
                fpic: true
            }
        );
        assert_eq!(req.arch, "armv7");
        assert_eq!(req.compiler.name(), "clang");
        assert!(!req.shared);
        assert_eq!(req.bit_depth, BitDepth::Ten);
        assert_eq!(req.recipe_dir, ctx.recipe_dir());
    }

    #[test]
    fn test_config_settings_used() {
        let mut config = Config::default();
        config.settings.os = Some("Windows".into());
        config.settings.compiler = Some("msvc".into());
        config.settings.compiler_version = Some("15".into());
        config.build.build_type = Some(BuildType::Debug);
        let (_tmp, ctx) = ctx_with(config);

        let req = build_request(&ctx, &RequestOptions::default()).unwrap();
        assert!(req.platform.is_windows());
        assert_eq!(req.compiler.msvc_runtime(), Some(MsvcRuntime::MDd));
        assert_eq!(req.compiler.version(), "15");
        assert_eq!(req.build_type, BuildType::Debug);
    }

    #[test]
    fn test_runtime_flag_applies_to_msvc() {
        let (_tmp, ctx) = ctx_with(Config::default());
        let opts = RequestOptions {
            os: Some("windows".into()),
            compiler: Some("msvc".into()),
            runtime: Some(MsvcRuntime::MT),
            ..RequestOptions::default()
        };
        let req = build_request(&ctx, &opts).unwrap();
        assert_eq!(req.compiler.msvc_runtime(), Some(MsvcRuntime::MT));
    }

    #[test]
    fn test_empty_compiler_rejected() {
        let (_tmp, ctx) = ctx_with(Config::default());
        let opts = RequestOptions {
            os: Some("linux".into()),
            compiler: Some("  ".into()),
            ..RequestOptions::default()
        };
        assert!(build_request(&ctx, &opts).is_err());
    }
}
