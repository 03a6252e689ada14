//! Build plan resolution.
//!
//! [`resolve`] maps a [`BuildRequest`] to a [`ResolvedPlan`]: the arguments for
//! x264's `configure`, the environment overrides for every build step, and
//! whether the steps need a POSIX shell layer or may skip `make install`.
//! The mapping is pure. Nothing here touches the process environment or the
//! filesystem.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::core::settings::{BuildRequest, BuildType, Platform, UnixOs};

/// Cross-compilation host passed to `configure` for Android targets.
pub const ANDROID_HOST_FLAG: &str = "--host=arm-linux-androideabi";

/// Driver name `configure` is pointed at for MSVC builds.
pub const MSVC_DRIVER: &str = "cl";

/// Serialize PDB writes so parallel `cl` invocations don't collide on vc*.pdb.
pub const MSVC_PDB_FLAG: &str = "-FS";

/// How an override combines with a value already present in the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvMode {
    /// Path list placed in front of the existing value.
    PrependPath,
    /// Replaces whatever is set.
    Replace,
    /// Space-separated flags appended after the existing value.
    AppendFlags,
}

/// A list-valued environment override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvOverride {
    pub mode: EnvMode,
    pub values: Vec<String>,
}

impl EnvOverride {
    /// Compute the final variable value given what the parent process has.
    pub fn render(&self, existing: Option<&str>, path_separator: char) -> String {
        let existing = existing.filter(|v| !v.is_empty());
        match self.mode {
            EnvMode::PrependPath => {
                let sep = path_separator.to_string();
                let mut parts: Vec<&str> = self.values.iter().map(String::as_str).collect();
                if let Some(current) = existing {
                    parts.push(current);
                }
                parts.join(&sep)
            }
            EnvMode::Replace => self.values.join(" "),
            EnvMode::AppendFlags => {
                let mut parts: Vec<&str> = Vec::new();
                if let Some(current) = existing {
                    parts.push(current);
                }
                parts.extend(self.values.iter().map(String::as_str));
                parts.join(" ")
            }
        }
    }
}

/// Environment overrides keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvOverrides {
    vars: BTreeMap<String, EnvOverride>,
}

impl EnvOverrides {
    fn push(&mut self, key: &str, mode: EnvMode, values: impl IntoIterator<Item = String>) {
        let entry = self
            .vars
            .entry(key.to_string())
            .or_insert_with(|| EnvOverride {
                mode,
                values: Vec::new(),
            });
        entry.values.extend(values);
    }

    pub fn get(&self, key: &str) -> Option<&EnvOverride> {
        self.vars.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvOverride)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Render every override against a lookup into the parent environment.
    pub fn render_with<F>(&self, path_separator: char, lookup: F) -> Vec<(String, String)>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.vars
            .iter()
            .map(|(key, ov)| {
                let existing = lookup(key);
                (key.clone(), ov.render(existing.as_deref(), path_separator))
            })
            .collect()
    }

    /// Merge `other` into these overrides. Values of the same key are
    /// appended in order.
    pub fn extend(&mut self, other: EnvOverrides) {
        for (key, ov) in other.vars {
            self.push(&key, ov.mode, ov.values);
        }
    }

    /// Prepend a directory to `PATH`.
    pub fn prepend_path(&mut self, dir: impl Into<String>) {
        self.push("PATH", EnvMode::PrependPath, [dir.into()]);
    }

    /// Set a variable outright.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(
            key.to_string(),
            EnvOverride {
                mode: EnvMode::Replace,
                values: vec![value.into()],
            },
        );
    }
}

/// Everything needed to run configure/make/install for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPlan {
    configure_args: Vec<String>,
    env: EnvOverrides,
    needs_shell_emulation: bool,
    skip_install_step: bool,
}

impl ResolvedPlan {
    pub fn configure_args(&self) -> &[String] {
        &self.configure_args
    }

    pub fn env(&self) -> &EnvOverrides {
        &self.env
    }

    /// True when the autotools steps must run under bash (Cygwin/MSYS2).
    pub fn needs_shell_emulation(&self) -> bool {
        self.needs_shell_emulation
    }

    /// True only for Android targets built on a Windows host.
    pub fn skip_install_step(&self) -> bool {
        self.skip_install_step
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.configure_args.iter().any(|a| a == arg)
    }
}

/// Resolve the build plan for a request.
pub fn resolve(req: &BuildRequest) -> ResolvedPlan {
    let mut args = vec!["--disable-cli".to_string()];

    if req.shared {
        args.push("--enable-shared".to_string());
    } else {
        args.push("--enable-static".to_string());
    }

    if req.platform.fpic() == Some(true) {
        args.push("--enable-pic".to_string());
    }

    if req.build_type == BuildType::Debug {
        args.push("--enable-debug".to_string());
    }

    args.push(format!("--bit-depth={}", req.bit_depth.bits()));

    let is_android = matches!(
        req.platform,
        Platform::Unix {
            os: UnixOs::Android,
            ..
        }
    );
    if is_android {
        args.push(ANDROID_HOST_FLAG.to_string());
    }

    let needs_shell_emulation =
        req.compiler.is_msvc() || (req.is_mingw() && req.host.is_windows());

    let mut env = EnvOverrides::default();
    env.prepend_path(path_string(&req.recipe_dir));

    if let Some(runtime) = req.compiler.msvc_runtime() {
        env.set("CC", MSVC_DRIVER);
        env.push(
            "CFLAGS",
            EnvMode::AppendFlags,
            [runtime.as_flag(), MSVC_PDB_FLAG.to_string()],
        );
    }

    // Android builds driven from Windows stop after make; install is not run.
    let skip_install_step = is_android && req.host.is_windows();

    tracing::debug!(
        platform = %req.platform,
        compiler = %req.compiler,
        arch = %req.arch,
        build_type = %req.build_type,
        "resolved {} configure args",
        args.len()
    );

    ResolvedPlan {
        configure_args: args,
        env,
        needs_shell_emulation,
        skip_install_step,
    }
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{BitDepth, Compiler, HostOs, MsvcRuntime};

    fn platforms() -> Vec<Platform> {
        let mut out = vec![Platform::Windows];
        for os in [
            UnixOs::Linux,
            UnixOs::Android,
            UnixOs::Macos,
            UnixOs::Other("freebsd".into()),
        ] {
            for fpic in [false, true] {
                out.push(Platform::Unix {
                    os: os.clone(),
                    fpic,
                });
            }
        }
        out
    }

    fn compilers() -> Vec<Compiler> {
        vec![
            Compiler::Msvc {
                version: "15".into(),
                runtime: MsvcRuntime::MD,
            },
            Compiler::Msvc {
                version: "16".into(),
                runtime: MsvcRuntime::MTd,
            },
            Compiler::Gcc {
                version: "7".into(),
            },
            Compiler::Other {
                name: "clang".into(),
                version: "9".into(),
            },
        ]
    }

    /// Every combination of the enumerated settings.
    fn all_requests() -> Vec<BuildRequest> {
        let mut out = Vec::new();
        for platform in platforms() {
            for compiler in compilers() {
                for build_type in [BuildType::Debug, BuildType::Release] {
                    for shared in [false, true] {
                        for bit_depth in [BitDepth::Eight, BitDepth::Ten] {
                            for host in [HostOs::Windows, HostOs::Unix] {
                                out.push(
                                    BuildRequest::new(
                                        platform.clone(),
                                        compiler.clone(),
                                        "/work/recipe",
                                    )
                                    .with_arch("x86_64")
                                    .with_build_type(build_type)
                                    .with_shared(shared)
                                    .with_bit_depth(bit_depth)
                                    .with_host(host),
                                );
                            }
                        }
                    }
                }
            }
        }
        out
    }

    fn linux(fpic: bool) -> Platform {
        Platform::Unix {
            os: UnixOs::Linux,
            fpic,
        }
    }

    fn android() -> Platform {
        Platform::Unix {
            os: UnixOs::Android,
            fpic: true,
        }
    }

    fn gcc() -> Compiler {
        Compiler::Gcc {
            version: "7".into(),
        }
    }

    fn msvc() -> Compiler {
        Compiler::Msvc {
            version: "15".into(),
            runtime: MsvcRuntime::MT,
        }
    }

    #[test]
    fn test_exactly_one_linkage_flag() {
        for req in all_requests() {
            let plan = resolve(&req);
            let shared = plan.has_arg("--enable-shared");
            let static_ = plan.has_arg("--enable-static");
            assert!(shared ^ static_, "{:?}", req);
            assert_eq!(shared, req.shared);
        }
    }

    #[test]
    fn test_pic_only_for_unix_with_fpic() {
        for req in all_requests() {
            let plan = resolve(&req);
            let expected = matches!(req.platform, Platform::Unix { fpic: true, .. });
            assert_eq!(plan.has_arg("--enable-pic"), expected, "{:?}", req);
        }
    }

    #[test]
    fn test_cc_iff_msvc() {
        for req in all_requests() {
            let plan = resolve(&req);
            assert_eq!(plan.env().contains("CC"), req.compiler.is_msvc(), "{:?}", req);
        }
    }

    #[test]
    fn test_msvc_always_needs_shell() {
        for req in all_requests().into_iter().filter(|r| r.compiler.is_msvc()) {
            assert!(resolve(&req).needs_shell_emulation(), "{:?}", req);
        }
    }

    #[test]
    fn test_skip_install_only_android_on_windows() {
        for req in all_requests() {
            let plan = resolve(&req);
            let expected = req.platform.is_android() && req.host == HostOs::Windows;
            assert_eq!(plan.skip_install_step(), expected, "{:?}", req);
        }
    }

    #[test]
    fn test_path_always_prepended() {
        for req in all_requests() {
            let plan = resolve(&req);
            let path = plan.env().get("PATH").unwrap();
            assert_eq!(path.mode, EnvMode::PrependPath);
            assert_eq!(path.values, vec!["/work/recipe".to_string()]);
        }
    }

    #[test]
    fn test_resolve_is_deterministic() {
        for req in all_requests() {
            assert_eq!(resolve(&req), resolve(&req.clone()));
        }
    }

    #[test]
    fn test_android_shared() {
        let android_no_pic = Platform::Unix {
            os: UnixOs::Android,
            fpic: false,
        };
        let req = BuildRequest::new(android_no_pic, gcc(), "/r").with_shared(true);
        let plan = resolve(&req);
        assert!(plan.has_arg("--enable-shared"));
        assert!(plan.has_arg(ANDROID_HOST_FLAG));
        assert!(!plan.has_arg("--enable-pic"));
    }

    #[test]
    fn test_shared_keeps_pic() {
        let plan = resolve(&BuildRequest::new(linux(true), gcc(), "/r").with_shared(true));
        assert_eq!(
            plan.configure_args(),
            &["--disable-cli", "--enable-shared", "--enable-pic", "--bit-depth=8"]
        );

        let plan = resolve(&BuildRequest::new(android(), gcc(), "/r").with_shared(true));
        assert!(plan.has_arg("--enable-pic"));
    }

    #[test]
    fn test_linux_static_pic() {
        let req = BuildRequest::new(linux(true), gcc(), "/r").with_shared(false);
        let plan = resolve(&req);
        assert!(plan.has_arg("--enable-static"));
        assert!(plan.has_arg("--enable-pic"));
        assert!(!plan.env().contains("CC"));
        assert!(!plan.env().contains("CFLAGS"));
    }

    #[test]
    fn test_argument_order() {
        let req = BuildRequest::new(android(), gcc(), "/r")
            .with_build_type(BuildType::Debug)
            .with_bit_depth(BitDepth::Ten);
        let plan = resolve(&req);
        assert_eq!(
            plan.configure_args(),
            &[
                "--disable-cli",
                "--enable-static",
                "--enable-pic",
                "--enable-debug",
                "--bit-depth=10",
                ANDROID_HOST_FLAG,
            ]
        );
    }

    #[test]
    fn test_msvc_env() {
        let req = BuildRequest::new(Platform::Windows, msvc(), "C:\\recipe")
            .with_host(HostOs::Windows);
        let plan = resolve(&req);

        let cc = plan.env().get("CC").unwrap();
        assert_eq!(cc.values, vec!["cl".to_string()]);

        let cflags = plan.env().get("CFLAGS").unwrap();
        assert_eq!(cflags.mode, EnvMode::AppendFlags);
        assert_eq!(cflags.values, vec!["-MT".to_string(), "-FS".to_string()]);

        assert!(plan.needs_shell_emulation());
        assert!(!plan.skip_install_step());
    }

    #[test]
    fn test_mingw_shell_depends_on_host() {
        let req = BuildRequest::new(Platform::Windows, gcc(), "/r").with_host(HostOs::Windows);
        assert!(resolve(&req).needs_shell_emulation());

        let req = BuildRequest::new(Platform::Windows, gcc(), "/r").with_host(HostOs::Unix);
        assert!(!resolve(&req).needs_shell_emulation());

        let req = BuildRequest::new(linux(true), gcc(), "/r").with_host(HostOs::Windows);
        assert!(!resolve(&req).needs_shell_emulation());
    }

    #[test]
    fn test_env_render_modes() {
        let path = EnvOverride {
            mode: EnvMode::PrependPath,
            values: vec!["/a".into(), "/b".into()],
        };
        assert_eq!(path.render(Some("/usr/bin"), ':'), "/a:/b:/usr/bin");
        assert_eq!(path.render(None, ';'), "/a;/b");
        assert_eq!(path.render(Some(""), ':'), "/a:/b");

        let flags = EnvOverride {
            mode: EnvMode::AppendFlags,
            values: vec!["-MD".into(), "-FS".into()],
        };
        assert_eq!(flags.render(Some("-O2"), ':'), "-O2 -MD -FS");
        assert_eq!(flags.render(None, ':'), "-MD -FS");

        let cc = EnvOverride {
            mode: EnvMode::Replace,
            values: vec!["cl".into()],
        };
        assert_eq!(cc.render(Some("gcc"), ':'), "cl");
    }

    #[test]
    fn test_env_extend_keeps_order() {
        let mut base = EnvOverrides::default();
        base.prepend_path("/recipe");

        let mut extra = EnvOverrides::default();
        extra.prepend_path("/cygwin/bin");
        extra.set("RECIPE_BASH_PATH", "/cygwin/bin/bash.exe");

        base.extend(extra);
        assert_eq!(
            base.get("PATH").unwrap().values,
            vec!["/recipe".to_string(), "/cygwin/bin".to_string()]
        );
        assert_eq!(base.len(), 2);

        let rendered = base.render_with(':', |k| (k == "PATH").then(|| "/usr/bin".to_string()));
        assert!(rendered.contains(&("PATH".to_string(), "/recipe:/cygwin/bin:/usr/bin".to_string())));
    }

    #[test]
    fn test_plan_serializes() {
        let req = BuildRequest::new(linux(true), gcc(), "/r");
        let json = serde_json::to_value(resolve(&req)).unwrap();
        assert_eq!(json["needs_shell_emulation"], false);
        assert_eq!(json["configure_args"][0], "--disable-cli");
        assert_eq!(json["env"]["PATH"]["mode"], "prepend_path");
    }
}
