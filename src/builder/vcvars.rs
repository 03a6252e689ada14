//! MSVC developer environment.
//!
//! `cl` only works with INCLUDE, LIB and the toolchain directories that
//! `vcvarsall.bat` sets up. The batch file runs once in a child `cmd`, its
//! `set` output is captured, and the result becomes [`EnvOverrides`] for the
//! build steps. The recipe process itself is left untouched.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::builder::plan::{EnvOverrides, MSVC_DRIVER};
use crate::util::process::{find_executable, ProcessBuilder};

/// Variables taken from the developer environment verbatim.
const CAPTURED_VARS: &[&str] = &[
    "INCLUDE",
    "LIB",
    "LIBPATH",
    "VCINSTALLDIR",
    "VSCMD_ARG_TGT_ARCH",
];

/// Component every usable Visual Studio install must have.
const VC_TOOLS_COMPONENT: &str = "Microsoft.VisualStudio.Component.VC.Tools.x86.x64";

/// The `vcvarsall.bat` argument for a target architecture.
pub fn vcvars_arch(arch: &str) -> Option<&'static str> {
    match arch.to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" | "x64" => Some("amd64"),
        "x86" | "i386" | "i686" => Some("x86"),
        "armv8" | "aarch64" | "arm64" => Some("arm64"),
        "armv7" | "arm" => Some("arm"),
        _ => None,
    }
}

/// Find `vswhere.exe`: the installer location first, then PATH.
pub fn find_vswhere() -> Option<PathBuf> {
    let program_files = std::env::var("ProgramFiles(x86)")
        .unwrap_or_else(|_| r"C:\Program Files (x86)".to_string());
    let standard = Path::new(&program_files)
        .join("Microsoft Visual Studio")
        .join("Installer")
        .join("vswhere.exe");
    if standard.is_file() {
        return Some(standard);
    }
    find_executable("vswhere")
}

pub fn vcvarsall_path(install_dir: &Path) -> PathBuf {
    install_dir
        .join("VC")
        .join("Auxiliary")
        .join("Build")
        .join("vcvarsall.bat")
}

/// Locate `vcvarsall.bat` of the newest Visual Studio with the C++ tools.
pub fn find_vcvarsall() -> Option<PathBuf> {
    let vswhere = find_vswhere()?;
    tracing::debug!("Found vswhere at {}", vswhere.display());

    let output = ProcessBuilder::new(&vswhere)
        .args([
            "-latest",
            "-products",
            "*",
            "-requires",
            VC_TOOLS_COMPONENT,
            "-property",
            "installationPath",
            "-format",
            "value",
        ])
        .exec()
        .ok()?;
    if !output.status.success() {
        tracing::debug!("vswhere failed: {}", String::from_utf8_lossy(&output.stderr));
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let install = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let vcvarsall = vcvarsall_path(Path::new(install));
    if vcvarsall.is_file() {
        Some(vcvarsall)
    } else {
        tracing::debug!("vcvarsall.bat not found at {}", vcvarsall.display());
        None
    }
}

/// Batch file that loads the developer environment and dumps it.
///
/// Going through a file sidesteps cmd.exe's quoting of paths with spaces.
pub fn batch_script(vcvarsall: &Path, vc_arch: &str) -> String {
    format!(
        "@echo off\r\ncall \"{}\" {} >nul 2>&1\r\nif errorlevel 1 exit /b 1\r\nset\r\n",
        vcvarsall.display(),
        vc_arch
    )
}

/// Run `vcvarsall.bat` and return the environment it leaves behind.
pub fn capture_env(vcvarsall: &Path, vc_arch: &str) -> Result<BTreeMap<String, String>> {
    let script = std::env::temp_dir()
        .join(format!("x264-recipe-vcvars-{}.bat", std::process::id()));
    std::fs::write(&script, batch_script(vcvarsall, vc_arch))
        .with_context(|| format!("failed to write {}", script.display()))?;

    let output = ProcessBuilder::new("cmd").arg("/c").arg(&script).exec();
    if let Err(err) = std::fs::remove_file(&script) {
        tracing::debug!("Could not remove {}: {}", script.display(), err);
    }
    let output = output?;

    if !output.status.success() {
        bail!(
            "`{} {}` failed with exit code {:?}",
            vcvarsall.display(),
            vc_arch,
            output.status.code()
        );
    }
    Ok(parse_set_output(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `set` output. Names are upper-cased; Windows treats them
/// case-insensitively.
pub fn parse_set_output(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_ascii_uppercase(), value.trim_end().to_string()))
        .collect()
}

fn path_key(dir: &str) -> String {
    dir.trim_end_matches(&['\\', '/'][..]).to_ascii_lowercase()
}

/// Overrides that turn `parent_path` into the captured developer
/// environment.
///
/// Only PATH entries the parent lacks are prepended, in captured order.
pub fn env_overrides(
    captured: &BTreeMap<String, String>,
    parent_path: Option<&str>,
) -> EnvOverrides {
    let mut env = EnvOverrides::default();

    if let Some(path) = captured.get("PATH") {
        let mut seen: HashSet<String> = parent_path
            .unwrap_or("")
            .split(';')
            .filter(|d| !d.is_empty())
            .map(path_key)
            .collect();
        for dir in path.split(';').filter(|d| !d.is_empty()) {
            if seen.insert(path_key(dir)) {
                env.prepend_path(dir);
            }
        }
    }

    for key in CAPTURED_VARS {
        if let Some(value) = captured.get(*key) {
            env.set(key, value.clone());
        }
    }
    env
}

/// The developer environment for building with MSVC for `arch`.
///
/// Empty when `cl` is already on PATH, as in a developer prompt.
pub fn developer_env(arch: &str) -> Result<EnvOverrides> {
    if let Some(cl) = find_executable(MSVC_DRIVER) {
        tracing::debug!("Using developer environment around {}", cl.display());
        return Ok(EnvOverrides::default());
    }

    let Some(vc_arch) = vcvars_arch(arch) else {
        bail!("no vcvarsall.bat target for architecture `{}`", arch);
    };
    let Some(vcvarsall) = find_vcvarsall() else {
        bail!(
            "Visual Studio C++ tools not found\n\
             \n\
             `cl` is not on PATH and vswhere found no install with {}.\n\
             Install the C++ workload or run from a Developer Command Prompt.",
            VC_TOOLS_COMPONENT
        );
    };

    tracing::info!("Loading MSVC environment from {} ({})", vcvarsall.display(), vc_arch);
    let captured = capture_env(&vcvarsall, vc_arch)?;
    if captured.get("PATH").map_or(true, |p| p.is_empty()) {
        bail!("{} produced an empty PATH", vcvarsall.display());
    }
    let parent_path = std::env::var("PATH").ok();
    Ok(env_overrides(&captured, parent_path.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::plan::EnvMode;

    const SET_OUTPUT: &str = "\
ALLUSERSPROFILE=C:\\ProgramData\r
INCLUDE=C:\\VS\\VC\\include;C:\\Kits\\10\\include\\ucrt\r
Lib=C:\\VS\\VC\\lib\\x64;C:\\Kits\\10\\lib\\ucrt\\x64\r
LIBPATH=C:\\VS\\VC\\lib\\x64\r
Path=C:\\VS\\VC\\bin\\Hostx64\\x64;C:\\Kits\\10\\bin\\x64;C:\\Windows\\system32;C:\\cygwin64\\bin\r
VSCMD_ARG_TGT_ARCH=x64\r
PROMPT=$P$G\r
";

    #[test]
    fn test_parse_set_output() {
        let vars = parse_set_output(SET_OUTPUT);
        assert_eq!(vars["LIB"], "C:\\VS\\VC\\lib\\x64;C:\\Kits\\10\\lib\\ucrt\\x64");
        assert_eq!(vars["PROMPT"], "$P$G");
        assert!(vars["PATH"].starts_with("C:\\VS\\VC\\bin\\Hostx64\\x64;"));
        assert!(parse_set_output("no equals sign\n=C:=C:\\\n").is_empty());
    }

    #[test]
    fn test_env_overrides_prepends_only_new_dirs() {
        let vars = parse_set_output(SET_OUTPUT);
        let env = env_overrides(&vars, Some("C:\\WINDOWS\\system32\\;C:\\cygwin64\\bin"));

        let path = env.get("PATH").unwrap();
        assert_eq!(path.mode, EnvMode::PrependPath);
        assert_eq!(
            path.values,
            vec!["C:\\VS\\VC\\bin\\Hostx64\\x64", "C:\\Kits\\10\\bin\\x64"]
        );

        assert_eq!(env.get("LIB").unwrap().mode, EnvMode::Replace);
        assert_eq!(env.get("VSCMD_ARG_TGT_ARCH").unwrap().values, vec!["x64"]);
        assert!(env.contains("INCLUDE"));
        assert!(env.contains("LIBPATH"));
        assert!(!env.contains("PROMPT"));
        assert!(!env.contains("ALLUSERSPROFILE"));
    }

    #[test]
    fn test_env_overrides_rendered_over_parent() {
        let vars = parse_set_output(SET_OUTPUT);
        let parent = "C:\\Windows\\system32";
        let env = env_overrides(&vars, Some(parent));
        let rendered: BTreeMap<String, String> = env
            .render_with(';', |key| (key == "PATH").then(|| parent.to_string()))
            .into_iter()
            .collect();
        assert_eq!(
            rendered["PATH"],
            "C:\\VS\\VC\\bin\\Hostx64\\x64;C:\\Kits\\10\\bin\\x64;C:\\cygwin64\\bin;C:\\Windows\\system32"
        );
        assert_eq!(rendered["LIBPATH"], "C:\\VS\\VC\\lib\\x64");
    }

    #[test]
    fn test_vcvars_arch() {
        assert_eq!(vcvars_arch("x86_64"), Some("amd64"));
        assert_eq!(vcvars_arch("x86"), Some("x86"));
        assert_eq!(vcvars_arch("armv8"), Some("arm64"));
        assert_eq!(vcvars_arch("mips"), None);
    }

    #[test]
    fn test_batch_script_calls_vcvarsall() {
        let vcvarsall = vcvarsall_path(Path::new("C:\\Program Files\\VS"));
        let tail = Path::new("VC").join("Auxiliary").join("Build").join("vcvarsall.bat");
        assert!(vcvarsall.ends_with(tail));
        let script = batch_script(&vcvarsall, "amd64");
        assert!(script.starts_with("@echo off\r\n"));
        assert!(script.contains("\" amd64 >nul 2>&1\r\n"));
        assert!(script.ends_with("set\r\n"));
    }
}
