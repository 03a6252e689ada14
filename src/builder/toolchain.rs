//! Compiler detection.
//!
//! Detection priority:
//! 1. The `CC` environment variable
//! 2. On Windows hosts: `cl` on PATH
//! 3. `cc`, `gcc`, `clang` on PATH
//!
//! Detection only ever fills in defaults. Explicit settings from the CLI or
//! config files always win.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::core::settings::HostOs;
use crate::util::process::{find_executable, ProcessBuilder};

/// First `X.Y[.Z]` in tool output.
pub(crate) static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version regex"));

/// A compiler found on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCompiler {
    pub path: PathBuf,
    /// Family name as accepted by `Compiler::from_parts`
    pub family: String,
    /// Major version, the granularity recipes key on
    pub version: String,
}

/// Work out compiler family and major version from `--version` style output.
pub fn identify_compiler(output: &str) -> Option<(String, String)> {
    let lower = output.to_ascii_lowercase();

    let family = if lower.contains("microsoft") && lower.contains("c/c++") {
        "msvc"
    } else if lower.contains("clang") {
        "clang"
    } else if lower.contains("gcc") || lower.contains("free software foundation") {
        "gcc"
    } else {
        return None;
    };

    let version = VERSION_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    Some((family.to_string(), version))
}

/// Query a compiler binary for its identity.
pub fn probe_compiler(path: &Path) -> Option<DetectedCompiler> {
    let is_cl = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("cl"))
        .unwrap_or(false);

    // cl prints its banner to stderr and has no --version flag
    let cmd = if is_cl {
        ProcessBuilder::new(path)
    } else {
        ProcessBuilder::new(path).arg("--version")
    };

    let output = cmd.exec().ok()?;
    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let (family, version) = identify_compiler(&text)?;
    Some(DetectedCompiler {
        path: path.to_path_buf(),
        family,
        version,
    })
}

/// Detect the default compiler for builds on `host`.
pub fn detect_compiler(host: HostOs) -> Option<DetectedCompiler> {
    if let Ok(cc) = std::env::var("CC") {
        if let Some(found) = find_executable(&cc).and_then(|p| probe_compiler(&p)) {
            return Some(found);
        }
        tracing::warn!("CC={} could not be identified, falling back to PATH search", cc);
    }

    let candidates: &[&str] = match host {
        HostOs::Windows => &["cl", "gcc", "clang"],
        HostOs::Unix => &["cc", "gcc", "clang"],
    };

    candidates
        .iter()
        .filter_map(|name| find_executable(name))
        .find_map(|path| probe_compiler(&path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_gcc() {
        let out = "gcc (Ubuntu 9.4.0-1ubuntu1~20.04.1) 9.4.0\nCopyright (C) 2019 Free Software Foundation, Inc.";
        assert_eq!(
            identify_compiler(out),
            Some(("gcc".to_string(), "9".to_string()))
        );

        let cc = "cc (GCC) 13.2.1 20230801";
        assert_eq!(identify_compiler(cc).unwrap().0, "gcc");
    }

    #[test]
    fn test_identify_clang() {
        let out = "Apple clang version 15.0.0 (clang-1500.1.0.2.5)\nTarget: arm64-apple-darwin23.1.0";
        assert_eq!(
            identify_compiler(out),
            Some(("clang".to_string(), "15".to_string()))
        );
    }

    #[test]
    fn test_identify_msvc() {
        let out = "Microsoft (R) C/C++ Optimizing Compiler Version 19.16.27045 for x64";
        assert_eq!(
            identify_compiler(out),
            Some(("msvc".to_string(), "19".to_string()))
        );
    }

    #[test]
    fn test_identify_unknown() {
        assert_eq!(identify_compiler("tcc version 0.9.27"), None);
    }
}
