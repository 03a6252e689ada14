//! Environment checks for building x264.
//!
//! The `doctor` command verifies the tools the build step shells out to:
//!
//! - a C compiler
//! - GNU make
//! - nasm, at least the version x264's assembly needs (x86 targets only)
//! - bash, on Windows hosts where configure runs under Cygwin/MSYS2
//! - `cl` or a `vcvarsall.bat` to load it, for MSVC builds

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use semver::Version;

use crate::builder::subsystem::locate_bash;
use crate::builder::plan::MSVC_DRIVER;
use crate::builder::toolchain::{detect_compiler, VERSION_RE};
use crate::builder::vcvars::find_vcvarsall;
use crate::core::recipe::NASM_MIN_VERSION;
use crate::core::settings::{BuildType, Compiler, HostOs};
use crate::util::process::{find_executable, find_make, find_nasm, ProcessBuilder};
use crate::util::RecipeContext;

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    /// Human-readable status message
    pub message: String,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
    pub duration: Duration,
    /// Whether a failure blocks the build
    pub required: bool,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            version: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            passed: false,
            ..CheckResult::pass(name, message)
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
    pub total_duration: Duration,
    pub environment: BTreeMap<String, String>,
}

impl DoctorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    pub fn required_failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .count()
    }
}

/// Options for the doctor command.
#[derive(Debug, Clone, Default)]
pub struct DoctorOptions {
    pub verbose: bool,
    /// Host to check for; defaults to the running one
    pub host: Option<HostOs>,
}

/// Run every check.
pub fn doctor(ctx: &RecipeContext, options: &DoctorOptions) -> Result<DoctorReport> {
    let start = Instant::now();
    let mut report = DoctorReport::new();
    let host = options.host.unwrap_or_else(HostOs::current);

    report
        .environment
        .insert("os".to_string(), std::env::consts::OS.to_string());
    report
        .environment
        .insert("arch".to_string(), std::env::consts::ARCH.to_string());
    report.environment.insert(
        "recipe_dir".to_string(),
        ctx.recipe_dir().display().to_string(),
    );

    report.add(check_compiler(host));
    report.add(check_make());
    report.add(check_nasm());
    if host.is_windows() {
        report.add(check_bash(ctx));
    }
    if wants_msvc(host, ctx.config().settings.compiler.as_deref()) {
        report.add(check_msvc());
    }

    report.total_duration = start.elapsed();
    Ok(report)
}

fn check_compiler(host: HostOs) -> CheckResult {
    let start = Instant::now();
    match detect_compiler(host) {
        Some(found) => CheckResult::pass("C Compiler", format!("Found {}", found.family))
            .with_path(found.path)
            .with_version(found.version)
            .with_duration(start.elapsed()),
        None => CheckResult::fail("C Compiler", "No C compiler found (tried CC, cc, gcc, clang)")
            .with_duration(start.elapsed()),
    }
}

fn check_make() -> CheckResult {
    let start = Instant::now();
    let Some(path) = find_make() else {
        return CheckResult::fail("Make", "GNU make not found (tried make, gmake, mingw32-make)")
            .with_duration(start.elapsed());
    };

    let version = first_line_of(ProcessBuilder::new(&path).arg("--version"));
    let mut check = CheckResult::pass("Make", "make is available").with_path(path);
    if let Some(version) = version {
        check = check.with_version(version);
    }
    check.with_duration(start.elapsed())
}

/// nasm is only needed for x86 assembly, so a missing one is not fatal.
fn check_nasm() -> CheckResult {
    let start = Instant::now();
    let Some(path) = find_nasm() else {
        return CheckResult::fail(
            "nasm",
            format!("nasm not found (x86 builds need >= {})", NASM_MIN_VERSION),
        )
        .optional()
        .with_duration(start.elapsed());
    };

    let line = first_line_of(ProcessBuilder::new(&path).arg("-v")).unwrap_or_default();
    let check = match parse_tool_version(&line) {
        Some(version) if nasm_is_recent(&version) => {
            CheckResult::pass("nasm", format!("nasm {} is available", version))
        }
        Some(version) => CheckResult::fail(
            "nasm",
            format!("nasm {} is too old, need >= {}", version, NASM_MIN_VERSION),
        ),
        None => CheckResult::fail("nasm", "could not determine nasm version"),
    };

    check
        .optional()
        .with_path(path)
        .with_version(line)
        .with_duration(start.elapsed())
}

fn check_bash(ctx: &RecipeContext) -> CheckResult {
    let start = Instant::now();
    let cygwin_bin = ctx.config().build.cygwin_bin.as_deref();
    match locate_bash(cygwin_bin) {
        Some(path) => CheckResult::pass("bash", "POSIX shell for configure is available")
            .with_path(path)
            .with_duration(start.elapsed()),
        None => CheckResult::fail(
            "bash",
            "bash not found; install Cygwin or MSYS2 and set build.cygwin_bin",
        )
        .with_duration(start.elapsed()),
    }
}

/// MSVC is the default compiler on a Windows host unless another is configured.
fn wants_msvc(host: HostOs, configured: Option<&str>) -> bool {
    if !host.is_windows() {
        return false;
    }
    match configured {
        None => true,
        Some(name) => Compiler::from_parts(name, "", None, BuildType::Release)
            .map(|c| c.is_msvc())
            .unwrap_or(false),
    }
}

fn check_msvc() -> CheckResult {
    let start = Instant::now();
    if let Some(cl) = find_executable(MSVC_DRIVER) {
        return CheckResult::pass("MSVC", "cl is on PATH")
            .with_path(cl)
            .with_duration(start.elapsed());
    }
    match find_vcvarsall() {
        Some(vcvarsall) => {
            CheckResult::pass("MSVC", "cl environment loads from vcvarsall.bat")
                .with_path(vcvarsall)
                .with_duration(start.elapsed())
        }
        None => CheckResult::fail(
            "MSVC",
            "cl not on PATH and no Visual Studio C++ tools found by vswhere",
        )
        .with_duration(start.elapsed()),
    }
}

fn first_line_of(cmd: ProcessBuilder) -> Option<String> {
    let output = cmd.exec().ok()?;
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        String::from_utf8_lossy(&output.stdout).into_owned()
    };
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Parse the first `X.Y[.Z]` in tool output. Zero-padded parts such as
/// nasm's `2.13.02` are accepted.
pub fn parse_tool_version(text: &str) -> Option<Version> {
    let caps = VERSION_RE.captures(text)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

pub fn nasm_is_recent(version: &Version) -> bool {
    match Version::parse(NASM_MIN_VERSION) {
        Ok(min) => *version >= min,
        Err(_) => false,
    }
}

/// Format the report for display.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    let mut output = String::new();

    output.push_str("x264 recipe doctor\n");
    output.push_str("==================\n\n");

    if verbose {
        output.push_str("Environment:\n");
        for (key, value) in &report.environment {
            output.push_str(&format!("  {}: {}\n", key, value));
        }
        output.push('\n');
    }

    output.push_str("Checks:\n");
    for check in &report.checks {
        let status = if check.passed { "[OK]" } else { "[!!]" };
        let required = if check.required { "" } else { " (optional)" };
        output.push_str(&format!("  {} {}{}\n", status, check.name, required));

        if verbose || !check.passed {
            output.push_str(&format!("      {}\n", check.message));
        }
        if verbose {
            if let Some(path) = &check.path {
                output.push_str(&format!("      Path: {}\n", path.display()));
            }
            if let Some(version) = &check.version {
                output.push_str(&format!("      Version: {}\n", version));
            }
        }
    }
    output.push('\n');

    let failed = report.failed_count();
    let required_failed = report.required_failed_count();
    output.push_str(&format!(
        "Summary: {} passed, {} failed\n",
        report.passed_count(),
        failed
    ));

    if required_failed > 0 {
        output.push_str(&format!(
            "\nWarning: {} required check(s) failed. The build step will not work.\n",
            required_failed
        ));
    } else if failed > 0 {
        output.push_str(&format!(
            "\nAll required checks passed. {} optional check(s) failed.\n",
            failed
        ));
    } else {
        output.push_str("\nAll checks passed. Ready to build x264.\n");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_fail_is_required() {
        let result = CheckResult::fail("test", "missing");
        assert!(!result.passed);
        assert!(result.required);
        assert!(!result.clone().optional().required);
    }

    #[test]
    fn test_report_optional_failure() {
        let mut report = DoctorReport::new();
        report.add(CheckResult::pass("make", "ok"));
        report.add(CheckResult::fail("nasm", "missing").optional());

        assert!(report.all_required_passed());
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.required_failed_count(), 0);

        let text = format_report(&report, false);
        assert!(text.contains("[!!] nasm (optional)"));
        assert!(text.contains("1 optional check(s) failed"));
    }

    #[test]
    fn test_report_required_failure() {
        let mut report = DoctorReport::new();
        report.add(CheckResult::fail("Make", "missing"));
        assert!(!report.all_required_passed());
        assert!(format_report(&report, true).contains("required check(s) failed"));
    }

    #[test]
    fn test_msvc_checked_for_windows_msvc_builds() {
        assert!(wants_msvc(HostOs::Windows, None));
        assert!(wants_msvc(HostOs::Windows, Some("Visual Studio")));
        assert!(!wants_msvc(HostOs::Windows, Some("gcc")));
        assert!(!wants_msvc(HostOs::Unix, Some("msvc")));
    }

    #[test]
    fn test_parse_nasm_versions() {
        let v = parse_tool_version("NASM version 2.13.02 compiled on Dec 10 2017").unwrap();
        assert_eq!(v, Version::new(2, 13, 2));
        assert!(nasm_is_recent(&v));

        let old = parse_tool_version("NASM version 2.11.08").unwrap();
        assert!(!nasm_is_recent(&old));

        let short = parse_tool_version("NASM version 2.15").unwrap();
        assert_eq!(short, Version::new(2, 15, 0));
        assert!(nasm_is_recent(&short));

        assert!(parse_tool_version("no digits here").is_none());
    }
}
