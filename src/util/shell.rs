//! Shell output and progress management.
//!
//! All user-facing CLI output goes through [`Shell`]:
//! - Status messages with consistent formatting
//! - Progress bars for downloads (via indicatif)
//! - JSON output mode for machine-readable output
//!
//! Human and JSON output are mutually exclusive.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

use indicatif::{ProgressBar, ProgressStyle};

/// Shell output mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors and progress bars.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    #[default]
    Normal,
    /// --verbose: debug info, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success (green)
    Finished,
    Packaged,

    // In progress (cyan)
    Fetching,
    Extracting,
    Configuring,
    Building,
    Installing,
    Packaging,

    // Info (blue)
    Info,

    // Warning (yellow)
    Skipped,
    Warning,

    // Error (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Packaged => "Packaged",
            Status::Fetching => "Fetching",
            Status::Extracting => "Extracting",
            Status::Configuring => "Configuring",
            Status::Building => "Building",
            Status::Installing => "Installing",
            Status::Packaging => "Packaging",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Finished | Status::Packaged => "\x1b[1;32m",
            Status::Fetching
            | Status::Extracting
            | Status::Configuring
            | Status::Building
            | Status::Installing
            | Status::Packaging => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
}

impl Shell {
    /// Create a new shell with the given mode.
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell { mode, use_color }
    }

    /// Create a shell from CLI flags. JSON mode takes precedence over quiet/verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice, json: bool) -> Self {
        let mode = if json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };

        Shell::new(mode)
    }

    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    /// Print a status message: `{status:>12} {message}`.
    ///
    /// Quiet mode only lets errors through; JSON mode drops everything.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            return;
        }

        if self.is_quiet() && status != Status::Error {
            return;
        }

        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error, as a JSON event in JSON mode.
    pub fn error(&self, msg: impl Display) {
        if self.is_json() {
            let event = serde_json::json!({
                "reason": "error",
                "message": msg.to_string()
            });
            self.json_event(&event);
        } else {
            self.status(Status::Error, msg);
        }
    }

    /// Print a JSON event to stdout. Ignored in human mode.
    pub fn json_event(&self, event: &serde_json::Value) {
        if !self.is_json() {
            return;
        }

        let json_str = serde_json::to_string(event).unwrap_or_default();
        println!("{}", json_str);
        let _ = io::stdout().flush();
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();

        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Create a byte-based progress bar for downloads.
    ///
    /// Quiet, verbose and JSON modes get a no-op bar.
    pub fn bytes_progress(&self, msg: impl Display, total_bytes: Option<u64>) -> Progress {
        let pb = if self.is_quiet() || self.is_verbose() || self.is_json() {
            None
        } else {
            let pb = match total_bytes {
                Some(total) => {
                    let pb = ProgressBar::new(total);
                    if let Ok(style) = ProgressStyle::default_bar()
                        .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                    {
                        pb.set_style(style.progress_chars("#>-"));
                    }
                    pb
                }
                None => {
                    let pb = ProgressBar::new_spinner();
                    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} {bytes}") {
                        pb.set_style(style);
                    }
                    pb
                }
            };
            pb.set_message(msg.to_string());
            Some(pb)
        };

        Progress { pb, current: 0 }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

/// Progress bar wrapper that respects shell mode.
pub struct Progress {
    pb: Option<ProgressBar>,
    current: u64,
}

impl Progress {
    /// A progress bar that draws nothing.
    pub fn hidden() -> Self {
        Progress {
            pb: None,
            current: 0,
        }
    }

    pub fn inc(&mut self, delta: u64) {
        self.current += delta;
        if let Some(pb) = &self.pb {
            pb.inc(delta);
        }
    }

    pub fn position(&self) -> u64 {
        self.current
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_modes() {
        let shell = Shell::new(ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Never,
        });
        assert!(!shell.is_quiet());
        assert!(!shell.is_verbose());
        assert!(!shell.is_json());

        let quiet_shell = Shell::new(ShellMode::Human {
            verbosity: Verbosity::Quiet,
            color: ColorChoice::Never,
        });
        assert!(quiet_shell.is_quiet());

        assert!(Shell::new(ShellMode::Json).is_json());
    }

    #[test]
    fn test_color_choice_parse() {
        assert_eq!("auto".parse::<ColorChoice>().unwrap(), ColorChoice::Auto);
        assert_eq!("Always".parse::<ColorChoice>().unwrap(), ColorChoice::Always);
        assert_eq!("never".parse::<ColorChoice>().unwrap(), ColorChoice::Never);
        assert!("sometimes".parse::<ColorChoice>().is_err());
    }

    #[test]
    fn test_status_formatting() {
        let shell = Shell::new(ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Never,
        });

        let formatted = shell.format_status(Status::Configuring);
        assert_eq!(formatted.trim(), "Configuring");
        assert_eq!(formatted.len(), STATUS_WIDTH);
    }

    #[test]
    fn test_from_flags() {
        assert!(Shell::from_flags(true, false, ColorChoice::Auto, false).is_quiet());
        assert!(Shell::from_flags(false, true, ColorChoice::Auto, false).is_verbose());

        let shell = Shell::from_flags(true, true, ColorChoice::Auto, true);
        assert!(shell.is_json());
        assert!(!shell.is_quiet());
    }

    #[test]
    fn test_progress_counts_when_hidden() {
        let shell = Shell::from_flags(true, false, ColorChoice::Never, false);
        let mut progress = shell.bytes_progress("x264", Some(100));
        progress.inc(40);
        progress.inc(2);
        assert_eq!(progress.position(), 42);
        progress.finish();
    }
}
