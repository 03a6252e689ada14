//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use x264_recipe::core::settings::{BitDepth, BuildType, HostOs, MsvcRuntime};
use x264_recipe::ops::RequestOptions;
use x264_recipe::util::shell::{ColorChoice, Shell};

/// Build and package the x264 video encoder library
#[derive(Parser)]
#[command(name = "x264-recipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output format for status messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// Recipe working directory (defaults to the current directory)
    #[arg(long, global = true, env = "X264_RECIPE_DIR")]
    pub recipe_dir: Option<PathBuf>,

    /// Where to stage the package (defaults to <recipe dir>/package)
    #[arg(long, global = true)]
    pub package_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn shell(&self) -> Shell {
        Shell::from_flags(
            self.quiet,
            self.verbose,
            self.color,
            self.message_format == MessageFormat::Json,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the configure arguments and environment for a configuration
    Plan(PlanArgs),

    /// Download and extract the x264 snapshot
    Source(SourceArgs),

    /// Configure, compile and install x264
    Build(BuildArgs),

    /// Stage license, headers and libraries into the package folder
    Package(PackageArgs),

    /// Show what consumers link against
    Info(InfoArgs),

    /// Run source, build and package in one go
    Create(CreateArgs),

    /// Check that the build tools are available
    Doctor(DoctorArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Target settings shared by every command that resolves a plan.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Target operating system (Windows, Linux, Android, Macos, ...)
    #[arg(long)]
    pub os: Option<String>,

    /// Compiler (msvc, gcc, clang, ...)
    #[arg(long)]
    pub compiler: Option<String>,

    /// Compiler version
    #[arg(long)]
    pub compiler_version: Option<String>,

    /// MSVC runtime (MD, MT, MDd, MTd)
    #[arg(long)]
    pub runtime: Option<MsvcRuntime>,

    /// Target architecture
    #[arg(long)]
    pub arch: Option<String>,

    /// Build type (debug or release)
    #[arg(long)]
    pub build_type: Option<BuildType>,

    /// Build a shared library
    #[arg(long, overrides_with = "static_lib")]
    pub shared: bool,

    /// Build a static library
    #[arg(long = "static", overrides_with = "shared")]
    pub static_lib: bool,

    /// Build position-independent code (static Unix builds)
    #[arg(long, overrides_with = "no_fpic")]
    pub fpic: bool,

    #[arg(long, overrides_with = "fpic")]
    pub no_fpic: bool,

    /// Output bit depth (8 or 10)
    #[arg(long)]
    pub bit_depth: Option<BitDepth>,

    /// Pretend to run on this host (windows or unix)
    #[arg(long, value_parser = parse_host)]
    pub host: Option<HostOs>,
}

fn parse_host(s: &str) -> Result<HostOs, String> {
    match s.to_ascii_lowercase().as_str() {
        "windows" | "win" => Ok(HostOs::Windows),
        "unix" | "linux" | "macos" => Ok(HostOs::Unix),
        _ => Err(format!("invalid host '{}'; expected 'windows' or 'unix'", s)),
    }
}

fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl SettingsArgs {
    pub fn to_options(&self) -> RequestOptions {
        RequestOptions {
            os: self.os.clone(),
            arch: self.arch.clone(),
            compiler: self.compiler.clone(),
            compiler_version: self.compiler_version.clone(),
            runtime: self.runtime,
            build_type: self.build_type,
            shared: flag_pair(self.shared, self.static_lib),
            fpic: flag_pair(self.fpic, self.no_fpic),
            bit_depth: self.bit_depth,
            host: self.host,
        }
    }
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SourceArgs {
    /// Re-download even if sources are present
    #[arg(short, long)]
    pub force: bool,

    /// Do not use the download cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct PackageArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Re-download even if sources are present
    #[arg(short, long)]
    pub force: bool,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct DoctorArgs {
    /// Check for this host instead of the running one (windows or unix)
    #[arg(long, value_parser = parse_host)]
    pub host: Option<HostOs>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
