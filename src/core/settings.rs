//! Build settings: target platform, compiler identity and recipe options.
//!
//! Settings are plain values. A [`BuildRequest`] is assembled once at the
//! start of a build (from CLI flags, config files and host detection) and
//! handed to the resolver explicitly.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a settings value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("unknown build type `{0}`; expected `debug` or `release`")]
    BuildType(String),

    #[error("unsupported bit depth `{0}`; expected 8 or 10")]
    BitDepth(String),

    #[error("unknown MSVC runtime `{0}`; expected one of MD, MT, MDd, MTd")]
    MsvcRuntime(String),

    #[error("empty value for `{0}`")]
    Empty(&'static str),
}

/// Operating systems of the Unix family the recipe distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnixOs {
    Linux,
    Android,
    Macos,
    /// Any other POSIX target (freebsd, ios, ...).
    Other(String),
}

impl UnixOs {
    pub fn as_str(&self) -> &str {
        match self {
            UnixOs::Linux => "linux",
            UnixOs::Android => "android",
            UnixOs::Macos => "macos",
            UnixOs::Other(name) => name,
        }
    }
}

/// Target platform.
///
/// The fPIC option only exists for Unix targets, so it is carried by the
/// `Unix` variant and cannot be read for Windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Unix { os: UnixOs, fpic: bool },
}

impl Platform {
    /// Build a platform from an OS name and the fPIC option.
    ///
    /// `fpic` is dropped for Windows targets.
    pub fn from_os_name(os: &str, fpic: bool) -> Result<Self, SettingsError> {
        let os = os.trim();
        if os.is_empty() {
            return Err(SettingsError::Empty("os"));
        }

        let platform = match os.to_ascii_lowercase().as_str() {
            "windows" | "win32" | "win64" => Platform::Windows,
            "linux" => Platform::Unix { os: UnixOs::Linux, fpic },
            "android" => Platform::Unix { os: UnixOs::Android, fpic },
            "macos" | "darwin" | "macosx" => Platform::Unix { os: UnixOs::Macos, fpic },
            other => Platform::Unix {
                os: UnixOs::Other(other.to_string()),
                fpic,
            },
        };
        Ok(platform)
    }

    /// Name of the target OS.
    pub fn os_name(&self) -> &str {
        match self {
            Platform::Windows => "windows",
            Platform::Unix { os, .. } => os.as_str(),
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    pub fn is_linux(&self) -> bool {
        matches!(self, Platform::Unix { os: UnixOs::Linux, .. })
    }

    pub fn is_android(&self) -> bool {
        matches!(self, Platform::Unix { os: UnixOs::Android, .. })
    }

    /// The fPIC option, or `None` for Windows where it does not exist.
    pub fn fpic(&self) -> Option<bool> {
        match self {
            Platform::Windows => None,
            Platform::Unix { fpic, .. } => Some(*fpic),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.os_name())
    }
}

/// The machine the recipe itself runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Windows,
    Unix,
}

impl HostOs {
    /// Detect the host this process runs on.
    pub fn current() -> Self {
        if cfg!(windows) {
            HostOs::Windows
        } else {
            HostOs::Unix
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, HostOs::Windows)
    }
}

/// MSVC C runtime variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MsvcRuntime {
    /// Dynamic CRT
    #[default]
    MD,
    /// Static CRT
    MT,
    /// Dynamic debug CRT
    MDd,
    /// Static debug CRT
    MTd,
}

impl MsvcRuntime {
    /// Default runtime for a build type.
    pub fn default_for(build_type: BuildType) -> Self {
        match build_type {
            BuildType::Debug => MsvcRuntime::MDd,
            BuildType::Release => MsvcRuntime::MD,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MsvcRuntime::MD => "MD",
            MsvcRuntime::MT => "MT",
            MsvcRuntime::MDd => "MDd",
            MsvcRuntime::MTd => "MTd",
        }
    }

    /// Compiler flag in the dash form accepted by `cl` under a POSIX shell.
    pub fn as_flag(&self) -> String {
        format!("-{}", self.as_str())
    }
}

impl FromStr for MsvcRuntime {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches(['/', '-']) {
            "MD" => Ok(MsvcRuntime::MD),
            "MT" => Ok(MsvcRuntime::MT),
            "MDd" => Ok(MsvcRuntime::MDd),
            "MTd" => Ok(MsvcRuntime::MTd),
            _ => Err(SettingsError::MsvcRuntime(s.to_string())),
        }
    }
}

/// Compiler identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Compiler {
    Msvc { version: String, runtime: MsvcRuntime },
    Gcc { version: String },
    /// clang, apple-clang, intel and anything else the recipe does not branch on.
    Other { name: String, version: String },
}

impl Compiler {
    /// Build a compiler identity from a family name.
    ///
    /// `runtime` is only kept for MSVC; when absent the default for the build
    /// type is used.
    pub fn from_parts(
        name: &str,
        version: &str,
        runtime: Option<MsvcRuntime>,
        build_type: BuildType,
    ) -> Result<Self, SettingsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SettingsError::Empty("compiler"));
        }

        let version = version.trim().to_string();
        let compiler = match name.to_ascii_lowercase().as_str() {
            "msvc" | "visual studio" | "visual-studio" | "cl" | "cl.exe" => Compiler::Msvc {
                version,
                runtime: runtime.unwrap_or_else(|| MsvcRuntime::default_for(build_type)),
            },
            "gcc" | "mingw" | "g++" => Compiler::Gcc { version },
            other => Compiler::Other {
                name: other.to_string(),
                version,
            },
        };
        Ok(compiler)
    }

    pub fn name(&self) -> &str {
        match self {
            Compiler::Msvc { .. } => "msvc",
            Compiler::Gcc { .. } => "gcc",
            Compiler::Other { name, .. } => name,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Compiler::Msvc { version, .. }
            | Compiler::Gcc { version }
            | Compiler::Other { version, .. } => version,
        }
    }

    pub fn is_msvc(&self) -> bool {
        matches!(self, Compiler::Msvc { .. })
    }

    pub fn is_gcc(&self) -> bool {
        matches!(self, Compiler::Gcc { .. })
    }

    /// The MSVC runtime, if this is MSVC.
    pub fn msvc_runtime(&self) -> Option<MsvcRuntime> {
        match self {
            Compiler::Msvc { runtime, .. } => Some(*runtime),
            _ => None,
        }
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version().is_empty() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}-{}", self.name(), self.version())
        }
    }
}

/// Build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Debug,
    #[default]
    Release,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Release => "release",
        }
    }
}

impl FromStr for BuildType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            _ => Err(SettingsError::BuildType(s.to_string())),
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sample precision the library is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitDepth {
    #[default]
    Eight,
    Ten,
}

impl BitDepth {
    pub fn bits(&self) -> u8 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Ten => 10,
        }
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = SettingsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(BitDepth::Eight),
            10 => Ok(BitDepth::Ten),
            other => Err(SettingsError::BitDepth(other.to_string())),
        }
    }
}

impl From<BitDepth> for u8 {
    fn from(depth: BitDepth) -> u8 {
        depth.bits()
    }
}

impl FromStr for BitDepth {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| SettingsError::BitDepth(s.to_string()))
            .and_then(BitDepth::try_from)
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Architecture of a request built with [`BuildRequest::new`].
pub const DEFAULT_ARCH: &str = "x86_64";

/// Everything the resolver needs to know about one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub platform: Platform,
    pub compiler: Compiler,
    /// CPU architecture. Reported, never branched on.
    pub arch: String,
    pub build_type: BuildType,
    pub shared: bool,
    pub bit_depth: BitDepth,
    /// Where the build steps execute.
    pub host: HostOs,
    /// The recipe's own working directory.
    pub recipe_dir: PathBuf,
}

impl BuildRequest {
    /// Create a request with default options (static, release, 8-bit,
    /// `x86_64` on a Unix host). Nothing is read from the running machine;
    /// `ops::request::build_request` fills in detected values.
    pub fn new(platform: Platform, compiler: Compiler, recipe_dir: impl Into<PathBuf>) -> Self {
        BuildRequest {
            platform,
            compiler,
            arch: DEFAULT_ARCH.to_string(),
            build_type: BuildType::default(),
            shared: false,
            bit_depth: BitDepth::default(),
            host: HostOs::Unix,
            recipe_dir: recipe_dir.into(),
        }
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    pub fn with_build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self
    }

    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn with_host(mut self, host: HostOs) -> Self {
        self.host = host;
        self
    }

    /// Windows target built with GCC (MinGW).
    pub fn is_mingw(&self) -> bool {
        self.platform.is_windows() && self.compiler.is_gcc()
    }
}
