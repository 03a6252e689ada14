//! High-level operations.
//!
//! Each recipe lifecycle step lives in its own module; the CLI commands
//! are thin wrappers over these.

pub mod doctor;
pub mod package_info;
pub mod recipe_build;
pub mod recipe_package;
pub mod recipe_source;
pub mod request;

pub use doctor::{doctor, format_report, DoctorOptions, DoctorReport};
pub use package_info::PackageInfo;
pub use recipe_build::{build, BuildOptions, BuildResult};
pub use recipe_package::{package, PackageResult};
pub use recipe_source::{source, SourceOptions};
pub use request::{build_request, RequestOptions};
