//! Build planning and execution.
//!
//! - `plan`: pure resolution of configure arguments and environment
//! - `autotools`: runs configure/make/install for a resolved plan
//! - `subsystem`: POSIX layers for Windows hosts
//! - `toolchain`: compiler detection for default settings
//! - `vcvars`: MSVC developer environment capture

pub mod autotools;
pub mod plan;
pub mod subsystem;
pub mod toolchain;
pub mod vcvars;

pub use autotools::{AutotoolsBuilder, BuildStep, StepError};
pub use plan::{resolve, EnvOverrides, ResolvedPlan};
pub use subsystem::Subsystem;
