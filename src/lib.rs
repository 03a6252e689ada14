//! x264-recipe - builds and packages the x264 video encoder library
//!
//! The heart of the crate is [`builder::plan::resolve`], which maps a
//! [`BuildRequest`] (target OS, compiler, architecture, build type and
//! options) to the configure arguments, environment overrides and
//! shell-emulation decision for x264's autotools build. The `ops` module
//! wires that into the source/build/package lifecycle.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

pub use builder::plan::{resolve, ResolvedPlan};
pub use core::{
    recipe::Recipe,
    settings::{BitDepth, BuildRequest, BuildType, Compiler, HostOs, MsvcRuntime, Platform},
};
pub use util::context::RecipeContext;
