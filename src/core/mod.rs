//! Core data types: build settings and recipe metadata.

pub mod recipe;
pub mod settings;

pub use recipe::Recipe;
pub use settings::{
    BitDepth, BuildRequest, BuildType, Compiler, HostOs, MsvcRuntime, Platform, SettingsError,
    UnixOs,
};
