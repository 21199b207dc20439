//! Project composition and build-recipe synthesis for vcmake.
//!
//! This crate provides:
//! - Project configuration format (`vcmake.toml`) and loading
//! - Composition of related projects into one link-ready descriptor
//! - Makefile rendering and per-file dependency generation
//! - compile_commands.json generation
//!
//! # Example
//!
//! ```toml
//! # vcmake.toml
//! [project]
//! tag = "app"
//! executable = "bin/app"
//! sources = ["main.cpp", "util/strings.cpp"]
//! include_dirs = ["include"]
//! related = ["../core"]
//!
//! [toolchain]
//! compiler = "gcc"
//! extra_cxx_flags = ["-O2"]
//! ```

mod compile_commands;
mod compose;
mod config;
mod depgen;
mod error;
mod project;
mod recipe;
mod toolchain;

#[cfg(test)]
mod test_support;

pub use compile_commands::{CompileCommand, CompileCommands};
pub use compose::ProjectComposer;
pub use config::{
    discover_sources, ProjectFile, ProjectLoader, ProjectSection, ToolchainSection,
    TomlProjectLoader, CONFIG_FILE,
};
pub use depgen::{DependencyCompiler, DependencyOutput};
pub use error::{BuildError, Result};
pub use project::{link_name, shared_library_name, ProjectDescriptor, RelatedLink, Target};
pub use recipe::RecipeEmitter;
pub use toolchain::{
    Platform, ProcessRunner, ToolOutput, ToolRunner, Toolchain, ToolchainDefaults, ToolchainKind,
    ToolchainSelection,
};
