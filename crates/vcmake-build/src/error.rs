//! Error types for vcmake-build.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for vcmake-build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur while loading, composing or generating a project.
#[derive(Error, Diagnostic, Debug)]
pub enum BuildError {
    /// No `vcmake.toml` in the project directory.
    #[error("No vcmake.toml found in {}", .0.display())]
    #[diagnostic(code(vcmake::config::not_found))]
    ConfigNotFound(PathBuf),

    /// Failed to read configuration file.
    #[error("Failed to read config file: {0}")]
    #[diagnostic(code(vcmake::config::read))]
    ReadConfig(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    #[diagnostic(code(vcmake::config::parse))]
    ParseToml(#[from] toml::de::Error),

    /// Failed to parse or write JSON (compile_commands.json).
    #[error("Failed to process JSON: {0}")]
    #[diagnostic(code(vcmake::json))]
    ParseJson(#[from] serde_json::Error),

    /// Neither a library nor an executable target is declared.
    #[error("Project in {} declares neither a library nor an executable target", .0.display())]
    #[diagnostic(
        code(vcmake::config::no_target),
        help("set exactly one of `library` or `executable` under [project]")
    )]
    NoTarget(PathBuf),

    /// Both a library and an executable target are declared.
    #[error("Project in {} declares both a library and an executable target", .0.display())]
    #[diagnostic(
        code(vcmake::config::conflicting_targets),
        help("set exactly one of `library` or `executable` under [project]")
    )]
    ConflictingTargets(PathBuf),

    /// Tag contains something other than ASCII letters.
    #[error("Invalid project tag '{0}'")]
    #[diagnostic(
        code(vcmake::config::invalid_tag),
        help("tags may only contain ASCII letters")
    )]
    InvalidTag(String),

    /// A toolchain binary name resolved to the empty string.
    #[error("Toolchain binary `{0}` is empty")]
    #[diagnostic(code(vcmake::config::empty_toolchain), help("set CXX/LD or [toolchain] cxx/ld"))]
    EmptyToolchain(&'static str),

    /// No usable compiler was found while probing.
    #[error("No C++ compiler found on PATH (tried g++ and clang++)")]
    #[diagnostic(code(vcmake::config::toolchain_not_found), help("install a compiler or set CXX"))]
    ToolchainNotFound,

    /// Two projects in the tree share a tag, so their targets would collide.
    #[error("Tag '{tag}' is used by both {} and {}", .first.display(), .second.display())]
    #[diagnostic(code(vcmake::config::duplicate_tag))]
    DuplicateTag {
        tag: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A related project has no tag, so its targets would not be namespaced.
    #[error("Related project in {} has no tag", .0.display())]
    #[diagnostic(
        code(vcmake::config::untagged_related),
        help("every related project needs a distinct, non-empty `tag`")
    )]
    UntaggedRelatedProject(PathBuf),

    /// One or more declared source files are not readable.
    #[error("{} source file(s) not readable: {}", .0.len(), display_paths(.0))]
    #[diagnostic(code(vcmake::sources::missing))]
    MissingSources(Vec<PathBuf>),

    /// A related project could not be loaded.
    #[error("Failed to load related project in {}", .dir.display())]
    #[diagnostic(code(vcmake::related::load))]
    RelatedProjectLoad {
        dir: PathBuf,
        #[source]
        source: Box<BuildError>,
    },

    /// Related projects refer back to one another.
    #[error("Related project cycle: {}", display_chain(.0))]
    #[diagnostic(code(vcmake::related::cycle))]
    RelatedProjectCycle(Vec<PathBuf>),

    /// The toolchain binary could not be started.
    #[error("Failed to execute `{program}`: {source}")]
    #[diagnostic(code(vcmake::toolchain::spawn))]
    ToolchainSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Dependency generation exited with a failure status.
    #[error("Failed to process dependencies, code: {}\ncmd: {command}\n{stderr}", display_status(.status))]
    #[diagnostic(code(vcmake::toolchain::failed))]
    ToolchainInvocation {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

impl BuildError {
    /// Whether this error stems from an invalid project configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BuildError::NoTarget(_)
                | BuildError::ConflictingTargets(_)
                | BuildError::InvalidTag(_)
                | BuildError::EmptyToolchain(_)
                | BuildError::ToolchainNotFound
                | BuildError::DuplicateTag { .. }
                | BuildError::UntaggedRelatedProject(_)
        )
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_chain(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
