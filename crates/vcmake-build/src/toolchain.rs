//! Toolchain selection and external command execution.
//!
//! The toolchain is a closed set of variants chosen once when a project is
//! loaded. Every compiler invocation goes through a [`ToolRunner`] so the
//! generator can be driven by a scripted toolchain in tests.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{BuildError, Result};

/// Which toolchain family a project asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolchainKind {
    /// Probe the environment.
    #[default]
    Auto,
    Gcc,
    Clang,
}

/// Host platform, for the handful of clang quirks that depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Other,
}

impl Platform {
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }
}

/// Resolved compiler and linker binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
    Gcc {
        cxx: String,
        ld: String,
    },
    Clang {
        cxx: String,
        ld: String,
        platform: Platform,
    },
}

/// Explicit binary choices layered over the toolchain defaults.
///
/// Populated from `[toolchain]` and from the `CXX`/`LD` environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainSelection {
    /// `None` when not given at this layer.
    pub kind: Option<ToolchainKind>,
    pub cxx: Option<String>,
    pub ld: Option<String>,
}

impl ToolchainSelection {
    /// Fill unset values from `other`, keeping values already present.
    pub fn or(mut self, other: &ToolchainSelection) -> Self {
        if self.cxx.is_none() {
            self.cxx = other.cxx.clone();
        }
        if self.ld.is_none() {
            self.ld = other.ld.clone();
        }
        if self.kind.is_none() {
            self.kind = other.kind;
        }
        self
    }
}

impl Toolchain {
    pub fn gcc() -> Self {
        Toolchain::Gcc {
            cxx: "g++".to_string(),
            ld: "g++".to_string(),
        }
    }

    pub fn clang(platform: Platform) -> Self {
        Toolchain::Clang {
            cxx: "clang++".to_string(),
            ld: "clang++".to_string(),
            platform,
        }
    }

    /// Pick a toolchain for `selection`, probing the environment for `Auto`.
    pub fn select<R: ToolRunner>(
        selection: &ToolchainSelection,
        platform: Platform,
        runner: &R,
    ) -> Result<Self> {
        let base = match selection.kind.unwrap_or_default() {
            ToolchainKind::Gcc => Toolchain::gcc(),
            ToolchainKind::Clang => Toolchain::clang(platform),
            ToolchainKind::Auto => Self::probe(selection.cxx.as_deref(), platform, runner)?,
        };

        Ok(base.with_binaries(selection.cxx.clone(), selection.ld.clone()))
    }

    fn probe<R: ToolRunner>(cxx: Option<&str>, platform: Platform, runner: &R) -> Result<Self> {
        let cxx = match cxx {
            Some(cxx) => cxx.to_string(),
            None => {
                if which::which("g++").is_ok() {
                    "g++".to_string()
                } else if which::which("clang++").is_ok() {
                    "clang++".to_string()
                } else {
                    return Err(BuildError::ToolchainNotFound);
                }
            }
        };

        if cxx.is_empty() {
            return Err(BuildError::EmptyToolchain("cxx"));
        }

        // g++ on macOS is frequently clang in disguise, so ask the binary.
        let output = runner.run(&[cxx.clone(), "--version".to_string()], Path::new("."))?;
        let is_clang = output.success() && output.stdout.to_lowercase().contains("clang");
        debug!(%cxx, is_clang, "probed compiler");

        let chosen = if is_clang {
            Toolchain::clang(platform)
        } else {
            Toolchain::gcc()
        };
        Ok(chosen.with_binaries(Some(cxx), None))
    }

    /// Override the compiler and/or linker. The linker follows the compiler
    /// unless given explicitly.
    pub fn with_binaries(self, cxx: Option<String>, ld: Option<String>) -> Self {
        let follow = |cur_cxx: String, cur_ld: String| {
            let new_ld = ld.clone().or_else(|| cxx.clone()).unwrap_or(cur_ld);
            let new_cxx = cxx.clone().unwrap_or(cur_cxx);
            (new_cxx, new_ld)
        };
        match self {
            Toolchain::Gcc { cxx: c, ld: l } => {
                let (cxx, ld) = follow(c, l);
                Toolchain::Gcc { cxx, ld }
            }
            Toolchain::Clang {
                cxx: c,
                ld: l,
                platform,
            } => {
                let (cxx, ld) = follow(c, l);
                Toolchain::Clang { cxx, ld, platform }
            }
        }
    }

    pub fn cxx(&self) -> &str {
        match self {
            Toolchain::Gcc { cxx, .. } | Toolchain::Clang { cxx, .. } => cxx,
        }
    }

    pub fn ld(&self) -> &str {
        match self {
            Toolchain::Gcc { ld, .. } | Toolchain::Clang { ld, .. } => ld,
        }
    }

    /// Extension given to shared libraries, including the dot.
    pub fn shared_library_extension(&self) -> &'static str {
        match self {
            Toolchain::Clang {
                platform: Platform::MacOs,
                ..
            } => ".dylib",
            _ => ".so",
        }
    }

    /// Fail if either binary name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.cxx().is_empty() {
            return Err(BuildError::EmptyToolchain("cxx"));
        }
        if self.ld().is_empty() {
            return Err(BuildError::EmptyToolchain("ld"));
        }
        Ok(())
    }
}

/// Built-in flag sets a project starts from before its own configuration
/// is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainDefaults {
    pub compiler_flags: Vec<String>,
    pub dependency_flags: Vec<String>,
    pub library_link_flags: Vec<String>,
    pub executable_link_flags: Vec<String>,
    pub link_flags: Vec<String>,
}

impl ToolchainDefaults {
    pub fn gcc() -> Self {
        Self {
            compiler_flags: strings(&[
                "-g",
                "-g3",
                "-pedantic",
                "-pedantic-errors",
                "-Wall",
                "-Wextra",
                "-Werror",
                "-Wconversion",
                "-Wunused-parameter",
                "-Wsign-compare",
                "-std=c++11",
                "-fPIC",
                "-fexceptions",
            ]),
            dependency_flags: strings(&["-MM"]),
            library_link_flags: strings(&["-shared"]),
            executable_link_flags: Vec::new(),
            link_flags: strings(&["-fexceptions"]),
        }
    }

    /// Defaults adjusted for the quirks of `toolchain`.
    pub fn for_toolchain(toolchain: &Toolchain) -> Self {
        let mut defaults = Self::gcc();
        if let Toolchain::Clang {
            platform: Platform::MacOs,
            ..
        } = toolchain
        {
            defaults.library_link_flags = strings(&["-dynamiclib"]);
        }
        defaults
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs one external command to completion.
pub trait ToolRunner {
    /// Run `argv` (program first) in `cwd`, waiting for it to finish.
    fn run(&self, argv: &[String], cwd: &Path) -> Result<ToolOutput>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, argv: &[String], cwd: &Path) -> Result<ToolOutput> {
        (**self).run(argv, cwd)
    }
}

/// [`ToolRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, argv: &[String], cwd: &Path) -> Result<ToolOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or(BuildError::EmptyToolchain("cxx"))?;

        debug!(cwd = %cwd.display(), "running {}", argv.join(" "));

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| BuildError::ToolchainSpawn {
                program: program.clone(),
                source,
            })?;

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
