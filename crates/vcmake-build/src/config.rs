//! Project configuration types (vcmake.toml format) and loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use vcmake_common::SourceFile;

use crate::error::{BuildError, Result};
use crate::project::ProjectDescriptor;
use crate::toolchain::{Platform, Toolchain, ToolchainKind, ToolchainSelection, ToolRunner};

/// Name of the per-project configuration file.
pub const CONFIG_FILE: &str = "vcmake.toml";

/// Root project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    /// Project layout and target.
    pub project: ProjectSection,

    /// Compiler and linker settings.
    #[serde(default)]
    pub toolchain: ToolchainSection,
}

/// The `[project]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Namespace tag for generated targets (ASCII letters only).
    #[serde(default)]
    pub tag: Option<String>,

    /// Shared library name.
    #[serde(default)]
    pub library: Option<String>,

    /// Executable output path.
    #[serde(default)]
    pub executable: Option<String>,

    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Name of the generated recipe file.
    #[serde(default)]
    pub makefile: Option<String>,

    /// Source files relative to `source_dir`; discovered when omitted.
    #[serde(default)]
    pub sources: Option<Vec<String>>,

    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub lib_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub libraries: Vec<String>,

    /// Directories of related projects, relative to this one.
    #[serde(default)]
    pub related: Vec<PathBuf>,

    /// Build with `-pthread`.
    #[serde(default)]
    pub threads: bool,
}

/// The `[toolchain]` table. Unset flag lists keep the toolchain defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainSection {
    #[serde(default)]
    pub compiler: ToolchainKind,

    #[serde(default)]
    pub cxx: Option<String>,

    #[serde(default)]
    pub ld: Option<String>,

    #[serde(default)]
    pub cxx_flags: Option<Vec<String>>,

    /// Appended after `cxx_flags` (or the defaults).
    #[serde(default)]
    pub extra_cxx_flags: Vec<String>,

    #[serde(default)]
    pub depend_flags: Option<Vec<String>>,

    #[serde(default)]
    pub library_flags: Option<Vec<String>>,

    #[serde(default)]
    pub executable_flags: Option<Vec<String>>,

    #[serde(default)]
    pub link_flags: Option<Vec<String>>,

    /// Passed verbatim at the end of the executable link line.
    #[serde(default)]
    pub system_libs: Vec<String>,
}

impl ProjectFile {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn selection(&self) -> ToolchainSelection {
        ToolchainSelection {
            kind: Some(self.toolchain.compiler),
            cxx: self.toolchain.cxx.clone(),
            ld: self.toolchain.ld.clone(),
        }
    }

    /// Turn the file into a descriptor rooted at `working_dir`.
    ///
    /// Sources are discovered under `working_dir/source_dir` when the file
    /// does not list them.
    pub fn into_descriptor(self, working_dir: &Path, toolchain: Toolchain) -> Result<ProjectDescriptor> {
        let mut p = ProjectDescriptor::new(working_dir, toolchain);
        let project = self.project;
        let tc = self.toolchain;

        p.tag = project.tag;
        p.library_target = project.library;
        p.executable_target = project.executable;
        if let Some(dir) = project.source_dir {
            p.source_dir = dir;
        }
        if let Some(dir) = project.output_dir {
            p.output_dir = dir;
        }
        if let Some(name) = project.makefile {
            p.makefile = name;
        }
        p.include_dirs = project.include_dirs;
        p.lib_dirs = project.lib_dirs;
        p.libraries = project.libraries;
        p.related_projects = project.related;
        p.enable_threading = project.threads;

        p.source_files = match project.sources {
            Some(sources) => sources.into_iter().map(SourceFile::new).collect(),
            None => discover_sources(&working_dir.join(&p.source_dir))?,
        };

        if let Some(flags) = tc.cxx_flags {
            p.compiler_flags = flags;
        }
        p.compiler_flags.extend(tc.extra_cxx_flags);
        if let Some(flags) = tc.depend_flags {
            p.dependency_flags = flags;
        }
        if let Some(flags) = tc.library_flags {
            p.library_link_flags = flags;
        }
        if let Some(flags) = tc.executable_flags {
            p.executable_link_flags = flags;
        }
        if let Some(flags) = tc.link_flags {
            p.link_flags = flags;
        }
        p.system_link_libs = tc.system_libs;

        if p.enable_threading {
            for flags in [&mut p.compiler_flags, &mut p.link_flags] {
                if !flags.iter().any(|f| f == "-pthread") {
                    flags.push("-pthread".to_string());
                }
            }
        }

        p.validate()?;
        Ok(p)
    }
}

/// Find every translation unit under `root`, as sorted relative paths.
pub fn discover_sources(root: &Path) -> Result<Vec<SourceFile>> {
    let mut found = Vec::new();
    if !root.is_dir() {
        return Ok(found);
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildError::ReadConfig(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let file = SourceFile::new(rel);
        if file.language().is_some() {
            found.push(file);
        }
    }

    debug!(root = %root.display(), count = found.len(), "discovered sources");
    Ok(found)
}

/// Produces a project descriptor for a project directory.
pub trait ProjectLoader {
    fn load(&self, dir: &Path) -> Result<ProjectDescriptor>;
}

impl<T: ProjectLoader + ?Sized> ProjectLoader for &T {
    fn load(&self, dir: &Path) -> Result<ProjectDescriptor> {
        (**self).load(dir)
    }
}

/// Loads `vcmake.toml` from a directory.
///
/// Every call yields an independent descriptor; nothing is cached.
#[derive(Debug, Clone)]
pub struct TomlProjectLoader<R> {
    overrides: ToolchainSelection,
    platform: Platform,
    runner: R,
}

impl<R: ToolRunner> TomlProjectLoader<R> {
    pub fn new(runner: R) -> Self {
        Self {
            overrides: ToolchainSelection::default(),
            platform: Platform::host(),
            runner,
        }
    }

    /// Binaries that win over whatever the project file says.
    pub fn with_overrides(mut self, overrides: ToolchainSelection) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

impl<R: ToolRunner> ProjectLoader for TomlProjectLoader<R> {
    fn load(&self, dir: &Path) -> Result<ProjectDescriptor> {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.is_file() {
            return Err(BuildError::ConfigNotFound(dir.to_path_buf()));
        }

        let working_dir = dir.canonicalize()?;
        let file = ProjectFile::from_file(&config_path)?;
        let selection = self.overrides.clone().or(&file.selection());
        let toolchain = Toolchain::select(&selection, self.platform, &self.runner)?;

        debug!(dir = %working_dir.display(), cxx = toolchain.cxx(), "loaded project");
        file.into_descriptor(&working_dir, toolchain)
    }
}
