//! The resolved model of one project.

use indexmap::IndexSet;
use std::path::{Path, PathBuf};

use vcmake_common::{join_rel, SourceFile};

use crate::error::{BuildError, Result};
use crate::toolchain::{Toolchain, ToolchainDefaults};

/// What a project produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Shared library; the declared name, before lib-naming is applied.
    Library(String),
    /// Executable; the output path as declared.
    Executable(String),
}

/// A library folded in from a related project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedLink {
    /// Name passed to `-l`.
    pub name: String,
    /// Library directory, relative to the project that holds this link.
    pub lib_dir: PathBuf,
    /// Absolute directory embedded as the runtime search path.
    pub runtime_dir: PathBuf,
}

/// Build configuration of one project.
///
/// Every field is owned by the instance. Defaults are copied in from
/// [`ToolchainDefaults`] at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub library_target: Option<String>,
    pub executable_target: Option<String>,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    pub source_files: Vec<SourceFile>,
    pub libraries: Vec<String>,
    pub tag: Option<String>,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub makefile: String,
    pub compiler_flags: Vec<String>,
    pub dependency_flags: Vec<String>,
    pub library_link_flags: Vec<String>,
    pub executable_link_flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub system_link_libs: Vec<String>,
    pub related_projects: Vec<PathBuf>,
    pub is_root: bool,
    pub enable_threading: bool,
    /// Absolute directory the project was loaded from.
    pub working_dir: PathBuf,
    pub toolchain: Toolchain,
    /// Libraries pulled in by composition, direct and transitive.
    pub related_links: Vec<RelatedLink>,
}

impl ProjectDescriptor {
    /// An empty project rooted at `working_dir` with the toolchain's defaults.
    pub fn new(working_dir: impl Into<PathBuf>, toolchain: Toolchain) -> Self {
        let defaults = ToolchainDefaults::for_toolchain(&toolchain);
        Self {
            library_target: None,
            executable_target: None,
            include_dirs: Vec::new(),
            lib_dirs: Vec::new(),
            source_files: Vec::new(),
            libraries: Vec::new(),
            tag: None,
            source_dir: PathBuf::from("src"),
            output_dir: PathBuf::from("bin"),
            makefile: "Makefile".to_string(),
            compiler_flags: defaults.compiler_flags,
            dependency_flags: defaults.dependency_flags,
            library_link_flags: defaults.library_link_flags,
            executable_link_flags: defaults.executable_link_flags,
            link_flags: defaults.link_flags,
            system_link_libs: Vec::new(),
            related_projects: Vec::new(),
            is_root: true,
            enable_threading: false,
            working_dir: working_dir.into(),
            toolchain,
            related_links: Vec::new(),
        }
    }

    pub fn with_library(mut self, name: &str) -> Self {
        self.library_target = Some(name.to_string());
        self
    }

    pub fn with_executable(mut self, path: &str) -> Self {
        self.executable_target = Some(path.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn with_sources(mut self, sources: &[&str]) -> Self {
        self.source_files = sources.iter().map(|s| SourceFile::new(*s)).collect();
        self
    }

    pub fn with_include_dirs(mut self, dirs: &[&str]) -> Self {
        self.include_dirs = dirs.iter().map(PathBuf::from).collect();
        self
    }

    pub fn with_related(mut self, dirs: &[&str]) -> Self {
        self.related_projects = dirs.iter().map(PathBuf::from).collect();
        self
    }

    /// The validated target; exactly one of library/executable must be set.
    pub fn target(&self) -> Result<Target> {
        let lib = self.library_target.as_deref().filter(|s| !s.is_empty());
        let exe = self.executable_target.as_deref().filter(|s| !s.is_empty());
        match (lib, exe) {
            (Some(lib), None) => Ok(Target::Library(lib.to_string())),
            (None, Some(exe)) => Ok(Target::Executable(exe.to_string())),
            (None, None) => Err(BuildError::NoTarget(self.working_dir.clone())),
            (Some(_), Some(_)) => Err(BuildError::ConflictingTargets(self.working_dir.clone())),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|t| !t.is_empty())
    }

    /// Namespace for generated target names: empty, or `tag_`.
    pub fn target_prefix(&self) -> String {
        match self.tag() {
            Some(tag) => format!("{tag}_"),
            None => String::new(),
        }
    }

    /// Check the target, the tag and the toolchain binaries.
    pub fn validate(&self) -> Result<()> {
        self.target()?;
        if let Some(tag) = self.tag() {
            if !tag.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(BuildError::InvalidTag(tag.to_string()));
            }
        }
        self.toolchain.validate()
    }

    /// Path of a source file relative to the project root.
    pub fn source_path(&self, file: &SourceFile) -> PathBuf {
        join_rel(&self.source_dir, file.full_path())
    }

    /// Object file produced for `file`, under `output_dir`.
    pub fn object_file(&self, file: &SourceFile) -> PathBuf {
        join_rel(&self.output_dir, file.with_extension(".o", true))
    }

    pub fn object_files(&self) -> Vec<PathBuf> {
        self.source_files.iter().map(|f| self.object_file(f)).collect()
    }

    /// Distinct output directories implied by the sources, in first-seen order.
    pub fn object_dirs(&self) -> IndexSet<PathBuf> {
        self.source_files
            .iter()
            .map(|f| join_rel(&self.output_dir, f.directory()))
            .collect()
    }

    /// `-I` arguments for every include directory.
    pub fn include_args(&self) -> Vec<String> {
        self.include_dirs
            .iter()
            .map(|d| format!("-I{}", d.display()))
            .collect()
    }

    /// On-disk file name of the library, e.g. `libfoo.so`.
    pub fn library_file_name(&self, name: &str) -> String {
        shared_library_name(name, self.toolchain.shared_library_extension())
    }

    /// The final artifact: `output_dir/libfoo.so` or the executable path.
    pub fn artifact_path(&self) -> Result<PathBuf> {
        Ok(match self.target()? {
            Target::Library(name) => self.output_dir.join(self.library_file_name(&name)),
            Target::Executable(path) => PathBuf::from(path),
        })
    }

    /// Declared sources that cannot be read under the source root.
    pub fn missing_sources(&self) -> Vec<PathBuf> {
        let root = self.working_dir.join(&self.source_dir);
        self.source_files
            .iter()
            .filter(|f| !f.exists_under(Some(root.as_path())))
            .map(|f| self.source_path(f))
            .collect()
    }

    /// Absolute directory the library of this project lands in.
    pub fn absolute_output_dir(&self) -> PathBuf {
        self.working_dir.join(&self.output_dir)
    }
}

/// Apply the shared-library naming convention: `lib` prefix and `ext`
/// suffix, each added only when missing.
pub fn shared_library_name(name: &str, ext: &str) -> String {
    let mut out = if name.starts_with("lib") {
        name.to_string()
    } else {
        format!("lib{name}")
    };
    if !out.ends_with(ext) {
        out.push_str(ext);
    }
    out
}

/// The name to pass to `-l` for a declared library target.
pub fn link_name(name: &str, ext: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let base = base.strip_suffix(ext).unwrap_or(&base);
    base.strip_prefix("lib").unwrap_or(base).to_string()
}
